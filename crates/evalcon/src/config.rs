#![forbid(unsafe_code)]

//! Console configuration.
//!
//! Every tunable lives in [`ConsoleConfig`]. With the `config` feature it can
//! be loaded from TOML or JSON at startup:
//!
//! ```toml
//! input_rows = 2
//!
//! [class_names]
//! console = "repl"
//!
//! [history]
//! capacity = 500
//!
//! [render]
//! max_depth = 32
//! ```
//!
//! ```rust,ignore
//! let config = ConsoleConfig::from_toml_file("console.toml")?;
//! ```
//!
//! `ConsoleConfig::default()` produces the stock DOM shape:
//! `.console > .console-container > (p rows..., p.console-input > textarea)`.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

/// Top-level console configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ConsoleConfig {
    /// CSS class names applied to the mounted structure.
    pub class_names: ClassNames,

    /// Command history limits.
    pub history: HistoryConfig,

    /// Value renderer limits.
    pub render: RenderConfig,

    /// `rows` attribute of the input textarea.
    pub input_rows: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            class_names: ClassNames::default(),
            history: HistoryConfig::default(),
            render: RenderConfig::default(),
            input_rows: 1,
        }
    }
}

impl ConsoleConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints, collecting every violation.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.history.capacity == 0 {
            errors.push("history.capacity must be greater than 0".to_owned());
        }
        if self.render.max_depth == 0 {
            errors.push("render.max_depth must be greater than 0".to_owned());
        }
        if self.input_rows == 0 {
            errors.push("input_rows must be greater than 0".to_owned());
        }
        for (field, value) in self.class_names.fields() {
            if value.trim().is_empty() {
                errors.push(format!("class_names.{field} must not be empty"));
            } else if value.split_whitespace().count() > 1 {
                errors.push(format!("class_names.{field} must be a single class"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConsoleError::Validation(errors))
        }
    }
}

/// Class names for the mounted structure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ClassNames {
    /// Added to the mount element.
    pub console: String,
    /// Scrollback container.
    pub container: String,
    /// Row holding the input field.
    pub input_row: String,
    /// Wrapper around a rendered value inside a row.
    pub result: String,
    /// Label echoing the executed command.
    pub command: String,
}

impl Default for ClassNames {
    fn default() -> Self {
        Self {
            console: "console".to_owned(),
            container: "console-container".to_owned(),
            input_row: "console-input".to_owned(),
            result: "result".to_owned(),
            command: "command".to_owned(),
        }
    }
}

impl ClassNames {
    fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("console", &self.console),
            ("container", &self.container),
            ("input_row", &self.input_row),
            ("result", &self.result),
            ("command", &self.command),
        ]
    }
}

/// Command history limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct HistoryConfig {
    /// Maximum stored commands; the oldest is evicted first.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// Value renderer limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct RenderConfig {
    /// Nesting depth past which values render as a flat `…` label.
    pub max_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}
