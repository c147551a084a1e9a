use evalcon_dom::NodeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Failures reported to the embedding host.
///
/// Evaluation failures and odd value shapes never show up here; those are
/// rendered into the scrollback instead.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("mount element not found: #{id}")]
    MountNotFound { id: String },

    #[error("node {node} is not an element")]
    NotAnElement { node: NodeId },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config")]
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "config")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),
}
