#![forbid(unsafe_code)]

//! Embeddable read-eval-print console.
//!
//! # Role in evalcon
//! `evalcon` turns any element of a [`Document`](evalcon_dom::Document) into
//! a live expression console. A user types an expression; it is evaluated
//! against a configurable scope; the result is rendered as a structured,
//! inspectable tree in a scrolling log above the input.
//!
//! # Primary responsibilities
//! - **Classification**: [`classify`] maps every [`Value`] to one [`Kind`].
//! - **Rendering**: [`render`] builds a bounded node tree for any value,
//!   cycles included.
//! - **History**: [`History`] stores submitted commands with
//!   consecutive-duplicate suppression and cursor navigation.
//! - **Sessions**: [`Session`] owns one mount element's console subtree,
//!   scope and history; [`SessionRegistry`] keeps one session per element.
//! - **Evaluation**: the [`Evaluator`] trait is the only thing a host must
//!   provide; [`ExprEvaluator`] is a built-in expression language.
//!
//! # How it fits in the system
//! The host owns the document and the event loop. It forwards keyboard and
//! focus events with [`SessionRegistry::dispatch`] and reads back an
//! [`EventOutcome`] telling it whether to suppress the default action.
//! Everything runs synchronously on the caller's thread.

pub mod classify;
pub mod config;
pub mod error;
pub mod eval;
pub mod history;
pub mod registry;
pub mod render;
pub mod session;
pub mod value;

pub use classify::{Kind, PrimitiveKind, classify};
pub use config::{ClassNames, ConsoleConfig, HistoryConfig, RenderConfig};
pub use error::{ConsoleError, Result};
pub use eval::{Evaluator, ExprEvaluator};
pub use history::History;
pub use registry::{MountTarget, SessionRegistry};
pub use render::{CIRCULAR_LABEL, TRUNCATED_LABEL, render, render_with};
pub use session::{EventOutcome, Execution, LogLevel, Session};
pub use value::{ArrayRef, ElementValue, ErrorValue, ObjectRef, Value};
