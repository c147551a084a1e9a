#![forbid(unsafe_code)]

//! Evaluation capability.
//!
//! A [`Session`](crate::Session) hands each submitted command to an
//! [`Evaluator`] together with its current scope. The scope acts as the
//! lexical environment: its members must be addressable as unqualified
//! identifiers in the source text.
//!
//! Failures are returned as `Err(value)` where `value` is whatever the
//! evaluator raised, usually a [`Value::Error`]. The session renders that
//! value like any other, so there is no separate error path.
//!
//! Any closure with the right signature is an evaluator:
//!
//! ```
//! use evalcon::{Evaluator, Value};
//!
//! let echo = |source: &str, _scope: &Value| -> Result<Value, Value> { Ok(Value::from(source)) };
//! assert_eq!(echo.evaluate("hi", &Value::Undefined).unwrap().to_display_string(), "hi");
//! ```

mod expr;

pub use expr::ExprEvaluator;

use crate::value::Value;

/// Evaluates source text against a scope.
pub trait Evaluator {
    /// Evaluate `source` with `scope` as the lexical environment.
    fn evaluate(&self, source: &str, scope: &Value) -> Result<Value, Value>;
}

impl<F> Evaluator for F
where
    F: Fn(&str, &Value) -> Result<Value, Value>,
{
    fn evaluate(&self, source: &str, scope: &Value) -> Result<Value, Value> {
        self(source, scope)
    }
}
