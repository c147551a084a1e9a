#![forbid(unsafe_code)]

//! Value classification.
//!
//! [`classify`] maps every [`Value`] to exactly one [`Kind`]. Shape probes run
//! in a fixed priority order and the first match wins:
//!
//! | priority | kind        | probe                                          |
//! |----------|-------------|------------------------------------------------|
//! | 1        | `Null`      | the null value                                 |
//! | 2        | `Undefined` | the undefined value                            |
//! | 3        | `Array`     | ordered, indexable                             |
//! | 4        | `Error`     | carries a name and message                     |
//! | 5        | `Element`   | element value, or `nodeType == 1` by lookup    |
//! | 6        | `Object`    | key/value container                            |
//! | 7        | `Primitive` | everything else, including functions          |
//!
//! Error values may carry arbitrary extra properties, so an error with a
//! `nodeType` of 1 satisfies both probes 4 and 5 and resolves to `Error`.

use crate::value::Value;

/// Rendering shape of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Undefined,
    Array,
    Error,
    Element,
    Object,
    Primitive(PrimitiveKind),
}

/// Primitive sub-kinds, rendered via string conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Number,
    String,
    Boolean,
    Function,
    Symbol,
}

impl Kind {
    /// CSS class attached to rendered nodes of this kind.
    #[must_use]
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Array => "array",
            Self::Error => "error",
            Self::Element => "element",
            Self::Object => "object",
            Self::Primitive(PrimitiveKind::Number) => "number",
            Self::Primitive(PrimitiveKind::String) => "string",
            Self::Primitive(PrimitiveKind::Boolean) => "boolean",
            Self::Primitive(PrimitiveKind::Function) => "function",
            Self::Primitive(PrimitiveKind::Symbol) => "symbol",
        }
    }
}

type Probe = fn(&Value) -> bool;

/// Ordered shape probes; the first match decides the kind.
const PROBES: [(Probe, Kind); 6] = [
    (is_null, Kind::Null),
    (is_undefined, Kind::Undefined),
    (is_array_like, Kind::Array),
    (is_error_like, Kind::Error),
    (is_element_like, Kind::Element),
    (is_structured, Kind::Object),
];

/// Classify `value`. Total and deterministic.
#[must_use]
pub fn classify(value: &Value) -> Kind {
    PROBES
        .iter()
        .find(|(probe, _)| probe(value))
        .map_or_else(|| Kind::Primitive(primitive_kind(value)), |(_, kind)| *kind)
}

fn is_null(value: &Value) -> bool {
    matches!(value, Value::Null)
}

fn is_undefined(value: &Value) -> bool {
    matches!(value, Value::Undefined)
}

fn is_array_like(value: &Value) -> bool {
    matches!(value, Value::Array(_))
}

fn is_error_like(value: &Value) -> bool {
    matches!(value, Value::Error(_))
}

/// Element values, plus anything whose `nodeType` property is 1.
fn is_element_like(value: &Value) -> bool {
    match value {
        Value::Element(_) => true,
        Value::Object(_) | Value::Error(_) => matches!(
            value.property("nodeType"),
            Some(Value::Number(n)) if n == 1.0
        ),
        _ => false,
    }
}

fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Object(_))
}

fn primitive_kind(value: &Value) -> PrimitiveKind {
    match value {
        Value::Number(_) => PrimitiveKind::Number,
        Value::Bool(_) => PrimitiveKind::Boolean,
        Value::Function { .. } => PrimitiveKind::Function,
        Value::Symbol(_) => PrimitiveKind::Symbol,
        _ => PrimitiveKind::String,
    }
}
