#![forbid(unsafe_code)]

//! Runtime values handed to the console.
//!
//! Arrays and objects are shared handles ([`ArrayRef`], [`ObjectRef`]) so
//! hosts can build self-referential structures exactly like a script engine
//! would. Identity is pointer identity. `Debug` on the handles is shallow so
//! printing a cyclic value terminates.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use evalcon_dom::{Document, NodeId};

/// Upper bound on prototype hops during property lookup.
const MAX_PROTOTYPE_CHAIN: usize = 1024;

/// A value produced by evaluation or passed to `log`.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// A symbol, carrying its description.
    Symbol(String),
    Function {
        name: String,
    },
    Array(ArrayRef),
    Object(ObjectRef),
    Error(ErrorValue),
    Element(ElementValue),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ArrayRef> for Value {
    fn from(value: ArrayRef) -> Self {
        Self::Array(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}

impl From<ErrorValue> for Value {
    fn from(value: ErrorValue) -> Self {
        Self::Error(value)
    }
}

impl From<ElementValue> for Value {
    fn from(value: ElementValue) -> Self {
        Self::Element(value)
    }
}

impl Value {
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    #[must_use]
    pub fn symbol(description: impl Into<String>) -> Self {
        Self::Symbol(description.into())
    }

    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function { name: name.into() }
    }

    /// A dense array of `items`.
    #[must_use]
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(ArrayRef::from_values(items))
    }

    /// A plain object with `entries` as own properties, in order.
    #[must_use]
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Object(ObjectRef::from_entries(entries))
    }

    /// `typeof`-style name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Function { .. } => "function",
            Self::Null | Self::Array(_) | Self::Object(_) | Self::Error(_) | Self::Element(_) => {
                "object"
            }
        }
    }

    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Numeric conversion (`Number(value)`).
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined | Self::Symbol(_) | Self::Function { .. } => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => parse_number(s),
            _ => parse_number(&self.to_display_string()),
        }
    }

    /// String conversion as a script engine's `String(value)` would do it.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        let mut out = String::new();
        self.write_display(&mut out, &mut Vec::new());
        out
    }

    fn write_display(&self, out: &mut String, open_arrays: &mut Vec<usize>) {
        match self {
            Self::Undefined => out.push_str("undefined"),
            Self::Null => out.push_str("null"),
            Self::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::Number(n) => out.push_str(&format_number(*n)),
            Self::String(s) => out.push_str(s),
            Self::Symbol(description) => {
                out.push_str("Symbol(");
                out.push_str(description);
                out.push(')');
            }
            Self::Function { name } => {
                out.push_str("function ");
                out.push_str(name);
                out.push_str("() { [native code] }");
            }
            Self::Array(array) => {
                let id = array.identity();
                if open_arrays.contains(&id) {
                    return;
                }
                open_arrays.push(id);
                for (index, slot) in array.slots().iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    if let Some(item) = slot
                        && !item.is_nullish()
                    {
                        item.write_display(out, open_arrays);
                    }
                }
                open_arrays.pop();
            }
            Self::Object(_) => out.push_str("[object Object]"),
            Self::Error(error) => out.push_str(&error.to_string()),
            Self::Element(_) => out.push_str("[object HTMLElement]"),
        }
    }

    /// Property lookup, prototype-aware for objects.
    ///
    /// Returns `None` when the property does not exist; callers decide
    /// whether that means `undefined` or an error.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<Value> {
        match self {
            Self::Object(object) => object.get(key),
            Self::Array(array) => match key {
                "length" => Some(Self::Number(array.len() as f64)),
                _ => array_index(key).and_then(|index| array.get(index)),
            },
            Self::String(s) => match key {
                "length" => Some(Self::Number(s.encode_utf16().count() as f64)),
                _ => array_index(key)
                    .and_then(|index| s.chars().nth(index))
                    .map(|c| Self::String(c.to_string())),
            },
            Self::Error(error) => match key {
                "name" => Some(Self::String(error.name.clone())),
                "message" => Some(Self::String(error.message.clone())),
                _ => error.properties.get(key),
            },
            Self::Element(element) => element.property(key),
            Self::Function { name } if key == "name" => Some(Self::String(name.clone())),
            _ => None,
        }
    }

    /// `===` semantics: identity for shared handles, `NaN` unequal to itself.
    #[must_use]
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) | (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Function { name: a }, Self::Function { name: b }) => a == b,
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Error(a), Self::Error(b)) => a.properties.ptr_eq(&b.properties),
            (Self::Element(a), Self::Element(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

/// Canonical array index (`"0"`, `"17"`; not `"01"` or `"-1"`).
fn array_index(key: &str) -> Option<usize> {
    let index = key.parse::<usize>().ok()?;
    (index.to_string() == key).then_some(index)
}

fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

/// Format a number the way `Number.prototype.toString()` does.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{n}");
    }
    let scientific = format!("{n:e}");
    match scientific.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => scientific,
    }
}

/// Shared, possibly sparse array. Holes are `None`.
#[derive(Clone, Default)]
pub struct ArrayRef(Rc<RefCell<Vec<Option<Value>>>>);

impl ArrayRef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::from_slots(values.into_iter().map(Some).collect())
    }

    #[must_use]
    pub fn from_slots(slots: Vec<Option<Value>>) -> Self {
        Self(Rc::new(RefCell::new(slots)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Element at `index`; `None` for holes and out-of-range indices.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned().flatten()
    }

    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(Some(value));
    }

    /// Store `value` at `index`, leaving holes when growing past the end.
    pub fn set(&self, index: usize, value: Value) {
        let mut slots = self.0.borrow_mut();
        if index >= slots.len() {
            slots.resize(index + 1, None);
        }
        slots[index] = Some(value);
    }

    /// Snapshot of every slot, holes included.
    #[must_use]
    pub fn slots(&self) -> Vec<Option<Value>> {
        self.0.borrow().clone()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address-based identity, stable for the lifetime of the array.
    #[must_use]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayRef").field("len", &self.len()).finish()
    }
}

#[derive(Default)]
struct ObjectData {
    properties: Vec<(String, Value)>,
    prototype: Option<ObjectRef>,
}

/// Shared object: ordered own properties plus an optional prototype.
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<ObjectData>>);

impl ObjectRef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty object inheriting from `prototype`.
    #[must_use]
    pub fn with_prototype(prototype: ObjectRef) -> Self {
        let object = Self::new();
        object.set_prototype(Some(prototype));
        object
    }

    #[must_use]
    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let object = Self::new();
        for (key, value) in entries {
            object.set(key, value);
        }
        object
    }

    /// Create or overwrite an own property, keeping insertion order.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let mut data = self.0.borrow_mut();
        match data.properties.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => data.properties.push((key, value)),
        }
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut data = self.0.borrow_mut();
        let index = data.properties.iter().position(|(k, _)| k == key)?;
        Some(data.properties.remove(index).1)
    }

    #[must_use]
    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.0
            .borrow()
            .properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    #[must_use]
    pub fn has_own(&self, key: &str) -> bool {
        self.0.borrow().properties.iter().any(|(k, _)| k == key)
    }

    /// Lookup through the prototype chain. Prototype cycles terminate.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut visited = Vec::new();
        let mut current = Some(self.clone());
        while let Some(object) = current {
            if visited.contains(&object.identity()) || visited.len() >= MAX_PROTOTYPE_CHAIN {
                return None;
            }
            if let Some(value) = object.get_own(key) {
                return Some(value);
            }
            visited.push(object.identity());
            current = object.prototype();
        }
        None
    }

    /// Own property names in insertion order; inherited names excluded.
    #[must_use]
    pub fn own_keys(&self) -> Vec<String> {
        self.0
            .borrow()
            .properties
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    #[must_use]
    pub fn own_entries(&self) -> Vec<(String, Value)> {
        self.0.borrow().properties.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().properties.is_empty()
    }

    #[must_use]
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.0.borrow().prototype.clone()
    }

    pub fn set_prototype(&self, prototype: Option<ObjectRef>) {
        self.0.borrow_mut().prototype = prototype;
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address-based identity, stable for the lifetime of the object.
    #[must_use]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("keys", &self.own_keys())
            .field("has_prototype", &self.0.borrow().prototype.is_some())
            .finish()
    }
}

/// A raised or constructed error.
#[derive(Debug, Clone)]
pub struct ErrorValue {
    name: String,
    message: String,
    properties: ObjectRef,
}

impl ErrorValue {
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            properties: ObjectRef::new(),
        }
    }

    /// A generic `Error`.
    #[must_use]
    pub fn plain(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    #[must_use]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new("SyntaxError", message)
    }

    #[must_use]
    pub fn reference(message: impl Into<String>) -> Self {
        Self::new("ReferenceError", message)
    }

    #[must_use]
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    /// Attach an extra own property.
    #[must_use]
    pub fn with_property(self, key: impl Into<String>, value: Value) -> Self {
        self.properties.set(key, value);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Extra own properties beyond `name` and `message`.
    #[must_use]
    pub fn properties(&self) -> &ObjectRef {
        &self.properties
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

/// Detached description of a UI element: tag, attributes, serialized content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementValue {
    tag_name: String,
    attributes: Vec<(String, String)>,
    inner_html: String,
}

impl ElementValue {
    #[must_use]
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            inner_html: String::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_inner_html(mut self, html: impl Into<String>) -> Self {
        self.inner_html = html.into();
        self
    }

    /// Capture a live element from a document. `None` for text nodes.
    #[must_use]
    pub fn snapshot<D: Document + ?Sized>(doc: &D, node: NodeId) -> Option<Self> {
        let tag_name = doc.tag_name(node)?;
        Some(Self {
            tag_name,
            attributes: doc.attributes(node),
            inner_html: doc.inner_html(node),
        })
    }

    /// Lower-case tag name.
    #[must_use]
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    #[must_use]
    pub fn inner_html(&self) -> &str {
        &self.inner_html
    }

    fn property(&self, key: &str) -> Option<Value> {
        match key {
            "tagName" | "nodeName" => Some(Value::String(self.tag_name.to_ascii_uppercase())),
            "nodeType" => Some(Value::Number(1.0)),
            "innerHTML" => Some(Value::String(self.inner_html.clone())),
            "attributes" => Some(Value::array(self.attributes.iter().map(|(name, value)| {
                Value::object([
                    ("name", Value::string(name.as_str())),
                    ("value", Value::string(value.as_str())),
                ])
            }))),
            _ => self
                .attributes
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| Value::string(value.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting_matches_script_conventions() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(123_456_789.0), "123456789");
    }

    #[test]
    fn display_of_primitives_and_errors() {
        assert_eq!(Value::Undefined.to_display_string(), "undefined");
        assert_eq!(Value::Bool(true).to_display_string(), "true");
        assert_eq!(Value::symbol("tag").to_display_string(), "Symbol(tag)");
        assert_eq!(
            Value::function("alert").to_display_string(),
            "function alert() { [native code] }"
        );
        assert_eq!(
            Value::from(ErrorValue::type_error("bad")).to_display_string(),
            "TypeError: bad"
        );
        assert_eq!(ErrorValue::plain("").to_string(), "Error");
    }

    #[test]
    fn array_display_joins_and_survives_cycles() {
        let array = ArrayRef::from_values([Value::from(1), Value::Null, Value::from("x")]);
        array.push(Value::Array(array.clone()));
        assert_eq!(Value::Array(array).to_display_string(), "1,,x,");
    }

    #[test]
    fn sparse_arrays_report_holes() {
        let array = ArrayRef::new();
        array.set(2, Value::from(7));
        assert_eq!(array.len(), 3);
        assert!(array.get(0).is_none());
        assert_eq!(array.get(2).map(|v| v.to_number()), Some(7.0));
    }

    #[test]
    fn object_lookup_walks_prototype_but_keys_are_own() {
        let base = ObjectRef::from_entries([("inherited", Value::from(1))]);
        let derived = ObjectRef::with_prototype(base);
        derived.set("own", Value::from(2));
        assert!(derived.get("inherited").is_some());
        assert!(derived.get_own("inherited").is_none());
        assert_eq!(derived.own_keys(), vec!["own".to_owned()]);
    }

    #[test]
    fn prototype_cycles_terminate() {
        let a = ObjectRef::new();
        let b = ObjectRef::with_prototype(a.clone());
        a.set_prototype(Some(b.clone()));
        assert!(b.get("missing").is_none());
    }

    #[test]
    fn set_overwrites_in_place() {
        let object = ObjectRef::from_entries([("a", Value::from(1)), ("b", Value::from(2))]);
        object.set("a", Value::from(3));
        assert_eq!(object.own_keys(), vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(object.get("a").map(|v| v.to_number()), Some(3.0));
    }

    #[test]
    fn strict_equality_uses_identity_for_handles() {
        let array = ArrayRef::new();
        let same = Value::Array(array.clone());
        assert!(same.strict_equals(&Value::Array(array)));
        assert!(!Value::array([]).strict_equals(&Value::array([])));
        assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
    }

    #[test]
    fn property_access_on_builtins() {
        let s = Value::from("héllo");
        assert_eq!(s.property("length").map(|v| v.to_number()), Some(5.0));
        assert_eq!(
            s.property("1").map(|v| v.to_display_string()).as_deref(),
            Some("é")
        );
        let element = Value::from(ElementValue::new("DIV").with_attribute("id", "x"));
        assert_eq!(
            element.property("tagName").map(|v| v.to_display_string()).as_deref(),
            Some("DIV")
        );
        assert_eq!(
            element.property("id").map(|v| v.to_display_string()).as_deref(),
            Some("x")
        );
        assert!(Value::array([]).property("01").is_none());
    }

    #[test]
    fn to_number_conversions() {
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert!(Value::from("abc").to_number().is_nan());
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::array([Value::from(5)]).to_number(), 5.0);
    }
}
