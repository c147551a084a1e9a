#![forbid(unsafe_code)]

//! Recursive value renderer.
//!
//! Converts a [`Value`] into a tree of document nodes, tagging each node with
//! its [`Kind`] class:
//!
//! ```text
//! null / undefined   <span class="null">null</span>
//! array              <ol class="array"><li>…</li>…</ol>
//! object             <dl class="object"><dt>key</dt><dd>…</dd>…</dl>
//! element            <div class="element">
//!                      <div class="open">tag<dl><dt>attr</dt><dd>value</dd></dl></div>
//!                      <div class="content">inner markup as text</div>
//!                      <div class="close">tag</div>
//!                    </div>
//! error / primitive  <span class="number">2</span>
//! ```
//!
//! # Bounding
//!
//! Object descriptions only recurse while `expand_nested` is set, and the
//! recursive call clears it, so one object level is expanded and deeper
//! objects collapse to their key. Array items always recurse with
//! `expand_nested = true`; to keep that terminating, a container met again on
//! its own render path becomes a `[circular]` leaf, and anything past
//! [`RenderConfig::max_depth`] becomes a `…` leaf.

use evalcon_dom::{Document, NodeId};

use crate::classify::{Kind, classify};
use crate::config::RenderConfig;
use crate::value::{ArrayRef, ElementValue, ObjectRef, Value};

/// Text of a container revisited on its own render path.
pub const CIRCULAR_LABEL: &str = "[circular]";

/// Text of a value nested past the depth ceiling.
pub const TRUNCATED_LABEL: &str = "…";

/// Render `value` with default limits.
pub fn render<D: Document + ?Sized>(doc: &mut D, value: &Value, expand_nested: bool) -> NodeId {
    render_with(doc, value, expand_nested, &RenderConfig::default())
}

/// Render `value` with explicit limits.
pub fn render_with<D: Document + ?Sized>(
    doc: &mut D,
    value: &Value,
    expand_nested: bool,
    config: &RenderConfig,
) -> NodeId {
    let mut renderer = ValueRenderer {
        doc,
        max_depth: config.max_depth,
        path: Vec::new(),
    };
    renderer.node(value, expand_nested, 0)
}

struct ValueRenderer<'d, D: Document + ?Sized> {
    doc: &'d mut D,
    max_depth: usize,
    /// Identities of the containers currently being rendered.
    path: Vec<usize>,
}

impl<D: Document + ?Sized> ValueRenderer<'_, D> {
    fn node(&mut self, value: &Value, expand_nested: bool, depth: usize) -> NodeId {
        let kind = classify(value);
        if depth > self.max_depth {
            return self.leaf(kind, TRUNCATED_LABEL);
        }
        match (kind, value) {
            (Kind::Null | Kind::Undefined, _) => self.leaf(kind, kind.class_name()),
            (Kind::Array, Value::Array(array)) => self.array(array, depth),
            (Kind::Object, Value::Object(object)) => self.object(object, expand_nested, depth),
            (Kind::Element, Value::Element(element)) => self.element(element),
            (Kind::Element, Value::Object(object)) => {
                let element = element_from_object(object);
                self.element(&element)
            }
            _ => self.leaf(kind, &value.to_display_string()),
        }
    }

    fn leaf(&mut self, kind: Kind, text: &str) -> NodeId {
        let span = self.doc.create_element_with_class("span", kind.class_name());
        self.doc.append_text(span, text);
        span
    }

    fn array(&mut self, array: &ArrayRef, depth: usize) -> NodeId {
        let id = array.identity();
        if self.path.contains(&id) {
            return self.leaf(Kind::Array, CIRCULAR_LABEL);
        }
        self.path.push(id);
        let list = self
            .doc
            .create_element_with_class("ol", Kind::Array.class_name());
        for item in array.slots().into_iter().flatten() {
            let li = self.doc.create_element("li");
            let child = self.node(&item, true, depth + 1);
            self.doc.append_child(li, child);
            self.doc.append_child(list, li);
        }
        self.path.pop();
        list
    }

    fn object(&mut self, object: &ObjectRef, expand_nested: bool, depth: usize) -> NodeId {
        // Unexpanded objects never recurse, so only expanded ones join the path.
        let id = object.identity();
        if expand_nested {
            if self.path.contains(&id) {
                return self.leaf(Kind::Object, CIRCULAR_LABEL);
            }
            self.path.push(id);
        }
        let list = self
            .doc
            .create_element_with_class("dl", Kind::Object.class_name());
        for (key, value) in object.own_entries() {
            let term = self.doc.create_element("dt");
            self.doc.append_text(term, &key);
            self.doc.append_child(list, term);

            let description = self.doc.create_element("dd");
            let content = if expand_nested {
                self.node(&value, false, depth + 1)
            } else {
                self.doc.create_text(&key)
            };
            self.doc.append_child(description, content);
            self.doc.append_child(list, description);
        }
        if expand_nested {
            self.path.pop();
        }
        list
    }

    fn element(&mut self, element: &ElementValue) -> NodeId {
        let attributes = self.doc.create_element("dl");
        for (name, value) in element.attributes() {
            let term = self.doc.create_element("dt");
            self.doc.append_text(term, name);
            self.doc.append_child(attributes, term);
            let description = self.doc.create_element("dd");
            self.doc.append_text(description, value);
            self.doc.append_child(attributes, description);
        }

        let open = self.doc.create_element_with_class("div", "open");
        self.doc.append_text(open, element.tag_name());
        self.doc.append_child(open, attributes);

        let content = self.doc.create_element_with_class("div", "content");
        self.doc.append_text(content, element.inner_html());

        let close = self.doc.create_element_with_class("div", "close");
        self.doc.append_text(close, element.tag_name());

        let wrapper = self
            .doc
            .create_element_with_class("div", Kind::Element.class_name());
        self.doc.append_child(wrapper, open);
        self.doc.append_child(wrapper, content);
        self.doc.append_child(wrapper, close);
        wrapper
    }
}

/// Read an element description off a duck-typed object.
///
/// `attributes` may be an object (name → value) or an array of
/// `{name, value}` records.
fn element_from_object(object: &ObjectRef) -> ElementValue {
    let source = Value::Object(object.clone());
    let tag = source
        .property("tagName")
        .or_else(|| source.property("nodeName"))
        .filter(|tag| !tag.is_nullish())
        .map(|tag| tag.to_display_string())
        .unwrap_or_default();
    let mut element = ElementValue::new(tag);

    match source.property("attributes") {
        Some(Value::Object(attributes)) => {
            for (name, value) in attributes.own_entries() {
                element = element.with_attribute(name, value.to_display_string());
            }
        }
        Some(Value::Array(attributes)) => {
            for record in attributes.slots().into_iter().flatten() {
                let Some(name) = record.property("name") else {
                    continue;
                };
                let value = record
                    .property("value")
                    .map(|v| v.to_display_string())
                    .unwrap_or_default();
                element = element.with_attribute(name.to_display_string(), value);
            }
        }
        _ => {}
    }

    if let Some(html) = source.property("innerHTML").filter(|v| !v.is_nullish()) {
        element = element.with_inner_html(html.to_display_string());
    }
    element
}
