#![forbid(unsafe_code)]

//! Headless in-memory [`Document`].
//!
//! Nodes live in an append-only arena and are never freed; a detached
//! subtree simply stops being reachable from [`MemoryDocument::body`].
//! The document records focus, listener registrations and scroll requests so
//! tests can observe every side effect the console engine performs.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use v_htmlescape::escape;

use crate::document::{Document, EventKind, ListenerId, NodeId};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone, Default)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    value: String,
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    scroll_requests: u32,
}

/// Arena-backed document with a single `<body>` root.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    slots: Vec<Slot>,
    body: NodeId,
    focused: Option<NodeId>,
    listeners: BTreeMap<ListenerId, (NodeId, EventKind)>,
    next_listener: u64,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Create a document containing only an empty `<body>`.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            body: NodeId::from_raw(0),
            focused: None,
            listeners: BTreeMap::new(),
            next_listener: 1,
        };
        doc.body = doc.create_element("body");
        doc
    }

    /// The root element every connected node descends from.
    #[must_use]
    pub const fn body(&self) -> NodeId {
        self.body
    }

    /// Total nodes ever created, attached or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.slots.len()
    }

    /// Node that currently holds focus.
    #[must_use]
    pub const fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Number of live listener registrations.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners registered on `node`.
    #[must_use]
    pub fn listeners_on(&self, node: NodeId) -> Vec<(ListenerId, EventKind)> {
        self.listeners
            .iter()
            .filter(|(_, (target, _))| *target == node)
            .map(|(id, (_, kind))| (*id, *kind))
            .collect()
    }

    /// Whether any listener for `kind` is registered on `node`.
    #[must_use]
    pub fn has_listener(&self, node: NodeId, kind: EventKind) -> bool {
        self.listeners
            .values()
            .any(|(target, registered)| *target == node && *registered == kind)
    }

    /// How many times `node` was asked to scroll to the bottom.
    #[must_use]
    pub fn scroll_requests(&self, node: NodeId) -> u32 {
        self.slot(node).map_or(0, |slot| slot.scroll_requests)
    }

    /// Whether `node` is a text node.
    #[must_use]
    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.slot(node).map(|slot| &slot.data), Some(NodeData::Text(_)))
    }

    /// Whether `node` is reachable from the body.
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(self.body, node)
    }

    /// Concatenated text of `node` and its descendants.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    /// Serialized markup of `node` including its own tag.
    #[must_use]
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn slot(&self, node: NodeId) -> Option<&Slot> {
        self.slots.get(node.raw() as usize)
    }

    fn slot_mut(&mut self, node: NodeId) -> Option<&mut Slot> {
        self.slots.get_mut(node.raw() as usize)
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.slot(node).map(|slot| &slot.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match self.slot_mut(node).map(|slot| &mut slot.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn push_slot(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::from_raw(self.slots.len() as u32);
        self.slots.push(Slot {
            data,
            parent: None,
            children: Vec::new(),
            scroll_requests: 0,
        });
        id
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.slot(id).and_then(|slot| slot.parent);
        }
        false
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.slot(child).and_then(|slot| slot.parent) else {
            return;
        };
        if let Some(parent_slot) = self.slot_mut(parent) {
            parent_slot.children.retain(|&c| c != child);
        }
        if let Some(child_slot) = self.slot_mut(child) {
            child_slot.parent = None;
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(slot) = self.slot(node) else {
            return;
        };
        match &slot.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(_) => {
                for &child in &slot.children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(slot) = self.slot(node) else {
            return;
        };
        match &slot.data {
            NodeData::Text(text) => {
                let _ = write!(out, "{}", escape(text));
            }
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    let _ = write!(out, " {}=\"{}\"", name, escape(value));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    return;
                }
                for &child in &slot.children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{}>", element.tag);
            }
        }
    }

    fn find_by_id(&self, node: NodeId, id: &str) -> Option<NodeId> {
        let slot = self.slot(node)?;
        if let NodeData::Element(element) = &slot.data
            && element
                .attributes
                .iter()
                .any(|(name, value)| name == "id" && value == id)
        {
            return Some(node);
        }
        slot.children
            .iter()
            .find_map(|&child| self.find_by_id(child, id))
    }
}

impl Document for MemoryDocument {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_slot(NodeData::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            ..ElementData::default()
        }))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.push_slot(NodeData::Text(text.to_owned()))
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.element(node).map(|element| element.tag.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.element(node)
            .map(|element| element.attributes.clone())
            .unwrap_or_default()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(node) else {
            return;
        };
        match element.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => value.clone_into(existing),
            None => element
                .attributes
                .push((name.to_owned(), value.to_owned())),
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attributes.retain(|(key, _)| key != name);
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.element(parent).is_none() || self.slot(child).is_none() {
            return;
        }
        if self.is_inclusive_ancestor(child, parent) {
            tracing::warn!(%parent, %child, "refusing to insert a node into its own subtree");
            return;
        }
        if reference == Some(child) {
            return;
        }
        self.detach(child);
        let Some(parent_slot) = self.slot_mut(parent) else {
            return;
        };
        let index = reference
            .and_then(|r| parent_slot.children.iter().position(|&c| c == r))
            .unwrap_or(parent_slot.children.len());
        parent_slot.children.insert(index, child);
        if let Some(child_slot) = self.slot_mut(child) {
            child_slot.parent = Some(parent);
        }
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.parent(child) == Some(parent) {
            self.detach(child);
        }
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.slot(node)
            .map(|slot| slot.children.clone())
            .unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slot(node).and_then(|slot| slot.parent)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_by_id(self.body, id)
    }

    fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn value(&self, node: NodeId) -> String {
        self.element(node)
            .map(|element| element.value.clone())
            .unwrap_or_default()
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(element) = self.element_mut(node) {
            value.clone_into(&mut element.value);
        }
    }

    fn focus(&mut self, node: NodeId) {
        if self.element(node).is_some() {
            self.focused = Some(node);
        }
    }

    fn scroll_to_bottom(&mut self, node: NodeId) {
        if let Some(slot) = self.slot_mut(node) {
            slot.scroll_requests = slot.scroll_requests.saturating_add(1);
        }
    }

    fn listen(&mut self, node: NodeId, kind: EventKind) -> ListenerId {
        let id = ListenerId::from_raw(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(id, (node, kind));
        id
    }

    fn unlisten(&mut self, listener: ListenerId) {
        self.listeners.remove(&listener);
    }
}
