#![forbid(unsafe_code)]

//! The [`Document`] capability trait and its handle types.
//!
//! Every method is infallible. Operations on stale or foreign handles are
//! no-ops (or return empty results) rather than panics; a host bridge that
//! can fail should log and degrade the same way.

use std::fmt;

/// Opaque handle to a node owned by a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Wrap a raw host handle.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw host handle.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw host handle.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw host handle.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Event types a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    KeyDown,
    Focus,
    Blur,
}

impl EventKind {
    /// DOM event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeyDown => "keydown",
            Self::Focus => "focus",
            Self::Blur => "blur",
        }
    }
}

/// Element/text primitives the console engine issues calls against.
///
/// Implementors own the node storage. Newly created nodes are detached until
/// appended somewhere.
pub trait Document {
    /// Create a detached element with the given tag name.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Create a detached text node.
    fn create_text(&mut self, text: &str) -> NodeId;

    /// Lower-case tag name of an element, `None` for text nodes.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    /// Attribute value, `None` when absent.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// All attributes in their native order.
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    /// Set (or overwrite) an attribute.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    /// Remove an attribute if present.
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Append `child` as the last child of `parent`, detaching it first.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Insert `child` before `reference`; appends when `reference` is `None`
    /// or not a child of `parent`.
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>);

    /// Detach `child` from `parent`. No-op if it is not a child of `parent`.
    fn remove_child(&mut self, parent: NodeId, child: NodeId);

    /// Children in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Parent node, if attached.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Look up a connected element by its `id` attribute.
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    /// Serialized markup of the node's children.
    fn inner_html(&self, node: NodeId) -> String;

    /// Current value of a form control.
    fn value(&self, node: NodeId) -> String;

    /// Replace the value of a form control.
    fn set_value(&mut self, node: NodeId, value: &str);

    /// Move keyboard focus to `node`.
    fn focus(&mut self, node: NodeId);

    /// Scroll `node` so its last content is visible.
    fn scroll_to_bottom(&mut self, node: NodeId);

    /// Register interest in `kind` events targeted at `node`.
    fn listen(&mut self, node: NodeId, kind: EventKind) -> ListenerId;

    /// Remove a previously registered listener.
    fn unlisten(&mut self, listener: ListenerId);

    /// First child, if any.
    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    /// Whether the `class` attribute contains `class`.
    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    /// Add every whitespace-separated class in `classes`, skipping duplicates.
    fn add_class(&mut self, node: NodeId, classes: &str) {
        let existing = self.attribute(node, "class").unwrap_or_default();
        let mut list: Vec<&str> = existing.split_whitespace().collect();
        for class in classes.split_whitespace() {
            if !list.contains(&class) {
                list.push(class);
            }
        }
        let joined = list.join(" ");
        self.set_attribute(node, "class", &joined);
    }

    /// Create an element carrying `class`.
    fn create_element_with_class(&mut self, tag: &str, class: &str) -> NodeId {
        let node = self.create_element(tag);
        if !class.is_empty() {
            self.add_class(node, class);
        }
        node
    }

    /// Append a new text node to `node` and return it.
    fn append_text(&mut self, node: NodeId, text: &str) -> NodeId {
        let text = self.create_text(text);
        self.append_child(node, text);
        text
    }
}
