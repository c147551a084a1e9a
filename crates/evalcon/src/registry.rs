#![forbid(unsafe_code)]

//! One console per mount element.
//!
//! [`SessionRegistry`] is plain owned state: construct as many as needed,
//! one per document or test. Acquiring an element that already hosts a
//! console returns the existing [`Session`] and never mounts twice.
//!
//! ```
//! use evalcon::{ExprEvaluator, SessionRegistry, Value};
//! use evalcon_dom::{Document, MemoryDocument};
//!
//! let mut doc = MemoryDocument::new();
//! let mount = doc.create_element("div");
//! doc.set_attribute(mount, "id", "console");
//! let body = doc.body();
//! doc.append_child(body, mount);
//!
//! let mut registry = SessionRegistry::new(ExprEvaluator::new());
//! let session = registry.acquire(&mut doc, "console", None)?;
//! let run = session.execute(&mut doc, "1 + 1").expect("not blank");
//! assert_eq!(run.value.to_display_string(), "2");
//! # Ok::<(), evalcon::ConsoleError>(())
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::rc::Rc;

use evalcon_dom::{Document, DomEvent, NodeId};

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::eval::Evaluator;
use crate::session::{EventOutcome, Session};
use crate::value::{ObjectRef, Value};

/// How a caller names the element to mount on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountTarget {
    /// A node handle.
    Node(NodeId),
    /// The `id` attribute of a connected element.
    Id(String),
}

impl From<NodeId> for MountTarget {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for MountTarget {
    fn from(id: &str) -> Self {
        Self::Id(id.to_owned())
    }
}

impl From<String> for MountTarget {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

/// Sessions keyed by mount element.
pub struct SessionRegistry {
    sessions: BTreeMap<NodeId, Session>,
    evaluator: Rc<dyn Evaluator>,
    global_scope: Value,
    config: ConsoleConfig,
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Registry sharing `evaluator` across its sessions, with default config
    /// and an empty global scope.
    #[must_use]
    pub fn new(evaluator: impl Evaluator + 'static) -> Self {
        Self {
            sessions: BTreeMap::new(),
            evaluator: Rc::new(evaluator),
            global_scope: Value::Object(ObjectRef::new()),
            config: ConsoleConfig::default(),
        }
    }

    /// Configuration applied to sessions mounted from now on.
    #[must_use]
    pub fn with_config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    /// Scope for sessions acquired without one.
    #[must_use]
    pub fn with_global_scope(mut self, scope: Value) -> Self {
        self.global_scope = scope;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Resolve `target` to an element node.
    pub fn resolve<D: Document + ?Sized>(&self, doc: &D, target: &MountTarget) -> Result<NodeId> {
        match target {
            MountTarget::Node(node) if doc.tag_name(*node).is_some() => Ok(*node),
            MountTarget::Node(node) => Err(ConsoleError::NotAnElement { node: *node }),
            MountTarget::Id(id) => {
                doc.element_by_id(id)
                    .ok_or_else(|| ConsoleError::MountNotFound { id: id.clone() })
            }
        }
    }

    /// Return the session mounted on `target`, mounting one if needed.
    ///
    /// For an existing session a supplied `scope` replaces its current one;
    /// `None` leaves it unchanged. A new session without a scope uses the
    /// registry's global scope.
    pub fn acquire<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        target: impl Into<MountTarget>,
        scope: Option<Value>,
    ) -> Result<&mut Session> {
        let node = self.resolve(&*doc, &target.into())?;
        match self.sessions.entry(node) {
            Entry::Occupied(entry) => {
                let session = entry.into_mut();
                if let Some(scope) = scope {
                    session.change_scope(scope);
                }
                Ok(session)
            }
            Entry::Vacant(entry) => {
                let scope = scope.unwrap_or_else(|| self.global_scope.clone());
                let session =
                    Session::mount(doc, node, scope, Rc::clone(&self.evaluator), &self.config);
                Ok(entry.insert(session))
            }
        }
    }

    /// Destroy any session on `target`, then mount a fresh one.
    pub fn replace<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        target: impl Into<MountTarget>,
        scope: Option<Value>,
    ) -> Result<&mut Session> {
        let node = self.resolve(&*doc, &target.into())?;
        self.destroy(doc, node)?;
        self.acquire(doc, node, scope)
    }

    /// Tear down the session on `target`, restoring the element.
    ///
    /// Returns `false` when no session was mounted there.
    pub fn destroy<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        target: impl Into<MountTarget>,
    ) -> Result<bool> {
        let node = self.resolve(&*doc, &target.into())?;
        let Some(session) = self.sessions.remove(&node) else {
            return Ok(false);
        };
        session.teardown(doc);
        Ok(true)
    }

    /// Tear down every session.
    pub fn destroy_all<D: Document + ?Sized>(&mut self, doc: &mut D) {
        for session in std::mem::take(&mut self.sessions).into_values() {
            session.teardown(doc);
        }
    }

    /// Route a host event on `target` to the session listening there.
    pub fn dispatch<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        target: NodeId,
        event: &DomEvent,
    ) -> EventOutcome {
        let kind = event.kind();
        let Some(session) = self
            .sessions
            .values_mut()
            .find(|session| session.listens_to(target, kind))
        else {
            tracing::warn!(%target, kind = kind.as_str(), "no console listens for event");
            return EventOutcome::Ignored;
        };
        session.handle_event(doc, target, event)
    }

    #[must_use]
    pub fn get(&self, mount: NodeId) -> Option<&Session> {
        self.sessions.get(&mount)
    }

    pub fn get_mut(&mut self, mount: NodeId) -> Option<&mut Session> {
        self.sessions.get_mut(&mount)
    }

    #[must_use]
    pub fn contains(&self, mount: NodeId) -> bool {
        self.sessions.contains_key(&mount)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
