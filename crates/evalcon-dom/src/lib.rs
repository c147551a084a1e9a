#![forbid(unsafe_code)]

//! Document capability for evalcon.
//!
//! # Role in evalcon
//! `evalcon-dom` is the boundary between the console engine and whatever
//! actually owns the page. The engine never creates real UI elements itself;
//! it issues calls against the [`Document`] trait (create element, set
//! attribute, append child, add class, listen for events) and the host
//! pushes input back in as [`DomEvent`] values.
//!
//! Design goals:
//! - **Host-driven input**: the embedding environment dispatches events; nothing
//!   here blocks or spawns.
//! - **Opaque handles**: nodes are addressed by [`NodeId`], listeners by
//!   [`ListenerId`], so a wasm bridge can map them onto its own objects.
//! - **Headless by default**: [`MemoryDocument`] is a complete in-memory
//!   implementation with HTML serialization, used by tests and the demo.

pub mod document;
pub mod event;
pub mod memory;

pub use document::{Document, EventKind, ListenerId, NodeId};
pub use event::{DomEvent, KeyCode, KeyEvent, KeyEventKind, Modifiers};
pub use memory::MemoryDocument;
