#![forbid(unsafe_code)]

//! Command history with a navigation cursor.
//!
//! # Invariants
//!
//! 1. No two consecutive stored entries are equal
//! 2. `cursor <= len()`; `cursor == len()` is the virtual "new command" slot
//! 3. `len() <= capacity`; the oldest entry is evicted first
//!
//! ```text
//! push a, b, b, c          entries: [a, b, c]   cursor: 3 (virtual end)
//! previous() x4            c, b, a, a           cursor: 0 (clamped)
//! next() x3                b, c, None           cursor: 3
//! ```

use std::collections::VecDeque;

use crate::config::HistoryConfig;

/// Ordered command history, oldest first.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    cursor: usize,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl History {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self::with_capacity(config.capacity)
    }

    /// History bounded to `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record `command` unless it repeats the newest entry, then reset the
    /// cursor.
    pub fn push(&mut self, command: &str) {
        if self.entries.back().map(String::as_str) != Some(command) {
            self.entries.push_back(command.to_owned());
            while self.entries.len() > self.capacity {
                self.entries.pop_front();
            }
        }
        self.reset();
    }

    /// Step back; clamps at the oldest entry. `None` only when empty.
    pub fn previous(&mut self) -> Option<&str> {
        self.cursor = self.cursor.saturating_sub(1);
        tracing::trace!(cursor = self.cursor, "history.previous");
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Step forward; `None` once the cursor reaches the virtual end slot,
    /// meaning the input should be emptied.
    pub fn next(&mut self) -> Option<&str> {
        self.cursor = (self.cursor + 1).min(self.entries.len());
        tracing::trace!(cursor = self.cursor, "history.next");
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Move the cursor to the virtual end slot.
    pub fn reset(&mut self) {
        self.cursor = self.entries.len();
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored entries, oldest first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.entries.iter().map(String::as_str)
    }
}
