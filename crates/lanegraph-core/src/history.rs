//! # History
//!
//! Snapshot-based undo/redo over the graph store's node and edge collections.
//!
//! The top of the history stack is always the live state. Snapshots are
//! owned values: nothing in either stack aliases the live graph.

use crate::{Edge, Node};
use serde::{Deserialize, Serialize};

/// A point-in-time copy of the node and edge collections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    #[must_use]
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }
}

/// Undo and redo stacks of full snapshots.
///
/// The undo stack is never empty: it holds at least the state the store
/// was constructed (or last cleared) with.
#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
}

impl History {
    /// Start a history whose only entry is `initial`.
    #[must_use]
    pub fn new(initial: Snapshot) -> Self {
        Self {
            undo: vec![initial],
            redo: Vec::new(),
        }
    }

    /// Push the post-mutation state. Any pending redo entries are discarded.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.undo.push(snapshot);
        self.redo.clear();
    }

    /// Step back. Returns the state to restore, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<Snapshot> {
        if self.undo.len() <= 1 {
            return None;
        }
        let current = self.undo.pop()?;
        self.redo.push(current);
        self.undo.last().cloned()
    }

    /// Step forward again. Returns the state to restore, or `None` when there
    /// is nothing to redo.
    pub fn redo(&mut self) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push(next.clone());
        Some(next)
    }

    /// The last known-good state.
    #[must_use]
    pub fn current(&self) -> Option<&Snapshot> {
        self.undo.last()
    }

    /// Drop all entries and start over from `initial`.
    pub fn reset(&mut self, initial: Snapshot) {
        self.undo.clear();
        self.undo.push(initial);
        self.redo.clear();
    }

    /// Number of entries on the undo stack, including the live state.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of entries that can be redone.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
