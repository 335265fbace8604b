use std::collections::VecDeque;

use crate::tree::{MindTree, NodeId};

/// Default bound on retained snapshots.
pub const DEFAULT_CAPACITY: usize = 50;

/// A full pre-mutation copy of the editing state.
///
/// Whole-tree snapshots (not diffs) are the contract: eviction of the oldest
/// entry must leave every remaining entry independently restorable. The id
/// counter travels inside the tree.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tree: MindTree,
    pub selected: Option<NodeId>,
}

/// Bounded, single-direction undo stack.
///
/// On overflow the oldest entry is dropped first, so the most recent
/// `capacity` mutations are always recoverable. There is no redo.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// Pops the most recent snapshot, or `None` when there is nothing to undo.
    pub fn pop(&mut self) -> Option<Snapshot> {
        self.entries.pop_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
