//! History Stack
//!
//! Bounded stack of deep snapshots taken immediately before each
//! undoable mutation. The oldest snapshot is evicted on overflow.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct History<T> {
    /// Oldest at the front, most recent at the back
    snapshots: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> History<T> {
    /// A capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a deep copy of `state`
    pub fn push(&mut self, state: &T) {
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(state.clone());
    }

    /// Take the most recent snapshot
    pub fn undo(&mut self) -> Option<T> {
        self.snapshots.pop_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Rewrite every stored snapshot in place
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        for snapshot in self.snapshots.iter_mut() {
            f(snapshot);
        }
    }
}
