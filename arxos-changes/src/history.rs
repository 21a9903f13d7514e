use arxos_types::{Change, ChangeId};
use std::collections::VecDeque;

/// Default number of changes retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

/// Capacity-bounded change log. The oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct ChangeHistory {
    entries: VecDeque<Change>,
    capacity: usize,
}

impl Default for ChangeHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ChangeHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, change: Change) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(change);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.entries.iter()
    }

    pub fn get(&self, id: ChangeId) -> Option<&Change> {
        self.entries.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: ChangeId) -> Option<&mut Change> {
        self.entries.iter_mut().find(|c| c.id == id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
