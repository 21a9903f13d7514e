//! Audit log of resolved conflicts.

use arxos_types::Conflict;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::engine::ResolutionResult;

/// One audit entry: the conflict as seen and what was decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub conflict: Conflict,
    pub result: ResolutionResult,
}

/// Append-only log with an optional retention limit.
///
/// With no limit the log grows without bound. With a limit the oldest
/// entries are evicted first.
#[derive(Debug, Clone, Default)]
pub struct ResolutionHistory {
    entries: VecDeque<ResolutionRecord>,
    limit: Option<usize>,
}

impl ResolutionHistory {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    pub fn push(&mut self, record: ResolutionRecord) {
        if let Some(limit) = self.limit {
            if limit == 0 {
                return;
            }
            while self.entries.len() >= limit {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolutionRecord> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
