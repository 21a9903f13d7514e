//! Error types for rule management.
//!
//! Resolving a conflict never fails; only edits to the rule set can.

use thiserror::Error;

/// Errors that can occur while editing the rule set.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// A rule with this id is already registered.
    #[error("duplicate resolution rule: {0}")]
    DuplicateRule(String),
}
