//! Error types for the change detector.

use arxos_types::ChangeId;
use thiserror::Error;

/// Result type for change-history operations.
pub type ChangeResult<T> = Result<T, ChangeError>;

#[derive(Debug, Error)]
pub enum ChangeError {
    /// No change with this id is retained in the history.
    #[error("change not found: {0}")]
    NotFound(ChangeId),
}
