//! Error types for the merge layer.

use thiserror::Error;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that can occur while merging sources for one equipment id.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The caller passed an empty source list.
    #[error("no sources provided for equipment {equipment_id}")]
    NoSources { equipment_id: String },

    /// Every source was skipped during extraction.
    #[error("no valid observations extracted for equipment {equipment_id}")]
    NoValidObservations { equipment_id: String },
}
