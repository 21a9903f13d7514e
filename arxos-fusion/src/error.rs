//! Error types for the fusion pipeline.
//!
//! Per-equipment failures degrade into statistics; only cancellation
//! aborts a whole call.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FusionError {
    /// The cancellation token fired between equipment groups.
    #[error("fusion cancelled after {processed} equipment groups")]
    Cancelled { processed: usize },
}
