//! Core type definitions for ArxOS equipment data fusion.
//!
//! This crate defines the types shared by every stage of the fusion core:
//! - Conflict and change identifiers (UUID v7)
//! - The ordinal [`ConfidenceLevel`] scale
//! - Geometry primitives ([`Point3`], [`Dimensions`])
//! - Raw [`DataSource`] observations and their typed payload records
//! - The reconciled [`MergedEquipment`] record
//! - [`Conflict`]s detected during a merge and [`Change`]s detected across merges
//!
//! Nothing here performs I/O. Persistence of these values is the caller's job.

mod change;
mod confidence;
mod conflict;
mod equipment;
mod geometry;
mod ids;
mod source;

pub use change::{Change, ChangeType};
pub use confidence::ConfidenceLevel;
pub use conflict::{Conflict, ConflictType, ConflictValue};
pub use equipment::{MergeStrategy, MergedEquipment};
pub use geometry::{Dimensions, Point3};
pub use ids::{ChangeId, ConflictId};
pub use source::{
    ArPlacement, DataSource, DocumentRecord, ManualEntry, ModelElement, ScanDetection,
    SourcePayload, SourceRef, SourceType,
};

/// Metadata key carrying the equipment id of a source.
pub const EQUIPMENT_ID_KEY: &str = "equipment_id";

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid confidence ordinal: {0}")]
    InvalidConfidence(u8),
}
