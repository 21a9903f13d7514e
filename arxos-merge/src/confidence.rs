use arxos_types::{ConfidenceLevel, SourceType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which aspect of an equipment record a confidence update refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceAspect {
    /// Where the equipment is.
    Position,
    /// What the equipment is.
    Semantic,
}

impl fmt::Display for ConfidenceAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position => f.write_str("position"),
            Self::Semantic => f.write_str("semantic"),
        }
    }
}

/// Collaborator that tracks per-equipment confidence outside the core.
///
/// Calls are fire-and-forget: the merger logs a returned error and moves on.
pub trait ConfidenceManager: Send + Sync {
    /// Records the confidence of one aspect of an equipment record.
    /// Return `Err(message)` if the update could not be stored.
    fn update_confidence(
        &self,
        equipment_id: &str,
        aspect: ConfidenceAspect,
        level: ConfidenceLevel,
        source: SourceType,
    ) -> Result<(), String>;
}
