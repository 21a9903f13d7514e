use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::{ConfidenceLevel, Conflict, Dimensions, Point3, SourceRef};

/// How observations from several sources are combined into one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Take every field from the most trusted source.
    #[default]
    HighestConfidence,
    /// Take every field from the newest source.
    MostRecent,
    /// Confidence-weighted mean of position and dimensions.
    WeightedAverage,
    /// Plain mean when sources agree, penalised fallback when they do not.
    Consensus,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HighestConfidence => "highest_confidence",
            Self::MostRecent => "most_recent",
            Self::WeightedAverage => "weighted_average",
            Self::Consensus => "consensus",
        };
        f.write_str(name)
    }
}

/// The reconciled view of one physical equipment item.
///
/// Produced once per equipment id per fusion call. The caller owns durability
/// and hands previous records back as the existing model on the next call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEquipment {
    pub equipment_id: String,
    pub position: Point3,
    pub dimensions: Dimensions,
    pub equipment_type: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    pub confidence: ConfidenceLevel,
    /// Sources that yielded a valid observation.
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    /// Conflicts detected during the merge that remain unresolved.
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    pub strategy: MergeStrategy,
    pub merged_at: DateTime<Utc>,
}

impl MergedEquipment {
    /// Creates a record with no sources, conflicts or attributes.
    pub fn new(
        equipment_id: impl Into<String>,
        equipment_type: impl Into<String>,
        position: Point3,
        dimensions: Dimensions,
        confidence: ConfidenceLevel,
    ) -> Self {
        Self {
            equipment_id: equipment_id.into(),
            position,
            dimensions,
            equipment_type: equipment_type.into(),
            attributes: HashMap::new(),
            confidence,
            sources: Vec::new(),
            conflicts: Vec::new(),
            strategy: MergeStrategy::default(),
            merged_at: Utc::now(),
        }
    }

    /// Number of contributing sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}
