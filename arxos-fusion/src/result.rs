use arxos_resolution::ResolutionResult;
use arxos_types::{
    Change, ConfidenceLevel, Conflict, Dimensions, MergedEquipment, Point3, SourceType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Counts and timings for one fusion call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionStatistics {
    /// Every source passed in, attributed or not.
    pub total_sources: usize,
    pub source_breakdown: HashMap<SourceType, usize>,
    /// Equipment ids that produced a merged record.
    pub equipment_processed: usize,
    /// Equipment ids whose merge failed and were left out.
    pub equipment_dropped: usize,
    /// Sources with no resolvable equipment id.
    pub unattributed_sources: usize,
    pub conflicts_detected: usize,
    /// Conflicts whose resolution produced a value.
    pub conflicts_resolved: usize,
    pub changes_detected: usize,
    pub processing_time: Duration,
}

/// Output of one building fusion. Not retained by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub building_id: String,
    /// Merged records, ordered by equipment id.
    pub equipment: Vec<MergedEquipment>,
    pub changes: Vec<Change>,
    /// Every conflict detected, resolved or not.
    pub conflicts: Vec<Conflict>,
    pub resolutions: Vec<ResolutionResult>,
    /// Scanned share of the building as a percentage in `[0, 100]`,
    /// reported by the coverage tracker. Zero without one.
    pub coverage: f64,
    pub confidence_score: f64,
    pub statistics: FusionStatistics,
    pub completed_at: DateTime<Utc>,
}

impl FusionResult {
    pub fn get_equipment(&self, equipment_id: &str) -> Option<&MergedEquipment> {
        self.equipment.iter().find(|e| e.equipment_id == equipment_id)
    }

    /// Resolutions still waiting on a person.
    pub fn pending_actions(&self) -> impl Iterator<Item = &ResolutionResult> {
        self.resolutions.iter().filter(|r| r.requires_action)
    }
}

/// A scan detection that matched no known equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEquipmentCandidate {
    pub candidate_id: String,
    /// The detector's class label.
    pub equipment_type: String,
    pub position: Point3,
    pub dimensions: Dimensions,
    pub confidence: ConfidenceLevel,
    pub score: f64,
}

/// A known record that a scan of its area did not see again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedEquipmentCandidate {
    pub equipment_id: String,
    pub equipment_type: String,
    pub last_position: Point3,
    /// How well the area around the last position was scanned.
    pub region_confidence: ConfidenceLevel,
}

/// Output of a partial range-scan fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialScanResult {
    pub fusion: FusionResult,
    pub new_equipment: Vec<NewEquipmentCandidate>,
    pub removed_equipment: Vec<RemovedEquipmentCandidate>,
}
