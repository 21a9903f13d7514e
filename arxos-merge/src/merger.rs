//! Strategy merger: combines observations of one equipment id into a record.
//!
//! The active configuration is an immutable [`MergerConfig`] snapshot. Setters
//! swap the snapshot under a write lock; a merge clones the `Arc` once and
//! reads every field from that one snapshot, so a concurrent reconfiguration
//! can never mix old and new fields within a single merge.

use arxos_types::{
    ConfidenceLevel, Conflict, DataSource, Dimensions, MergeStrategy, MergedEquipment, Point3,
    SourceRef,
};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::confidence::{ConfidenceAspect, ConfidenceManager};
use crate::conflict::{ConflictDetector, DEFAULT_DIMENSION_THRESHOLD, DEFAULT_POSITION_THRESHOLD};
use crate::error::{MergeError, MergeResult};
use crate::extractor::{extract_observation, EquipmentObservation};

/// Configuration for the strategy merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergerConfig {
    /// Strategy applied to every merge.
    pub strategy: MergeStrategy,
    /// Distance above which two positions conflict (metres).
    pub position_threshold: f64,
    /// Mean relative dimension delta above which dimensions conflict.
    pub dimension_threshold: f64,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            strategy: MergeStrategy::HighestConfidence,
            position_threshold: DEFAULT_POSITION_THRESHOLD,
            dimension_threshold: DEFAULT_DIMENSION_THRESHOLD,
        }
    }
}

/// Merges per-source observations into one [`MergedEquipment`].
pub struct StrategyMerger {
    config: RwLock<Arc<MergerConfig>>,
    confidence_manager: Option<Arc<dyn ConfidenceManager>>,
}

impl Default for StrategyMerger {
    fn default() -> Self {
        Self::new(MergerConfig::default())
    }
}

impl StrategyMerger {
    /// Creates a merger without a confidence collaborator.
    pub fn new(config: MergerConfig) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            confidence_manager: None,
        }
    }

    /// Creates a merger that reports merged confidence to a collaborator.
    pub fn with_confidence_manager(
        config: MergerConfig,
        manager: Arc<dyn ConfidenceManager>,
    ) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            confidence_manager: Some(manager),
        }
    }

    /// Returns the current configuration snapshot.
    pub fn config(&self) -> Arc<MergerConfig> {
        Arc::clone(&self.config.read())
    }

    /// Replaces the whole configuration.
    pub fn set_config(&self, config: MergerConfig) {
        *self.config.write() = Arc::new(config);
    }

    pub fn set_strategy(&self, strategy: MergeStrategy) {
        self.update(|config| config.strategy = strategy);
    }

    pub fn set_position_threshold(&self, threshold: f64) {
        self.update(|config| config.position_threshold = threshold);
    }

    pub fn set_dimension_threshold(&self, threshold: f64) {
        self.update(|config| config.dimension_threshold = threshold);
    }

    fn update(&self, apply: impl FnOnce(&mut MergerConfig)) {
        let mut guard = self.config.write();
        let mut next = (**guard).clone();
        apply(&mut next);
        *guard = Arc::new(next);
    }

    /// Merges all sources describing `equipment_id` using the active strategy.
    ///
    /// Sources whose payload cannot be read are skipped. Fails if `sources`
    /// is empty or if no source yields an observation.
    pub fn merge_equipment_data(
        &self,
        equipment_id: &str,
        sources: &[DataSource],
    ) -> MergeResult<MergedEquipment> {
        if sources.is_empty() {
            return Err(MergeError::NoSources {
                equipment_id: equipment_id.to_string(),
            });
        }

        let config = self.config();
        let mut observations: Vec<EquipmentObservation> =
            sources.iter().filter_map(extract_observation).collect();
        if observations.is_empty() {
            return Err(MergeError::NoValidObservations {
                equipment_id: equipment_id.to_string(),
            });
        }

        // Both sorts are stable, so ties keep input order.
        match config.strategy {
            MergeStrategy::HighestConfidence => {
                observations.sort_by(|a, b| b.confidence.cmp(&a.confidence));
            }
            MergeStrategy::MostRecent => {
                observations.sort_by(|a, b| b.source.timestamp.cmp(&a.source.timestamp));
            }
            MergeStrategy::WeightedAverage | MergeStrategy::Consensus => {}
        }

        let detector = ConflictDetector::new(config.position_threshold, config.dimension_threshold);
        let conflicts = detector.detect(equipment_id, &observations);

        let fused = match config.strategy {
            MergeStrategy::HighestConfidence | MergeStrategy::MostRecent => {
                Fused::from_primary(&observations)
            }
            MergeStrategy::WeightedAverage => weighted_average(&observations),
            MergeStrategy::Consensus => consensus(&observations, &conflicts),
        };

        let merged = MergedEquipment {
            equipment_id: equipment_id.to_string(),
            position: fused.position,
            dimensions: fused.dimensions,
            equipment_type: fused.equipment_type,
            attributes: fused.attributes,
            confidence: fused.confidence,
            sources: observations.iter().map(|o| o.source.clone()).collect(),
            conflicts,
            strategy: config.strategy,
            merged_at: Utc::now(),
        };

        debug!(
            equipment_id,
            strategy = %config.strategy,
            sources = sources.len(),
            observations = merged.sources.len(),
            conflicts = merged.conflicts.len(),
            confidence = %merged.confidence,
            "Merged equipment"
        );

        self.report_confidence(&merged, &observations[0].source);
        Ok(merged)
    }

    fn report_confidence(&self, merged: &MergedEquipment, primary: &SourceRef) {
        let Some(manager) = &self.confidence_manager else {
            return;
        };

        let mut updates = vec![ConfidenceAspect::Position];
        if !merged.equipment_type.is_empty() {
            updates.push(ConfidenceAspect::Semantic);
        }

        for aspect in updates {
            if let Err(e) = manager.update_confidence(
                &merged.equipment_id,
                aspect,
                merged.confidence,
                primary.source_type,
            ) {
                warn!(
                    equipment_id = %merged.equipment_id,
                    %aspect,
                    "Confidence update failed: {e}"
                );
            }
        }
    }
}

/// Field values produced by one strategy.
struct Fused {
    position: Point3,
    dimensions: Dimensions,
    equipment_type: String,
    attributes: HashMap<String, Value>,
    confidence: ConfidenceLevel,
}

impl Fused {
    /// Takes every field from the first observation. Dimensions come from the
    /// first observation that reported any.
    fn from_primary(observations: &[EquipmentObservation]) -> Self {
        let primary = &observations[0];
        Self {
            position: primary.position,
            dimensions: observations
                .iter()
                .find_map(|o| o.dimensions)
                .unwrap_or_default(),
            equipment_type: primary.equipment_type.clone(),
            attributes: primary.attributes.clone(),
            confidence: primary.confidence,
        }
    }
}

fn confidence_weight(observation: &EquipmentObservation) -> f64 {
    f64::from(observation.confidence.ordinal()) + 1.0
}

/// Weighted mean over the observations that reported dimensions. Zero when
/// none did.
fn mean_dimensions(
    observations: &[EquipmentObservation],
    weight: impl Fn(&EquipmentObservation) -> f64,
) -> Dimensions {
    let mut total_weight = 0.0;
    let mut sum = Dimensions::default();
    for o in observations {
        let Some(dimensions) = o.dimensions else {
            continue;
        };
        let w = weight(o);
        total_weight += w;
        sum.length += dimensions.length * w;
        sum.width += dimensions.width * w;
        sum.height += dimensions.height * w;
    }

    if total_weight == 0.0 {
        return Dimensions::default();
    }
    Dimensions::new(
        sum.length / total_weight,
        sum.width / total_weight,
        sum.height / total_weight,
    )
}

/// Confidence-weighted mean. Weight is `ordinal + 1` so Estimated still counts.
/// Type comes from the first observation in input order.
fn weighted_average(observations: &[EquipmentObservation]) -> Fused {
    if observations.len() == 1 {
        return Fused::from_primary(observations);
    }

    let mut total_weight = 0.0;
    let mut position = Point3::default();
    let mut ordinal_sum: u32 = 0;

    for o in observations {
        let weight = confidence_weight(o);
        total_weight += weight;
        position.x += o.position.x * weight;
        position.y += o.position.y * weight;
        position.z += o.position.z * weight;
        ordinal_sum += u32::from(o.confidence.ordinal());
    }

    let average_ordinal = ordinal_sum / observations.len() as u32;

    Fused {
        position: Point3::new(
            position.x / total_weight,
            position.y / total_weight,
            position.z / total_weight,
        ),
        dimensions: mean_dimensions(observations, confidence_weight),
        equipment_type: observations[0].equipment_type.clone(),
        attributes: union_attributes(observations),
        confidence: ConfidenceLevel::try_from(average_ordinal as u8)
            .unwrap_or(ConfidenceLevel::Estimated),
    }
}

/// Plain mean with High confidence when several sources agree; otherwise the
/// first observation with confidence capped at Medium.
fn consensus(observations: &[EquipmentObservation], conflicts: &[Conflict]) -> Fused {
    if !conflicts.is_empty() || observations.len() == 1 {
        let mut fused = Fused::from_primary(observations);
        fused.confidence = fused.confidence.min(ConfidenceLevel::Medium);
        return fused;
    }

    let n = observations.len() as f64;
    let mut position = Point3::default();
    for o in observations {
        position.x += o.position.x;
        position.y += o.position.y;
        position.z += o.position.z;
    }

    Fused {
        position: Point3::new(position.x / n, position.y / n, position.z / n),
        dimensions: mean_dimensions(observations, |_| 1.0),
        equipment_type: observations[0].equipment_type.clone(),
        attributes: union_attributes(observations),
        confidence: ConfidenceLevel::High,
    }
}

/// Union of all attribute maps; the earliest observation wins on key clashes.
fn union_attributes(observations: &[EquipmentObservation]) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    for o in observations {
        for (key, value) in &o.attributes {
            attributes.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    attributes
}
