//! Pairwise conflict detection between observations of the same equipment.
//!
//! The dimension threshold here measures disagreement *within* one merge and
//! is deliberately separate from the change detector's drift threshold.

use arxos_types::{Conflict, ConflictId, ConflictType, ConflictValue};
use tracing::debug;

use crate::extractor::EquipmentObservation;

/// Default distance above which two positions conflict (metres).
pub const DEFAULT_POSITION_THRESHOLD: f64 = 0.5;

/// Default mean relative dimension delta above which dimensions conflict.
pub const DEFAULT_DIMENSION_THRESHOLD: f64 = 0.20;

pub const HINT_HIGHEST_CONFIDENCE: &str = "use_highest_confidence";
pub const HINT_MANUAL_VERIFICATION: &str = "manual_verification_recommended";
pub const HINT_FIELD_VERIFICATION: &str = "field_verification_required";

/// Flags disagreements between every unordered pair of observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConflictDetector {
    position_threshold: f64,
    dimension_threshold: f64,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(DEFAULT_POSITION_THRESHOLD, DEFAULT_DIMENSION_THRESHOLD)
    }
}

impl ConflictDetector {
    #[must_use]
    pub fn new(position_threshold: f64, dimension_threshold: f64) -> Self {
        Self {
            position_threshold,
            dimension_threshold,
        }
    }

    pub fn position_threshold(&self) -> f64 {
        self.position_threshold
    }

    pub fn dimension_threshold(&self) -> f64 {
        self.dimension_threshold
    }

    /// Compares every unordered pair of observations, in the order given.
    ///
    /// `source1` of each conflict is always the earlier observation.
    pub fn detect(&self, equipment_id: &str, observations: &[EquipmentObservation]) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for (i, first) in observations.iter().enumerate() {
            for second in &observations[i + 1..] {
                self.compare(equipment_id, first, second, &mut conflicts);
            }
        }

        if !conflicts.is_empty() {
            debug!(
                equipment_id,
                observations = observations.len(),
                conflicts = conflicts.len(),
                "Detected source conflicts"
            );
        }
        conflicts
    }

    fn compare(
        &self,
        equipment_id: &str,
        first: &EquipmentObservation,
        second: &EquipmentObservation,
        out: &mut Vec<Conflict>,
    ) {
        let distance = first.position.distance_to(&second.position);
        if distance > self.position_threshold {
            out.push(conflict(
                equipment_id,
                ConflictType::Position,
                first,
                second,
                ConflictValue::Position(first.position),
                ConflictValue::Position(second.position),
                distance,
                position_hint(distance),
            ));
        }

        // A source without a size has nothing to disagree about.
        if let (Some(first_dims), Some(second_dims)) = (first.dimensions, second.dimensions) {
            let delta = first_dims.mean_relative_delta(&second_dims);
            if delta > self.dimension_threshold {
                out.push(conflict(
                    equipment_id,
                    ConflictType::Dimension,
                    first,
                    second,
                    ConflictValue::Dimensions(first_dims),
                    ConflictValue::Dimensions(second_dims),
                    delta,
                    dimension_hint(delta),
                ));
            }
        }

        if !first.equipment_type.is_empty()
            && !second.equipment_type.is_empty()
            && first.equipment_type != second.equipment_type
        {
            let hint = if first.confidence == second.confidence {
                HINT_MANUAL_VERIFICATION
            } else {
                HINT_HIGHEST_CONFIDENCE
            };
            out.push(conflict(
                equipment_id,
                ConflictType::Type,
                first,
                second,
                ConflictValue::Type(first.equipment_type.clone()),
                ConflictValue::Type(second.equipment_type.clone()),
                1.0,
                hint,
            ));
        }
    }
}

/// Hint table for position disagreements, bucketed by distance in metres.
pub fn position_hint(distance: f64) -> &'static str {
    if distance < 1.0 {
        HINT_HIGHEST_CONFIDENCE
    } else if distance <= 3.0 {
        HINT_MANUAL_VERIFICATION
    } else {
        HINT_FIELD_VERIFICATION
    }
}

/// Hint table for dimension disagreements, bucketed by mean relative delta.
pub fn dimension_hint(delta: f64) -> &'static str {
    if delta < 0.3 {
        HINT_HIGHEST_CONFIDENCE
    } else if delta <= 0.5 {
        HINT_MANUAL_VERIFICATION
    } else {
        HINT_FIELD_VERIFICATION
    }
}

#[allow(clippy::too_many_arguments)]
fn conflict(
    equipment_id: &str,
    conflict_type: ConflictType,
    first: &EquipmentObservation,
    second: &EquipmentObservation,
    value1: ConflictValue,
    value2: ConflictValue,
    difference: f64,
    hint: &str,
) -> Conflict {
    Conflict {
        id: ConflictId::new(),
        equipment_id: equipment_id.to_string(),
        conflict_type,
        source1: first.source.clone(),
        source2: second.source.clone(),
        value1,
        value2,
        difference,
        resolution: hint.to_string(),
    }
}
