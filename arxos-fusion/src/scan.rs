//! Adapting a range-scan pass into fusion sources.

use arxos_types::{
    ConfidenceLevel, DataSource, Point3, ScanDetection, SourcePayload, SourceType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pass of the range scanner over part of a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeScanPass {
    pub scan_id: String,
    pub timestamp: DateTime<Utc>,
    pub detections: Vec<ScanDetection>,
}

/// Known equipment the scan is expected to see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentHint {
    pub equipment_id: String,
    /// Empty matches any class label.
    #[serde(default)]
    pub equipment_type: String,
    pub position: Point3,
    /// Falls back to the configured match radius.
    #[serde(default)]
    pub search_radius: Option<f64>,
}

/// Outcome of matching a pass against the hints.
#[derive(Debug, Default)]
pub(crate) struct ScanMatches {
    pub sources: Vec<DataSource>,
    /// Indices into the pass's detections.
    pub unmatched: Vec<usize>,
}

/// Nearest hint within its radius whose type is empty or equal to the label.
pub fn match_hint<'a>(
    detection: &ScanDetection,
    hints: &'a [EquipmentHint],
    default_radius: f64,
) -> Option<&'a EquipmentHint> {
    hints
        .iter()
        .filter(|hint| {
            hint.equipment_type.is_empty() || hint.equipment_type == detection.class_label
        })
        .map(|hint| (hint, hint.position.distance_to(&detection.centroid)))
        .filter(|(hint, distance)| *distance <= hint.search_radius.unwrap_or(default_radius))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(hint, _)| hint)
}

/// Turns detections into range-scan sources. Detections that already carry
/// an equipment id keep it; the rest are matched against the hints.
pub(crate) fn scan_sources(
    pass: &RangeScanPass,
    hints: &[EquipmentHint],
    default_radius: f64,
) -> ScanMatches {
    let mut matches = ScanMatches::default();

    for (index, detection) in pass.detections.iter().enumerate() {
        let equipment_id = match detection.equipment_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => match match_hint(detection, hints, default_radius) {
                Some(hint) => hint.equipment_id.clone(),
                None => {
                    matches.unmatched.push(index);
                    continue;
                }
            },
        };

        let mut record = detection.clone();
        record.equipment_id = Some(equipment_id.clone());
        let source = DataSource::new(
            format!("{}-{index}", pass.scan_id),
            SourceType::RangeScan,
            ConfidenceLevel::from_score(detection.score),
            SourcePayload::RangeScan(record),
        )
        .with_timestamp(pass.timestamp)
        .with_equipment_id(equipment_id);
        matches.sources.push(source);
    }

    matches
}
