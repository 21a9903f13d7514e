//! Source extraction: normalises a raw [`DataSource`] into an observation.
//!
//! Typed payload records are read only when they match the source's type tag.
//! Generic JSON mappings fall back to key lookup. A source whose payload
//! cannot be read is skipped, not treated as an error.

use arxos_types::{ConfidenceLevel, DataSource, Dimensions, Point3, SourcePayload, SourceRef};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

const POSITION_KEYS: [&str; 2] = ["position", "location"];
const DIMENSION_KEYS: [&str; 2] = ["dimensions", "size"];
const TYPE_KEYS: [&str; 2] = ["type", "equipment_type"];
const ATTRIBUTES_KEY: &str = "attributes";

/// One source's normalised view of a piece of equipment.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentObservation {
    pub source: SourceRef,
    pub position: Point3,
    /// `None` when the source did not report a size.
    pub dimensions: Option<Dimensions>,
    pub equipment_type: String,
    pub attributes: HashMap<String, Value>,
    pub confidence: ConfidenceLevel,
}

/// Extracts an observation from a source, or `None` when the payload shape
/// does not fit the source's type.
pub fn extract_observation(source: &DataSource) -> Option<EquipmentObservation> {
    if let Some(record_type) = source.payload.record_type() {
        if record_type != source.source_type {
            debug!(
                source_id = %source.id,
                source_type = %source.source_type,
                payload_type = %record_type,
                "Skipping source whose payload record does not match its type"
            );
            return None;
        }
    }

    let (position, dimensions, equipment_type, attributes) = match &source.payload {
        SourcePayload::Document(record) => (
            record.location,
            record.dimensions,
            record.equipment_type.clone(),
            record.properties.clone(),
        ),
        SourcePayload::ModelImport(element) => (
            element.placement,
            element.bounding_box,
            element.element_type.clone(),
            element.property_sets.clone(),
        ),
        SourcePayload::RangeScan(detection) => (
            detection.centroid,
            Some(detection.extent),
            detection.class_label.clone(),
            HashMap::new(),
        ),
        SourcePayload::Ar(placement) => (
            placement.position,
            placement.dimensions,
            placement.equipment_type.clone(),
            placement.attributes.clone(),
        ),
        SourcePayload::Manual(entry) => (
            entry.position,
            entry.dimensions,
            entry.equipment_type.clone(),
            entry.attributes.clone(),
        ),
        SourcePayload::Generic(map) => {
            let observation = extract_generic(source, map);
            if observation.is_none() {
                debug!(source_id = %source.id, "Skipping generic payload without a readable position");
            }
            return observation;
        }
    };

    Some(observation(source, position, dimensions, equipment_type, attributes))
}

fn extract_generic(source: &DataSource, map: &Map<String, Value>) -> Option<EquipmentObservation> {
    let position = POSITION_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Point3::from_json))?;

    let dimensions = DIMENSION_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Dimensions::from_json));

    let equipment_type = TYPE_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let attributes = map
        .get(ATTRIBUTES_KEY)
        .and_then(Value::as_object)
        .map(|attrs| attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    Some(observation(source, position, dimensions, equipment_type, attributes))
}

fn observation(
    source: &DataSource,
    position: Point3,
    dimensions: Option<Dimensions>,
    equipment_type: String,
    attributes: HashMap<String, Value>,
) -> EquipmentObservation {
    EquipmentObservation {
        source: SourceRef::from(source),
        position,
        dimensions,
        equipment_type,
        attributes,
        confidence: source.confidence,
    }
}
