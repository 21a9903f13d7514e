use arxos_merge::extract_observation;
use arxos_types::{
    ArPlacement, ConfidenceLevel, DataSource, Dimensions, DocumentRecord, ModelElement, Point3,
    ScanDetection, SourcePayload, SourceType,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;

fn generic(source_type: SourceType, value: serde_json::Value) -> DataSource {
    DataSource::new(
        "g-1",
        source_type,
        ConfidenceLevel::Medium,
        SourcePayload::Generic(value.as_object().unwrap().clone()),
    )
}

// ── Typed records ────────────────────────────────────────────────

#[test]
fn document_record() {
    let source = DataSource::new(
        "pdf-1",
        SourceType::Document,
        ConfidenceLevel::Low,
        SourcePayload::Document(DocumentRecord {
            equipment_id: Some("vav-3".into()),
            equipment_type: "vav".into(),
            location: Point3::new(4.0, 5.0, 2.7),
            dimensions: None,
            page: Some(2),
            properties: HashMap::from([("cfm".to_string(), json!(450))]),
        }),
    );

    let obs = extract_observation(&source).unwrap();
    assert_eq!(obs.position, Point3::new(4.0, 5.0, 2.7));
    assert_eq!(obs.dimensions, None);
    assert_eq!(obs.equipment_type, "vav");
    assert_eq!(obs.attributes["cfm"], json!(450));
    assert_eq!(obs.confidence, ConfidenceLevel::Low);
    assert_eq!(obs.source.id, "pdf-1");
}

#[test]
fn model_element() {
    let source = DataSource::new(
        "ifc-1",
        SourceType::ModelImport,
        ConfidenceLevel::High,
        SourcePayload::ModelImport(ModelElement {
            global_id: "3vB2YO$MX4xv5uCqZZG05x".into(),
            element_type: "chiller".into(),
            placement: Point3::new(1.0, 2.0, 0.0),
            bounding_box: Some(Dimensions::new(4.0, 2.0, 2.5)),
            property_sets: HashMap::new(),
        }),
    );

    let obs = extract_observation(&source).unwrap();
    assert_eq!(obs.equipment_type, "chiller");
    assert_eq!(obs.dimensions, Some(Dimensions::new(4.0, 2.0, 2.5)));
}

#[test]
fn scan_detection_uses_class_label_and_extent() {
    let source = DataSource::new(
        "scan-1",
        SourceType::RangeScan,
        ConfidenceLevel::High,
        SourcePayload::RangeScan(ScanDetection {
            equipment_id: None,
            class_label: "pump".into(),
            centroid: Point3::new(7.0, 8.0, 0.5),
            extent: Dimensions::new(0.8, 0.6, 0.9),
            score: 0.88,
            point_count: 5400,
        }),
    );

    let obs = extract_observation(&source).unwrap();
    assert_eq!(obs.equipment_type, "pump");
    assert_eq!(obs.position, Point3::new(7.0, 8.0, 0.5));
    assert_eq!(obs.dimensions, Some(Dimensions::new(0.8, 0.6, 0.9)));
    assert!(obs.attributes.is_empty());
}

#[test]
fn mismatched_record_is_skipped() {
    let source = DataSource::new(
        "ar-1",
        SourceType::RangeScan,
        ConfidenceLevel::High,
        SourcePayload::Ar(ArPlacement {
            anchor_id: "anchor-1".into(),
            equipment_id: None,
            equipment_type: "pump".into(),
            position: Point3::default(),
            dimensions: None,
            attributes: HashMap::new(),
        }),
    );
    assert!(extract_observation(&source).is_none());
}

// ── Generic key lookup ───────────────────────────────────────────

#[test]
fn generic_map_with_primary_keys() {
    let source = generic(
        SourceType::Ar,
        json!({
            "position": {"x": 1.0, "y": 2.0, "z": 3.0},
            "dimensions": {"length": 1.0, "width": 0.5, "height": 2.0},
            "type": "panel",
            "attributes": {"voltage": 480}
        }),
    );

    let obs = extract_observation(&source).unwrap();
    assert_eq!(obs.position, Point3::new(1.0, 2.0, 3.0));
    assert_eq!(obs.dimensions, Some(Dimensions::new(1.0, 0.5, 2.0)));
    assert_eq!(obs.equipment_type, "panel");
    assert_eq!(obs.attributes["voltage"], json!(480));
}

#[test]
fn generic_map_with_alternate_keys() {
    let source = generic(
        SourceType::Document,
        json!({"location": [1, 2, 3], "size": [2, 2, 2], "equipment_type": "boiler"}),
    );

    let obs = extract_observation(&source).unwrap();
    assert_eq!(obs.position, Point3::new(1.0, 2.0, 3.0));
    assert_eq!(obs.dimensions, Some(Dimensions::new(2.0, 2.0, 2.0)));
    assert_eq!(obs.equipment_type, "boiler");
}

#[test]
fn generic_map_defaults_missing_fields() {
    let obs = extract_observation(&generic(SourceType::Manual, json!({"position": [0, 0, 0]})))
        .unwrap();
    assert_eq!(obs.dimensions, None);
    assert_eq!(obs.equipment_type, "");
    assert!(obs.attributes.is_empty());
}

#[test]
fn generic_map_without_position_is_skipped() {
    let source = generic(SourceType::Manual, json!({"type": "boiler"}));
    assert!(extract_observation(&source).is_none());
}
