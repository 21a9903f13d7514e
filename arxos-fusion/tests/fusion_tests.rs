use arxos_fusion::{
    confidence_score, CancellationToken, CoverageTracker, DataFusion, EquipmentHint,
    ExistingModel, FusionConfig, FusionError, InMemoryModel, RangeScanPass,
};
use arxos_merge::MergerConfig;
use arxos_resolution::{ResolutionMethod, ACTION_FIELD_VERIFICATION};
use arxos_types::{
    ChangeType, ConfidenceLevel, DataSource, Dimensions, ManualEntry, MergeStrategy,
    MergedEquipment, Point3, ScanDetection, SourcePayload, SourceRef, SourceType,
};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

// ── Test doubles ────────────────────────────────────────────────

struct FixedCoverage {
    coverage: f64,
    region: Option<ConfidenceLevel>,
}

impl CoverageTracker for FixedCoverage {
    fn coverage_percentage(&self) -> f64 {
        self.coverage
    }

    fn region_confidence(&self, _point: &Point3) -> Option<ConfidenceLevel> {
        self.region
    }
}

// ── Helpers ─────────────────────────────────────────────────────

fn manual(
    id: &str,
    equipment_id: &str,
    position: Point3,
    confidence: ConfidenceLevel,
) -> DataSource {
    DataSource::new(
        id,
        SourceType::Manual,
        confidence,
        SourcePayload::Manual(ManualEntry {
            equipment_id: equipment_id.into(),
            equipment_type: "ahu".into(),
            position,
            dimensions: Some(Dimensions::new(2.0, 1.0, 1.5)),
            notes: None,
            attributes: HashMap::new(),
        }),
    )
    .with_timestamp(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap())
}

fn scan(
    id: &str,
    equipment_id: &str,
    position: Point3,
    confidence: ConfidenceLevel,
) -> DataSource {
    DataSource::new(
        id,
        SourceType::RangeScan,
        confidence,
        SourcePayload::RangeScan(ScanDetection {
            equipment_id: None,
            class_label: "ahu".into(),
            centroid: position,
            extent: Dimensions::new(2.0, 1.0, 1.5),
            score: 0.95,
            point_count: 800,
        }),
    )
    .with_timestamp(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap())
    .with_equipment_id(equipment_id)
}

fn detection(label: &str, centroid: Point3, score: f64) -> ScanDetection {
    ScanDetection {
        equipment_id: None,
        class_label: label.into(),
        centroid,
        extent: Dimensions::new(1.0, 1.0, 1.0),
        score,
        point_count: 400,
    }
}

fn record(id: &str, equipment_type: &str, confidence: ConfidenceLevel) -> MergedEquipment {
    MergedEquipment::new(
        id,
        equipment_type,
        Point3::default(),
        Dimensions::default(),
        confidence,
    )
}

fn fusion_with(strategy: MergeStrategy) -> DataFusion {
    DataFusion::new(FusionConfig {
        merger: MergerConfig {
            strategy,
            ..Default::default()
        },
        ..Default::default()
    })
}

// ── Grouping ────────────────────────────────────────────────────

#[test]
fn sources_are_grouped_by_equipment_id() {
    let fusion = DataFusion::default();
    let unattributed = DataSource::new(
        "orphan",
        SourceType::Document,
        ConfidenceLevel::Low,
        SourcePayload::Generic(
            json!({"position": [1.0, 1.0, 1.0]})
                .as_object()
                .unwrap()
                .clone(),
        ),
    );
    let sources = vec![
        manual("m1", "ahu-1", Point3::new(10.0, 20.0, 3.0), ConfidenceLevel::Medium),
        scan("s1", "ahu-1", Point3::new(10.1, 20.0, 3.0), ConfidenceLevel::High),
        manual("m2", "ahu-2", Point3::new(40.0, 20.0, 3.0), ConfidenceLevel::Low),
        unattributed,
    ];

    let result = fusion.fuse_building("hq", &sources, &InMemoryModel::new());

    let ids: Vec<&str> = result.equipment.iter().map(|e| e.equipment_id.as_str()).collect();
    assert_eq!(ids, vec!["ahu-1", "ahu-2"]);
    assert_eq!(result.get_equipment("ahu-1").unwrap().source_count(), 2);

    let stats = &result.statistics;
    assert_eq!(stats.total_sources, 4);
    assert_eq!(stats.unattributed_sources, 1);
    assert_eq!(stats.equipment_processed, 2);
    assert_eq!(stats.equipment_dropped, 0);
    assert_eq!(stats.source_breakdown.get(&SourceType::Manual), Some(&2));
    assert_eq!(stats.source_breakdown.get(&SourceType::Document), Some(&1));
}

#[test]
fn unreadable_group_is_dropped_and_counted() {
    let fusion = DataFusion::default();
    let unreadable = DataSource::new(
        "bad",
        SourceType::Document,
        ConfidenceLevel::Low,
        SourcePayload::Generic(
            json!({"equipment_id": "vav-9"})
                .as_object()
                .unwrap()
                .clone(),
        ),
    );
    let sources = vec![
        manual("m1", "ahu-1", Point3::new(10.0, 20.0, 3.0), ConfidenceLevel::Medium),
        unreadable,
    ];

    let result = fusion.fuse_building("hq", &sources, &InMemoryModel::new());
    assert_eq!(result.equipment.len(), 1);
    assert_eq!(result.statistics.equipment_dropped, 1);
    assert!(result.get_equipment("vav-9").is_none());
}

// ── Resolution ──────────────────────────────────────────────────

#[test]
fn resolved_value_overrides_strategy_output() {
    let fusion = fusion_with(MergeStrategy::WeightedAverage);
    let sources = vec![
        manual("m1", "ahu-1", Point3::new(10.0, 20.0, 3.0), ConfidenceLevel::Medium),
        scan("s1", "ahu-1", Point3::new(10.6, 20.0, 3.0), ConfidenceLevel::High),
    ];

    let result = fusion.fuse_building("hq", &sources, &InMemoryModel::new());
    let merged = result.get_equipment("ahu-1").unwrap();

    // The weighted mean would sit between the two; the default resolution
    // prefers the high-confidence scan.
    assert_eq!(merged.position, Point3::new(10.6, 20.0, 3.0));
    assert_eq!(merged.confidence, ConfidenceLevel::High);
    assert!(merged.conflicts.is_empty());
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.statistics.conflicts_resolved, 1);
}

#[test]
fn one_resolution_per_field_prefers_the_primary_source() {
    let fusion = fusion_with(MergeStrategy::HighestConfidence);
    let sources = vec![
        scan("s1", "ahu-1", Point3::new(0.0, 0.0, 0.0), ConfidenceLevel::High),
        manual("m1", "ahu-1", Point3::new(0.6, 0.0, 0.0), ConfidenceLevel::Medium),
        manual("m2", "ahu-1", Point3::new(1.2, 0.0, 0.0), ConfidenceLevel::Low),
    ];

    let result = fusion.fuse_building("hq", &sources, &InMemoryModel::new());
    let merged = result.get_equipment("ahu-1").unwrap();

    // Three pairwise conflicts; the m1/m2 one must not override the scan.
    assert_eq!(result.conflicts.len(), 3);
    assert_eq!(result.resolutions.len(), 3);
    assert_eq!(merged.position, Point3::new(0.0, 0.0, 0.0));
    assert_eq!(merged.confidence, ConfidenceLevel::High);
}

#[test]
fn field_verification_conflict_stays_on_record() {
    let fusion = DataFusion::default();
    let sources = vec![
        scan("s1", "ahu-1", Point3::new(10.0, 20.0, 3.0), ConfidenceLevel::High),
        manual("m1", "ahu-1", Point3::new(15.0, 25.0, 3.0), ConfidenceLevel::High),
    ];

    let result = fusion.fuse_building("hq", &sources, &InMemoryModel::new());
    let merged = result.get_equipment("ahu-1").unwrap();

    assert_eq!(result.resolutions.len(), 1);
    let resolution = &result.resolutions[0];
    assert_eq!(resolution.method, ResolutionMethod::FieldVerify);
    assert!(resolution.requires_action);
    assert_eq!(resolution.action.as_deref(), Some(ACTION_FIELD_VERIFICATION));

    assert_eq!(merged.position, Point3::new(10.0, 20.0, 3.0));
    assert_eq!(merged.conflicts.len(), 1);
    assert_eq!(result.pending_actions().count(), 1);
    assert_eq!(result.statistics.conflicts_resolved, 0);
    assert_eq!(fusion.resolver().history_len(), 1);
}

// ── Changes ─────────────────────────────────────────────────────

#[test]
fn changes_are_detected_against_existing_model() {
    let fusion = DataFusion::default();
    let existing = InMemoryModel::new();
    existing.insert(MergedEquipment::new(
        "ahu-1",
        "ahu",
        Point3::new(10.0, 20.0, 3.0),
        Dimensions::new(2.0, 1.0, 1.5),
        ConfidenceLevel::Medium,
    ));

    let sources = vec![manual(
        "m1",
        "ahu-1",
        Point3::new(12.0, 20.0, 3.0),
        ConfidenceLevel::Medium,
    )];
    let result = fusion.fuse_building("hq", &sources, &existing);

    assert_eq!(result.changes.len(), 1);
    assert_eq!(result.changes[0].change_type, ChangeType::Position);
    assert_eq!(result.statistics.changes_detected, 1);
    assert_eq!(fusion.change_detector().history_len(), 1);
}

#[test]
fn refusing_the_same_sources_yields_no_changes() {
    let fusion = DataFusion::default();
    let sources = vec![
        manual("m1", "ahu-1", Point3::new(10.0, 20.0, 3.0), ConfidenceLevel::Medium),
        scan("s1", "ahu-1", Point3::new(10.1, 20.0, 3.0), ConfidenceLevel::High),
    ];

    let first = fusion.fuse_building("hq", &sources, &InMemoryModel::new());
    let model = InMemoryModel::from_result(&first);
    let second = fusion.fuse_building("hq", &sources, &model);

    assert!(second.changes.is_empty());
    assert_eq!(second.equipment.len(), 1);
}

#[test]
fn refusing_conflicting_sources_yields_no_changes() {
    let fusion = fusion_with(MergeStrategy::WeightedAverage);
    let sources = vec![
        manual("m1", "ahu-1", Point3::new(10.0, 20.0, 3.0), ConfidenceLevel::Medium),
        scan("s1", "ahu-1", Point3::new(10.6, 20.0, 3.0), ConfidenceLevel::High),
    ];

    let first = fusion.fuse_building("hq", &sources, &InMemoryModel::new());
    assert_eq!(first.resolutions.len(), 1);
    let model = InMemoryModel::from_result(&first);
    let second = fusion.fuse_building("hq", &sources, &model);

    assert_eq!(second.get_equipment("ahu-1").unwrap().position, Point3::new(10.6, 20.0, 3.0));
    assert!(second.changes.is_empty());
    assert_eq!(fusion.change_detector().history_len(), 0);
}

#[test]
fn changes_report_the_resolved_value() {
    let fusion = fusion_with(MergeStrategy::WeightedAverage);
    let existing = InMemoryModel::new();
    existing.insert(MergedEquipment::new(
        "ahu-1",
        "ahu",
        Point3::new(8.0, 20.0, 3.0),
        Dimensions::new(2.0, 1.0, 1.5),
        ConfidenceLevel::Medium,
    ));
    let sources = vec![
        manual("m1", "ahu-1", Point3::new(10.0, 20.0, 3.0), ConfidenceLevel::Medium),
        scan("s1", "ahu-1", Point3::new(10.6, 20.0, 3.0), ConfidenceLevel::High),
    ];

    let result = fusion.fuse_building("hq", &sources, &existing);

    assert_eq!(result.changes.len(), 1);
    assert_eq!(
        result.changes[0].new_value,
        Some(json!({"x": 10.6, "y": 20.0, "z": 3.0}))
    );
}

// ── Scores ──────────────────────────────────────────────────────

#[test]
fn confidence_score_boosts_corroborated_records() {
    let source = SourceRef {
        id: "s".into(),
        source_type: SourceType::Manual,
        confidence: ConfidenceLevel::High,
        timestamp: Utc::now(),
    };
    let mut high = record("a", "ahu", ConfidenceLevel::High);
    high.sources = vec![source.clone(); 5];
    let mut medium = record("b", "ahu", ConfidenceLevel::Medium);
    medium.sources = vec![source];

    // High saturates at 1.0; Medium with one source is 2/3 * 1.1.
    let expected = (1.0 + (2.0 / 3.0) * 1.1) / 2.0;
    assert!((confidence_score(&[high, medium]) - expected).abs() < 1e-9);
    assert_eq!(confidence_score(&[]), 0.0);
}

#[test]
fn coverage_comes_from_tracker() {
    let fusion = DataFusion::default().with_coverage_tracker(Arc::new(FixedCoverage {
        coverage: 42.0,
        region: None,
    }));
    let sources = vec![manual(
        "m1",
        "ahu-1",
        Point3::new(10.0, 20.0, 3.0),
        ConfidenceLevel::High,
    )];
    let result = fusion.fuse_building("hq", &sources, &InMemoryModel::new());
    assert_eq!(result.coverage, 42.0);

    let without = DataFusion::default().fuse_building("hq", &sources, &InMemoryModel::new());
    assert_eq!(without.coverage, 0.0);
}

// ── Cancellation ────────────────────────────────────────────────

#[test]
fn cancelled_token_stops_before_first_group() {
    let fusion = DataFusion::default();
    let sources = vec![manual(
        "m1",
        "ahu-1",
        Point3::new(10.0, 20.0, 3.0),
        ConfidenceLevel::High,
    )];
    let token = CancellationToken::new();
    token.cancel();

    let err = fusion
        .fuse_building_with_cancel("hq", &sources, &InMemoryModel::new(), &token)
        .unwrap_err();
    assert!(matches!(err, FusionError::Cancelled { processed: 0 }));
}

#[test]
fn live_token_runs_to_completion() {
    let fusion = DataFusion::default();
    let sources = vec![manual(
        "m1",
        "ahu-1",
        Point3::new(10.0, 20.0, 3.0),
        ConfidenceLevel::High,
    )];
    let result = fusion
        .fuse_building_with_cancel(
            "hq",
            &sources,
            &InMemoryModel::new(),
            &CancellationToken::new(),
        )
        .unwrap();
    assert_eq!(result.equipment.len(), 1);
}

#[test]
fn plain_and_uncancelled_runs_agree() {
    let fusion = DataFusion::default();
    let sources = vec![
        manual("m1", "ahu-1", Point3::new(10.0, 20.0, 3.0), ConfidenceLevel::Medium),
        scan("s1", "ahu-1", Point3::new(10.6, 20.0, 3.0), ConfidenceLevel::High),
        manual("m2", "ahu-2", Point3::new(40.0, 20.0, 3.0), ConfidenceLevel::Low),
    ];

    let plain = fusion.fuse_building("hq", &sources, &InMemoryModel::new());
    let tokened = fusion
        .fuse_building_with_cancel(
            "hq",
            &sources,
            &InMemoryModel::new(),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(plain.equipment.len(), tokened.equipment.len());
    for (a, b) in plain.equipment.iter().zip(&tokened.equipment) {
        assert_eq!(a.equipment_id, b.equipment_id);
        assert_eq!(a.position, b.position);
        assert_eq!(a.confidence, b.confidence);
    }
    assert_eq!(plain.conflicts.len(), tokened.conflicts.len());
    assert_eq!(plain.statistics.equipment_processed, tokened.statistics.equipment_processed);
}

// ── Partial scan ────────────────────────────────────────────────

fn scan_fixture() -> (RangeScanPass, Vec<EquipmentHint>, InMemoryModel) {
    let pass = RangeScanPass {
        scan_id: "pass-7".into(),
        timestamp: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        detections: vec![
            detection("ahu", Point3::new(10.3, 20.0, 3.0), 0.95),
            detection("pump", Point3::new(50.0, 50.0, 1.0), 0.75),
        ],
    };
    let hints = vec![
        EquipmentHint {
            equipment_id: "ahu-1".into(),
            equipment_type: "ahu".into(),
            position: Point3::new(10.0, 20.0, 3.0),
            search_radius: None,
        },
        // Close to the pump detection but the wrong type.
        EquipmentHint {
            equipment_id: "vav-3".into(),
            equipment_type: "vav".into(),
            position: Point3::new(50.2, 50.0, 1.0),
            search_radius: Some(2.0),
        },
    ];
    let existing = InMemoryModel::new();
    existing.insert(MergedEquipment::new(
        "ahu-1",
        "ahu",
        Point3::new(10.0, 20.0, 3.0),
        Dimensions::new(1.0, 1.0, 1.0),
        ConfidenceLevel::Medium,
    ));
    existing.insert(MergedEquipment::new(
        "vav-2",
        "vav",
        Point3::new(30.0, 30.0, 3.0),
        Dimensions::new(0.5, 0.5, 0.5),
        ConfidenceLevel::Medium,
    ));
    (pass, hints, existing)
}

#[test]
fn partial_scan_matches_hints_and_flags_new_equipment() {
    let fusion = DataFusion::default();
    let (pass, hints, existing) = scan_fixture();

    let result = fusion.fuse_partial_scan("hq", &pass, &hints, &existing);

    let matched = result.fusion.get_equipment("ahu-1").unwrap();
    assert_eq!(matched.position, Point3::new(10.3, 20.0, 3.0));
    assert_eq!(matched.confidence, ConfidenceLevel::High);

    assert_eq!(result.new_equipment.len(), 1);
    let candidate = &result.new_equipment[0];
    assert_eq!(candidate.candidate_id, "scan-pass-7-1");
    assert_eq!(candidate.equipment_type, "pump");
    assert_eq!(candidate.confidence, ConfidenceLevel::Medium);

    assert!(result
        .fusion
        .changes
        .iter()
        .any(|c| c.change_type == ChangeType::Added && c.equipment_id == "scan-pass-7-1"));
}

#[test]
fn partial_scan_abstains_without_region_confidence() {
    let fusion = DataFusion::default().with_coverage_tracker(Arc::new(FixedCoverage {
        coverage: 30.0,
        region: None,
    }));
    let (pass, hints, existing) = scan_fixture();

    let result = fusion.fuse_partial_scan("hq", &pass, &hints, &existing);
    assert!(result.removed_equipment.is_empty());
}

#[test]
fn partial_scan_flags_removed_equipment_in_scanned_area() {
    let fusion = DataFusion::default().with_coverage_tracker(Arc::new(FixedCoverage {
        coverage: 30.0,
        region: Some(ConfidenceLevel::Low),
    }));
    let (pass, hints, existing) = scan_fixture();

    let result = fusion.fuse_partial_scan("hq", &pass, &hints, &existing);

    assert_eq!(result.removed_equipment.len(), 1);
    let removed = &result.removed_equipment[0];
    assert_eq!(removed.equipment_id, "vav-2");
    assert_eq!(removed.region_confidence, ConfidenceLevel::Low);
    assert!(result
        .fusion
        .changes
        .iter()
        .any(|c| c.change_type == ChangeType::Removed && c.equipment_id == "vav-2"));
    assert_eq!(result.fusion.statistics.changes_detected, result.fusion.changes.len());
}

// ── Model and config ────────────────────────────────────────────

#[test]
fn in_memory_model_serves_records_and_floor_plans() {
    let model = InMemoryModel::new();
    model.insert(record("b", "vav", ConfidenceLevel::Low));
    model.insert(record("a", "ahu", ConfidenceLevel::Low));
    model.set_floor_plan(2, json!({"name": "Level 2"}));

    let ids: Vec<String> = model.get_all_equipment().into_iter().map(|e| e.equipment_id).collect();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(model.get_floor_plan(2), Some(json!({"name": "Level 2"})));
    assert_eq!(model.get_floor_plan(3), None);
    assert!(model.remove("a").is_some());
    assert_eq!(model.len(), 1);
}

#[test]
fn fusion_config_deserializes_partially() {
    let config: FusionConfig = serde_json::from_str(
        r#"{"merger": {"strategy": "consensus"}, "scan": {"match_radius": 2.5}}"#,
    )
    .unwrap();
    assert_eq!(config.merger.strategy, MergeStrategy::Consensus);
    assert_eq!(config.merger.position_threshold, 0.5);
    assert_eq!(config.scan.match_radius, 2.5);
    assert_eq!(config.scan.unmatched_id_prefix, "scan");
    assert!(config.changes.enabled);
}
