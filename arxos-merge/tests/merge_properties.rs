//! Property-based tests for the strategy merger.
//!
//! - A single source is reproduced verbatim by every strategy.
//! - Two equal-confidence sources average to their midpoint.

use arxos_merge::{MergerConfig, StrategyMerger};
use arxos_types::{
    ConfidenceLevel, DataSource, Dimensions, ManualEntry, MergeStrategy, Point3, SourcePayload,
    SourceType,
};
use proptest::prelude::*;
use std::collections::HashMap;

fn coordinate() -> impl Strategy<Value = f64> {
    -500.0f64..500.0
}

fn point_strategy() -> impl Strategy<Value = Point3> {
    (coordinate(), coordinate(), coordinate()).prop_map(|(x, y, z)| Point3::new(x, y, z))
}

fn dimensions_strategy() -> impl Strategy<Value = Dimensions> {
    (0.0f64..20.0, 0.0f64..20.0, 0.0f64..20.0)
        .prop_map(|(l, w, h)| Dimensions::new(l, w, h))
}

fn confidence_strategy() -> impl Strategy<Value = ConfidenceLevel> {
    prop::sample::select(ConfidenceLevel::ALL.to_vec())
}

fn strategy_strategy() -> impl Strategy<Value = MergeStrategy> {
    prop::sample::select(vec![
        MergeStrategy::HighestConfidence,
        MergeStrategy::MostRecent,
        MergeStrategy::WeightedAverage,
        MergeStrategy::Consensus,
    ])
}

fn source(
    id: &str,
    position: Point3,
    dimensions: Dimensions,
    equipment_type: &str,
    confidence: ConfidenceLevel,
) -> DataSource {
    DataSource::new(
        id,
        SourceType::Manual,
        confidence,
        SourcePayload::Manual(ManualEntry {
            equipment_id: "eq".into(),
            equipment_type: equipment_type.into(),
            position,
            dimensions: Some(dimensions),
            notes: None,
            attributes: HashMap::new(),
        }),
    )
}

proptest! {
    #[test]
    fn single_source_is_reproduced(
        position in point_strategy(),
        dimensions in dimensions_strategy(),
        equipment_type in "[a-z_]{1,12}",
        confidence in confidence_strategy(),
        strategy in strategy_strategy(),
    ) {
        let merger = StrategyMerger::new(MergerConfig { strategy, ..Default::default() });
        let merged = merger
            .merge_equipment_data("eq", &[source("s", position, dimensions, &equipment_type, confidence)])
            .unwrap();

        prop_assert_eq!(merged.position, position);
        prop_assert_eq!(merged.dimensions, dimensions);
        prop_assert_eq!(merged.equipment_type, equipment_type);
        prop_assert!(merged.conflicts.is_empty());
    }

    #[test]
    fn equal_confidence_weighted_average_is_midpoint(
        p1 in point_strategy(),
        p2 in point_strategy(),
        confidence in confidence_strategy(),
    ) {
        let merger = StrategyMerger::new(MergerConfig {
            strategy: MergeStrategy::WeightedAverage,
            ..Default::default()
        });
        let dims = Dimensions::new(1.0, 1.0, 1.0);
        let merged = merger
            .merge_equipment_data("eq", &[
                source("a", p1, dims, "pump", confidence),
                source("b", p2, dims, "pump", confidence),
            ])
            .unwrap();

        let mid = p1.midpoint(&p2);
        prop_assert!((merged.position.x - mid.x).abs() < 1e-9);
        prop_assert!((merged.position.y - mid.y).abs() < 1e-9);
        prop_assert!((merged.position.z - mid.z).abs() < 1e-9);
        prop_assert_eq!(merged.confidence, confidence);
    }
}
