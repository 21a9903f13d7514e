use arxos_types::{ConfidenceLevel, ConflictType, SourceType};

use crate::rule::{PreferSource, ResolutionMethod, ResolutionRule, RuleAction, RuleCondition};

/// Hours in a week; type labels older than this yield to newer ones.
const STALE_TYPE_HOURS: f64 = 168.0;

/// The five rules every resolver starts with, highest priority first.
pub fn default_rules() -> Vec<ResolutionRule> {
    vec![
        ResolutionRule::new(
            "high-confidence-position",
            "Small position difference with a high-confidence source",
            ConflictType::Position,
            RuleCondition {
                max_difference: Some(0.3),
                min_confidence: Some(ConfidenceLevel::High),
                ..Default::default()
            },
            RuleAction::prefer(PreferSource::HighestConfidence),
            10,
        ),
        ResolutionRule::new(
            "range-scan-dimensions",
            "Prefer range-scan measurements for dimensions",
            ConflictType::Dimension,
            RuleCondition {
                source_types: vec![SourceType::RangeScan],
                ..Default::default()
            },
            RuleAction::prefer(PreferSource::SourceType(SourceType::RangeScan)).with_notify(),
            9,
        ),
        ResolutionRule::new(
            "large-position-difference",
            "Large position difference needs field verification",
            ConflictType::Position,
            RuleCondition {
                min_difference: Some(3.0),
                ..Default::default()
            },
            RuleAction::method(ResolutionMethod::FieldVerify).with_approval(),
            8,
        ),
        ResolutionRule::new(
            "stale-type",
            "Prefer the newer type label when sources are a week apart",
            ConflictType::Type,
            RuleCondition {
                min_time_diff_hours: Some(STALE_TYPE_HOURS),
                ..Default::default()
            },
            RuleAction::prefer(PreferSource::MostRecent).with_notify(),
            7,
        ),
        ResolutionRule::new(
            "small-dimension-difference",
            "Average small dimension differences",
            ConflictType::Dimension,
            RuleCondition {
                max_difference: Some(0.1),
                ..Default::default()
            },
            RuleAction::average(),
            6,
        ),
    ]
}
