//! Resolution rules: a condition gate plus the action to take when it holds.

use arxos_types::{ConfidenceLevel, Conflict, ConflictType, SourceType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a conflict is turned into a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Pick or compute a value without human involvement.
    #[default]
    Automatic,
    /// Leave the conflict for a person to decide.
    Manual,
    /// Send someone to look at the equipment.
    FieldVerify,
    /// Take the higher-confidence side and move on.
    Ignore,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
            Self::FieldVerify => "field_verify",
            Self::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

/// Which side of a conflict an automatic action prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferSource {
    HighestConfidence,
    MostRecent,
    /// The side captured by this source type; the first side if neither is.
    SourceType(SourceType),
}

/// Gate evaluated against a conflict. Every populated field must hold.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleCondition {
    /// Inclusive lower bound on the conflict's difference.
    pub min_difference: Option<f64>,
    /// Inclusive upper bound on the conflict's difference.
    pub max_difference: Option<f64>,
    /// Either source must have one of these types. Empty means any.
    pub source_types: Vec<SourceType>,
    /// Either source must be at least this confident.
    pub min_confidence: Option<ConfidenceLevel>,
    /// The two sources must be at least this many hours apart.
    pub min_time_diff_hours: Option<f64>,
}

impl RuleCondition {
    /// Returns true if the conflict satisfies every populated bound.
    pub fn matches(&self, conflict: &Conflict) -> bool {
        if self.min_difference.is_some_and(|min| conflict.difference < min) {
            return false;
        }
        if self.max_difference.is_some_and(|max| conflict.difference > max) {
            return false;
        }

        if !self.source_types.is_empty()
            && !self.source_types.contains(&conflict.source1.source_type)
            && !self.source_types.contains(&conflict.source2.source_type)
        {
            return false;
        }

        if let Some(min) = self.min_confidence {
            if conflict.source1.confidence < min && conflict.source2.confidence < min {
                return false;
            }
        }

        if let Some(hours) = self.min_time_diff_hours {
            let elapsed = conflict.time_between_sources().num_milliseconds() as f64 / 3_600_000.0;
            if elapsed < hours {
                return false;
            }
        }

        true
    }
}

/// What to do once a rule matches.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleAction {
    pub method: ResolutionMethod,
    pub prefer_source: Option<PreferSource>,
    /// Average the two values (position and dimension conflicts only).
    pub use_average: bool,
    pub notify: bool,
    pub require_approval: bool,
}

impl RuleAction {
    /// Automatic action preferring one side.
    #[must_use]
    pub fn prefer(prefer: PreferSource) -> Self {
        Self {
            method: ResolutionMethod::Automatic,
            prefer_source: Some(prefer),
            ..Default::default()
        }
    }

    /// Automatic action averaging both sides.
    #[must_use]
    pub fn average() -> Self {
        Self {
            method: ResolutionMethod::Automatic,
            use_average: true,
            ..Default::default()
        }
    }

    /// Action with no automatic value.
    #[must_use]
    pub fn method(method: ResolutionMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_notify(mut self) -> Self {
        self.notify = true;
        self
    }

    #[must_use]
    pub fn with_approval(mut self) -> Self {
        self.require_approval = true;
        self
    }
}

/// A priority-ordered, condition-gated policy for one conflict type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRule {
    pub id: String,
    pub name: String,
    pub conflict_type: ConflictType,
    #[serde(default)]
    pub condition: RuleCondition,
    pub action: RuleAction,
    /// Higher runs first.
    pub priority: i32,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl ResolutionRule {
    /// Creates an enabled rule.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        conflict_type: ConflictType,
        condition: RuleCondition,
        action: RuleAction,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            conflict_type,
            condition,
            action,
            priority,
            enabled: true,
        }
    }

    /// Returns true if the rule is enabled and applies to this conflict.
    pub fn applies_to(&self, conflict: &Conflict) -> bool {
        self.enabled
            && self.conflict_type == conflict.conflict_type
            && self.condition.matches(conflict)
    }
}
