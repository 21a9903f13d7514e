//! Conflict resolver: evaluates the rule set against a conflict.
//!
//! Rules are scanned priority-descending and the first enabled rule whose
//! conflict type and condition match decides. If none matches, the
//! resolver-wide default method is applied the same way. Every decision is
//! appended to the audit history.
//!
//! The rule set and default method live in one immutable [`RuleSet`]
//! snapshot; edits swap the snapshot under the write lock and
//! `resolve_conflict` reads a single snapshot for its whole evaluation.

use arxos_types::{ConfidenceLevel, Conflict, ConflictId, ConflictType, ConflictValue};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::defaults::default_rules;
use crate::error::ResolutionError;
use crate::history::{ResolutionHistory, ResolutionRecord};
use crate::rule::{PreferSource, ResolutionMethod, ResolutionRule, RuleAction};

/// Action code for conflicts left to a person.
pub const ACTION_MANUAL_REVIEW: &str = "manual_review_required";
/// Action code for conflicts that need someone on site.
pub const ACTION_FIELD_VERIFICATION: &str = "field_verification_required";
/// Action code for automatic resolutions awaiting sign-off.
pub const ACTION_APPROVAL: &str = "approval_required";

/// Rule name recorded in statistics when no rule matched.
const DEFAULT_RULE_LABEL: &str = "default";

/// Configuration for the conflict resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Method used when no rule matches.
    pub default_method: ResolutionMethod,
    /// Maximum audit entries kept; `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Load the five built-in rules on construction.
    pub load_default_rules: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_method: ResolutionMethod::Automatic,
            history_limit: None,
            load_default_rules: true,
        }
    }
}

/// The outcome of resolving one conflict. Always produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub conflict_id: ConflictId,
    pub equipment_id: String,
    pub conflict_type: ConflictType,
    pub method: ResolutionMethod,
    /// `None` when the method defers to a person.
    pub resolved_value: Option<ConflictValue>,
    pub confidence: ConfidenceLevel,
    pub rule_applied: Option<ResolutionRule>,
    pub requires_action: bool,
    pub action: Option<String>,
    pub notify: bool,
    pub resolved_at: DateTime<Utc>,
}

/// Aggregate counts over the audit history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionStatistics {
    pub total_resolutions: usize,
    pub by_method: HashMap<ResolutionMethod, usize>,
    /// Keyed by rule name, with unmatched conflicts under `default`.
    pub by_rule: HashMap<String, usize>,
    pub requiring_action: usize,
    pub values_resolved: usize,
}

/// Immutable snapshot of the active rules, sorted priority-descending.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ResolutionRule>,
    default_method: ResolutionMethod,
}

impl RuleSet {
    fn new(mut rules: Vec<ResolutionRule>, default_method: ResolutionMethod) -> Self {
        sort_rules(&mut rules);
        Self {
            rules,
            default_method,
        }
    }

    pub fn rules(&self) -> &[ResolutionRule] {
        &self.rules
    }

    pub fn default_method(&self) -> ResolutionMethod {
        self.default_method
    }

    /// First enabled rule, by priority, that applies to the conflict.
    pub fn find_rule(&self, conflict: &Conflict) -> Option<&ResolutionRule> {
        self.rules.iter().find(|rule| rule.applies_to(conflict))
    }
}

// Stable, so equal priorities keep insertion order.
fn sort_rules(rules: &mut [ResolutionRule]) {
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// Resolves conflicts with a priority-ordered rule set and keeps an audit log.
pub struct ConflictResolver {
    rules: RwLock<Arc<RuleSet>>,
    history: Mutex<ResolutionHistory>,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl ConflictResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let rules = if config.load_default_rules {
            default_rules()
        } else {
            Vec::new()
        };
        Self {
            rules: RwLock::new(Arc::new(RuleSet::new(rules, config.default_method))),
            history: Mutex::new(ResolutionHistory::new(config.history_limit)),
        }
    }

    /// Returns the current rule-set snapshot.
    pub fn rule_set(&self) -> Arc<RuleSet> {
        Arc::clone(&self.rules.read())
    }

    /// Active rules, priority-descending.
    pub fn rules(&self) -> Vec<ResolutionRule> {
        self.rule_set().rules().to_vec()
    }

    pub fn default_method(&self) -> ResolutionMethod {
        self.rule_set().default_method()
    }

    /// Registers a rule. Fails if a rule with the same id exists.
    pub fn add_rule(&self, rule: ResolutionRule) -> Result<(), ResolutionError> {
        let mut guard = self.rules.write();
        if guard.rules.iter().any(|r| r.id == rule.id) {
            return Err(ResolutionError::DuplicateRule(rule.id));
        }
        let mut rules = guard.rules.clone();
        rules.push(rule);
        *guard = Arc::new(RuleSet::new(rules, guard.default_method));
        Ok(())
    }

    /// Removes a rule by id. Returns true if it existed.
    pub fn remove_rule(&self, id: &str) -> bool {
        self.edit_rules(|rules| {
            let before = rules.len();
            rules.retain(|r| r.id != id);
            rules.len() != before
        })
    }

    /// Enables or disables a rule by id. Returns true if it existed.
    pub fn set_rule_enabled(&self, id: &str, enabled: bool) -> bool {
        self.edit_rules(|rules| match rules.iter_mut().find(|r| r.id == id) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        })
    }

    pub fn set_default_method(&self, method: ResolutionMethod) {
        let mut guard = self.rules.write();
        *guard = Arc::new(RuleSet {
            rules: guard.rules.clone(),
            default_method: method,
        });
    }

    fn edit_rules(&self, edit: impl FnOnce(&mut Vec<ResolutionRule>) -> bool) -> bool {
        let mut guard = self.rules.write();
        let mut rules = guard.rules.clone();
        let changed = edit(&mut rules);
        if changed {
            *guard = Arc::new(RuleSet::new(rules, guard.default_method));
        }
        changed
    }

    /// Resolves a conflict. Never fails: with no matching rule the default
    /// method decides.
    pub fn resolve_conflict(&self, conflict: &Conflict) -> ResolutionResult {
        let rule_set = self.rule_set();

        let result = match rule_set.find_rule(conflict) {
            Some(rule) => {
                debug!(
                    conflict_id = %conflict.id,
                    equipment_id = %conflict.equipment_id,
                    rule = %rule.id,
                    "Resolution rule matched"
                );
                apply_action(conflict, &rule.action, Some(rule))
            }
            None => {
                debug!(
                    conflict_id = %conflict.id,
                    equipment_id = %conflict.equipment_id,
                    method = %rule_set.default_method,
                    "No resolution rule matched, applying default"
                );
                let action = match rule_set.default_method {
                    ResolutionMethod::Automatic => {
                        RuleAction::prefer(PreferSource::HighestConfidence)
                    }
                    method => RuleAction::method(method),
                };
                apply_action(conflict, &action, None)
            }
        };

        self.history.lock().push(ResolutionRecord {
            conflict: conflict.clone(),
            result: result.clone(),
        });
        result
    }

    /// Snapshot of the audit history, oldest first.
    pub fn history(&self) -> Vec<ResolutionRecord> {
        self.history.lock().iter().cloned().collect()
    }

    /// Audit entries for one equipment id, oldest first.
    pub fn history_for_equipment(&self, equipment_id: &str) -> Vec<ResolutionRecord> {
        self.history
            .lock()
            .iter()
            .filter(|record| record.conflict.equipment_id == equipment_id)
            .cloned()
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    pub fn statistics(&self) -> ResolutionStatistics {
        let history = self.history.lock();
        let mut stats = ResolutionStatistics::default();

        for record in history.iter() {
            let result = &record.result;
            stats.total_resolutions += 1;
            *stats.by_method.entry(result.method).or_default() += 1;
            let rule = result
                .rule_applied
                .as_ref()
                .map_or(DEFAULT_RULE_LABEL, |r| r.name.as_str());
            *stats.by_rule.entry(rule.to_string()).or_default() += 1;
            if result.requires_action {
                stats.requiring_action += 1;
            }
            if result.resolved_value.is_some() {
                stats.values_resolved += 1;
            }
        }
        stats
    }
}

fn apply_action(
    conflict: &Conflict,
    action: &RuleAction,
    rule: Option<&ResolutionRule>,
) -> ResolutionResult {
    let (resolved_value, confidence, requires_action, code) = match action.method {
        ResolutionMethod::Automatic => {
            let (value, confidence) = automatic_value(conflict, action);
            let code = action.require_approval.then(|| ACTION_APPROVAL.to_string());
            (Some(value), confidence, action.require_approval, code)
        }
        ResolutionMethod::Manual => (
            None,
            lower_confidence(conflict),
            true,
            Some(ACTION_MANUAL_REVIEW.to_string()),
        ),
        ResolutionMethod::FieldVerify => (
            None,
            lower_confidence(conflict),
            true,
            Some(ACTION_FIELD_VERIFICATION.to_string()),
        ),
        ResolutionMethod::Ignore => {
            let (value, confidence) = highest_confidence_side(conflict);
            (Some(value), confidence, false, None)
        }
    };

    ResolutionResult {
        conflict_id: conflict.id,
        equipment_id: conflict.equipment_id.clone(),
        conflict_type: conflict.conflict_type,
        method: action.method,
        resolved_value,
        confidence,
        rule_applied: rule.cloned(),
        requires_action,
        action: code,
        notify: action.notify,
        resolved_at: Utc::now(),
    }
}

fn automatic_value(conflict: &Conflict, action: &RuleAction) -> (ConflictValue, ConfidenceLevel) {
    if action.use_average {
        if let Some(mean) = conflict.value1.mean(&conflict.value2) {
            let confidence = conflict.source1.confidence.max(conflict.source2.confidence);
            return (mean, confidence);
        }
    }

    match action.prefer_source {
        Some(PreferSource::MostRecent) => {
            if conflict.source2.timestamp > conflict.source1.timestamp {
                second_side(conflict)
            } else {
                first_side(conflict)
            }
        }
        Some(PreferSource::SourceType(source_type)) => {
            if conflict.source1.source_type == source_type {
                first_side(conflict)
            } else if conflict.source2.source_type == source_type {
                second_side(conflict)
            } else {
                first_side(conflict)
            }
        }
        Some(PreferSource::HighestConfidence) | None => highest_confidence_side(conflict),
    }
}

// Ties go to the first side.
fn highest_confidence_side(conflict: &Conflict) -> (ConflictValue, ConfidenceLevel) {
    if conflict.source2.confidence > conflict.source1.confidence {
        second_side(conflict)
    } else {
        first_side(conflict)
    }
}

fn first_side(conflict: &Conflict) -> (ConflictValue, ConfidenceLevel) {
    (conflict.value1.clone(), conflict.source1.confidence)
}

fn second_side(conflict: &Conflict) -> (ConflictValue, ConfidenceLevel) {
    (conflict.value2.clone(), conflict.source2.confidence)
}

fn lower_confidence(conflict: &Conflict) -> ConfidenceLevel {
    conflict.source1.confidence.min(conflict.source2.confidence)
}
