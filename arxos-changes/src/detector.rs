//! The change detector: diffing, lifecycle events and the queryable history.

use arxos_types::{Change, ChangeId, ChangeType, ConfidenceLevel, MergedEquipment};
use chrono::{Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::diff::{diff_equipment, DiffThresholds};
use crate::error::{ChangeError, ChangeResult};
use crate::history::{ChangeHistory, DEFAULT_HISTORY_CAPACITY};

/// Field name for lifecycle events.
pub const FIELD_EQUIPMENT: &str = "equipment";

/// Default displacement that counts as a move, in metres.
pub const DEFAULT_POSITION_THRESHOLD: f64 = 0.1;
/// Default per-axis relative delta that counts as a resize.
///
/// Separate from the merge layer's 20% disagreement threshold: this one
/// measures drift between merges, not disagreement within one.
pub const DEFAULT_DIMENSION_THRESHOLD: f64 = 0.05;
/// Default window for related-change lookups, in hours.
pub const DEFAULT_RELATED_WINDOW_HOURS: i64 = 24;

/// Removal events have no record to take a confidence from.
const REMOVAL_CONFIDENCE: ConfidenceLevel = ConfidenceLevel::Medium;

/// Configuration for the change detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeDetectorConfig {
    /// When false, `detect_changes` returns nothing. Lifecycle events are
    /// always recorded.
    pub enabled: bool,
    pub position_threshold: f64,
    pub dimension_threshold: f64,
    /// Fixed at construction.
    pub history_capacity: usize,
    pub related_window_hours: i64,
}

impl Default for ChangeDetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            position_threshold: DEFAULT_POSITION_THRESHOLD,
            dimension_threshold: DEFAULT_DIMENSION_THRESHOLD,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            related_window_hours: DEFAULT_RELATED_WINDOW_HOURS,
        }
    }
}

impl ChangeDetectorConfig {
    fn thresholds(&self) -> DiffThresholds {
        DiffThresholds {
            position: self.position_threshold,
            dimension: self.dimension_threshold,
        }
    }
}

/// Aggregate counts over the retained history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeStatistics {
    pub total_changes: usize,
    pub by_type: HashMap<ChangeType, usize>,
    pub verified_changes: usize,
    pub unverified_changes: usize,
    /// Distinct equipment ids with at least one change.
    pub equipment_affected: usize,
    /// Zero when the history is empty.
    pub average_magnitude: f64,
}

/// Classifies changes between merged snapshots and keeps a bounded history.
///
/// All operations take `&self`; the history sits behind a mutex and the
/// configuration is swapped as a whole.
pub struct ChangeDetector {
    config: RwLock<Arc<ChangeDetectorConfig>>,
    history: Mutex<ChangeHistory>,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(ChangeDetectorConfig::default())
    }
}

impl ChangeDetector {
    pub fn new(config: ChangeDetectorConfig) -> Self {
        let history = ChangeHistory::with_capacity(config.history_capacity);
        Self {
            config: RwLock::new(Arc::new(config)),
            history: Mutex::new(history),
        }
    }

    /// Returns the current configuration snapshot.
    pub fn config(&self) -> Arc<ChangeDetectorConfig> {
        Arc::clone(&self.config.read())
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update(|c| c.enabled = enabled);
    }

    pub fn set_thresholds(&self, position: f64, dimension: f64) {
        self.update(|c| {
            c.position_threshold = position;
            c.dimension_threshold = dimension;
        });
    }

    fn update(&self, edit: impl FnOnce(&mut ChangeDetectorConfig)) {
        let mut guard = self.config.write();
        let mut next = (**guard).clone();
        edit(&mut next);
        *guard = Arc::new(next);
    }

    /// Diffs two snapshots and records the result. Empty when disabled.
    pub fn detect_changes(&self, old: &MergedEquipment, new: &MergedEquipment) -> Vec<Change> {
        let config = self.config();
        if !config.enabled {
            return Vec::new();
        }

        let changes = diff_equipment(old, new, config.thresholds());
        if !changes.is_empty() {
            let mut history = self.history.lock();
            for change in &changes {
                debug!(
                    equipment_id = %change.equipment_id,
                    change_type = %change.change_type,
                    field = %change.field,
                    magnitude = change.magnitude,
                    "Change detected"
                );
                history.push(change.clone());
            }
        }
        changes
    }

    /// Records that a piece of equipment appeared.
    pub fn detect_addition(&self, equipment: &MergedEquipment) -> Change {
        let change = Change::new(
            equipment.equipment_id.clone(),
            ChangeType::Added,
            FIELD_EQUIPMENT,
            None,
            serde_json::to_value(equipment).ok(),
            1.0,
            equipment.confidence,
        );
        self.record_lifecycle(change)
    }

    /// Records that a piece of equipment disappeared.
    pub fn detect_removal(&self, equipment_id: &str) -> Change {
        let change = Change::new(
            equipment_id,
            ChangeType::Removed,
            FIELD_EQUIPMENT,
            Some(Value::String(equipment_id.to_string())),
            None,
            1.0,
            REMOVAL_CONFIDENCE,
        );
        self.record_lifecycle(change)
    }

    fn record_lifecycle(&self, change: Change) -> Change {
        debug!(
            equipment_id = %change.equipment_id,
            change_type = %change.change_type,
            "Lifecycle change recorded"
        );
        self.history.lock().push(change.clone());
        change
    }

    /// Changes stamped within `window` of now, oldest first.
    pub fn recent_changes(&self, window: Duration) -> Vec<Change> {
        let cutoff = Utc::now() - window;
        self.history
            .lock()
            .iter()
            .filter(|c| c.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    pub fn changes_for_equipment(&self, equipment_id: &str) -> Vec<Change> {
        self.history
            .lock()
            .iter()
            .filter(|c| c.equipment_id == equipment_id)
            .cloned()
            .collect()
    }

    /// Other changes to the same equipment within the related-change window.
    pub fn related_changes(&self, change_id: ChangeId) -> ChangeResult<Vec<Change>> {
        let window = Duration::hours(self.config().related_window_hours);
        let history = self.history.lock();
        let anchor = history.get(change_id).ok_or(ChangeError::NotFound(change_id))?;

        Ok(history
            .iter()
            .filter(|c| {
                c.id != anchor.id
                    && c.equipment_id == anchor.equipment_id
                    && (c.timestamp - anchor.timestamp).abs() <= window
            })
            .cloned()
            .collect())
    }

    /// Marks a retained change verified or not and notes what was done.
    pub fn verify_change(
        &self,
        change_id: ChangeId,
        verified: bool,
        action_taken: Option<String>,
    ) -> ChangeResult<Change> {
        let mut history = self.history.lock();
        let change = history
            .get_mut(change_id)
            .ok_or(ChangeError::NotFound(change_id))?;
        change.verified = verified;
        change.action_taken = action_taken;
        debug!(change_id = %change_id, verified, "Change verification updated");
        Ok(change.clone())
    }

    /// Snapshot of the retained history, oldest first.
    pub fn history(&self) -> Vec<Change> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    pub fn statistics(&self) -> ChangeStatistics {
        let history = self.history.lock();
        let mut stats = ChangeStatistics::default();
        let mut equipment = HashSet::new();
        let mut magnitude_sum = 0.0;

        for change in history.iter() {
            stats.total_changes += 1;
            *stats.by_type.entry(change.change_type).or_default() += 1;
            if change.verified {
                stats.verified_changes += 1;
            } else {
                stats.unverified_changes += 1;
            }
            equipment.insert(change.equipment_id.as_str());
            magnitude_sum += change.magnitude;
        }

        stats.equipment_affected = equipment.len();
        if stats.total_changes > 0 {
            stats.average_magnitude = magnitude_sum / stats.total_changes as f64;
        }
        stats
    }
}
