use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::{ChangeId, ConfidenceLevel};

/// Classification of a change between two snapshots of the same equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Position,
    Dimension,
    Type,
    Added,
    Removed,
    Attribute,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Position => "position",
            Self::Dimension => "dimension",
            Self::Type => "type",
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Attribute => "attribute",
        };
        f.write_str(name)
    }
}

/// A classified difference between two merged-record snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub id: ChangeId,
    pub equipment_id: String,
    pub change_type: ChangeType,
    /// Field name, e.g. `position` or `attributes.voltage`.
    pub field: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub magnitude: f64,
    pub timestamp: DateTime<Utc>,
    pub confidence: ConfidenceLevel,
    pub verified: bool,
    #[serde(default)]
    pub action_taken: Option<String>,
}

impl Change {
    /// Creates an unverified change stamped with the current time.
    pub fn new(
        equipment_id: impl Into<String>,
        change_type: ChangeType,
        field: impl Into<String>,
        old_value: Option<Value>,
        new_value: Option<Value>,
        magnitude: f64,
        confidence: ConfidenceLevel,
    ) -> Self {
        Self {
            id: ChangeId::new(),
            equipment_id: equipment_id.into(),
            change_type,
            field: field.into(),
            old_value,
            new_value,
            magnitude,
            timestamp: Utc::now(),
            confidence,
            verified: false,
            action_taken: None,
        }
    }

    /// Sets an explicit timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
