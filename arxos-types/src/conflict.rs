use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ConflictId, Dimensions, Point3, SourceRef};

/// Which field two sources disagree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Position,
    Dimension,
    Type,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Position => "position",
            Self::Dimension => "dimension",
            Self::Type => "type",
        };
        f.write_str(name)
    }
}

/// A raw field value taken from one side of a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConflictValue {
    Position(Point3),
    Dimensions(Dimensions),
    Type(String),
}

impl ConflictValue {
    /// Numeric mean of two values of the same kind.
    ///
    /// Returns `None` for type strings and for mismatched kinds.
    #[must_use]
    pub fn mean(&self, other: &ConflictValue) -> Option<ConflictValue> {
        match (self, other) {
            (Self::Position(a), Self::Position(b)) => Some(Self::Position(a.midpoint(b))),
            (Self::Dimensions(a), Self::Dimensions(b)) => Some(Self::Dimensions(a.average(b))),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(p) => write!(f, "{p}"),
            Self::Dimensions(d) => write!(f, "{d}"),
            Self::Type(t) => f.write_str(t),
        }
    }
}

/// A disagreement between two sources about the same equipment field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub equipment_id: String,
    pub conflict_type: ConflictType,
    pub source1: SourceRef,
    pub source2: SourceRef,
    pub value1: ConflictValue,
    pub value2: ConflictValue,
    /// Distance in metres, mean relative dimension delta, or 1.0 for types.
    pub difference: f64,
    /// Non-binding resolution hint, e.g. `use_highest_confidence`.
    pub resolution: String,
}

impl Conflict {
    /// Absolute time between the two sources' capture timestamps.
    #[must_use]
    pub fn time_between_sources(&self) -> Duration {
        (self.source1.timestamp - self.source2.timestamp).abs()
    }
}
