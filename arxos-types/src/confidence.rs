use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;

/// Ordinal trust score attached to a source or a merged record.
///
/// Ordering follows the ordinal: `Estimated < Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    #[default]
    Estimated = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl ConfidenceLevel {
    /// All levels in ascending order.
    pub const ALL: [ConfidenceLevel; 4] = [
        ConfidenceLevel::Estimated,
        ConfidenceLevel::Low,
        ConfidenceLevel::Medium,
        ConfidenceLevel::High,
    ];

    /// Returns the ordinal value (0..=3).
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns the ordinal normalised to `[0, 1]`.
    #[must_use]
    pub fn as_fraction(self) -> f64 {
        f64::from(self.ordinal()) / 3.0
    }

    /// Buckets a detector score in `[0, 1]` into the four tiers.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::High
        } else if score >= 0.7 {
            Self::Medium
        } else if score >= 0.5 {
            Self::Low
        } else {
            Self::Estimated
        }
    }
}

impl TryFrom<u8> for ConfidenceLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Estimated),
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            other => Err(Error::InvalidConfidence(other)),
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Estimated => "estimated",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(name)
    }
}
