//! Change detection for ArxOS merged equipment.
//!
//! A [`ChangeDetector`] compares a previous merged record with a new one and
//! classifies the differences as position, dimension, type or attribute
//! changes. Explicit addition and removal events are recorded alongside.
//! Everything lands in a capacity-bounded history that supports recent,
//! per-equipment and related-change queries plus a verification workflow.

mod detector;
pub mod diff;
mod error;
mod history;

pub use detector::{
    ChangeDetector, ChangeDetectorConfig, ChangeStatistics, DEFAULT_DIMENSION_THRESHOLD,
    DEFAULT_POSITION_THRESHOLD, DEFAULT_RELATED_WINDOW_HOURS, FIELD_EQUIPMENT,
};
pub use diff::{diff_equipment, DiffThresholds};
pub use error::{ChangeError, ChangeResult};
pub use history::{ChangeHistory, DEFAULT_HISTORY_CAPACITY};
