//! Strategy merging for ArxOS equipment fusion.
//!
//! Turns the raw sources gathered for one equipment id into a single
//! [`MergedEquipment`](arxos_types::MergedEquipment):
//!
//! 1. **Extract**: each [`DataSource`](arxos_types::DataSource) is normalised
//!    into an [`EquipmentObservation`]; unreadable payloads are skipped.
//! 2. **Order**: observations are stable-sorted for the active strategy.
//! 3. **Detect**: every pair of observations is compared by the
//!    [`ConflictDetector`].
//! 4. **Merge**: the [`MergeStrategy`](arxos_types::MergeStrategy) combines
//!    the observations into one record, carrying the detected conflicts.
//!
//! # Example
//!
//! ```
//! use arxos_merge::{MergerConfig, StrategyMerger};
//! use arxos_types::{ConfidenceLevel, DataSource, SourcePayload, SourceType};
//! use serde_json::json;
//!
//! let merger = StrategyMerger::new(MergerConfig::default());
//! let payload = json!({"position": [10.0, 20.0, 3.0], "type": "ahu"});
//! let source = DataSource::new(
//!     "scan-1",
//!     SourceType::RangeScan,
//!     ConfidenceLevel::High,
//!     SourcePayload::Generic(payload.as_object().unwrap().clone()),
//! );
//!
//! let merged = merger.merge_equipment_data("ahu-1", &[source]).unwrap();
//! assert_eq!(merged.equipment_type, "ahu");
//! ```

mod confidence;
pub mod conflict;
mod error;
pub mod extractor;
mod merger;

pub use confidence::{ConfidenceAspect, ConfidenceManager};
pub use conflict::ConflictDetector;
pub use error::{MergeError, MergeResult};
pub use extractor::{extract_observation, EquipmentObservation};
pub use merger::{MergerConfig, StrategyMerger};
