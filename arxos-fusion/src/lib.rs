//! Building-level data fusion for ArxOS.
//!
//! [`DataFusion`] is the entry point. It groups raw sources by equipment id,
//! merges each group, resolves its conflicts, diffs the resolved record
//! against the caller's [`ExistingModel`] and reports statistics together
//! with coverage and confidence scores.
//!
//! The existing model and the [`CoverageTracker`] are narrow capability
//! traits supplied by the host; [`InMemoryModel`] covers the common case of
//! feeding the previous result back in.
//!
//! # Example
//!
//! ```
//! use arxos_fusion::{DataFusion, InMemoryModel};
//! use arxos_types::{ConfidenceLevel, DataSource, SourcePayload, SourceType};
//! use serde_json::json;
//!
//! let fusion = DataFusion::default();
//! let payload = json!({"equipment_id": "ahu-1", "position": [10.0, 20.0, 3.0], "type": "ahu"});
//! let source = DataSource::new(
//!     "doc-1",
//!     SourceType::Document,
//!     ConfidenceLevel::Medium,
//!     SourcePayload::Generic(payload.as_object().unwrap().clone()),
//! );
//!
//! let result = fusion.fuse_building("hq", &[source], &InMemoryModel::new());
//! assert_eq!(result.equipment.len(), 1);
//! ```

mod config;
mod error;
mod model;
mod pipeline;
mod result;
pub mod scan;

pub use config::{FusionConfig, ScanConfig, DEFAULT_MATCH_RADIUS};
pub use error::FusionError;
pub use model::{CoverageTracker, ExistingModel, InMemoryModel};
pub use pipeline::{confidence_score, DataFusion};
pub use result::{
    FusionResult, FusionStatistics, NewEquipmentCandidate, PartialScanResult,
    RemovedEquipmentCandidate,
};
pub use scan::{EquipmentHint, RangeScanPass};
pub use tokio_util::sync::CancellationToken;
