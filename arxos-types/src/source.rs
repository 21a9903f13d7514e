//! Raw data sources fed into the fusion core.
//!
//! A [`DataSource`] is one timestamped observation produced by an upstream
//! capture method. Its payload is either a typed record matching the capture
//! method or a generic JSON mapping read by key lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use crate::{ConfidenceLevel, Dimensions, Point3, EQUIPMENT_ID_KEY};

/// The capture method that produced a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Scanned or digital drawings and schedules.
    Document,
    /// Building-model imports (IFC and similar).
    ModelImport,
    /// Depth/range scans (LiDAR).
    RangeScan,
    /// Augmented-reality placements.
    Ar,
    /// Manual entry.
    Manual,
}

impl SourceType {
    pub const ALL: [SourceType; 5] = [
        SourceType::Document,
        SourceType::ModelImport,
        SourceType::RangeScan,
        SourceType::Ar,
        SourceType::Manual,
    ];

    /// Stable lowercase name, also used as the `prefer_source` selector.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::ModelImport => "model_import",
            Self::RangeScan => "range_scan",
            Self::Ar => "ar",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equipment symbol or schedule row extracted from a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub equipment_id: Option<String>,
    pub equipment_type: String,
    pub location: Point3,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

/// Element read from a building-model import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelElement {
    pub global_id: String,
    pub element_type: String,
    pub placement: Point3,
    #[serde(default)]
    pub bounding_box: Option<Dimensions>,
    #[serde(default)]
    pub property_sets: HashMap<String, Value>,
}

/// Object detected in a range-scan pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanDetection {
    #[serde(default)]
    pub equipment_id: Option<String>,
    pub class_label: String,
    pub centroid: Point3,
    pub extent: Dimensions,
    /// Detector score in `[0, 1]`.
    pub score: f64,
    #[serde(default)]
    pub point_count: u32,
}

/// Equipment anchor placed in an AR session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArPlacement {
    pub anchor_id: String,
    #[serde(default)]
    pub equipment_id: Option<String>,
    pub equipment_type: String,
    pub position: Point3,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

/// Equipment entered by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualEntry {
    pub equipment_id: String,
    pub equipment_type: String,
    pub position: Point3,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

/// The payload of a source.
///
/// The fusion core treats payloads as opaque until extraction; a typed record
/// is only read when its variant matches the source's [`SourceType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SourcePayload {
    Document(DocumentRecord),
    ModelImport(ModelElement),
    RangeScan(ScanDetection),
    Ar(ArPlacement),
    Manual(ManualEntry),
    /// Untyped mapping read through key lookup.
    Generic(Map<String, Value>),
}

impl SourcePayload {
    /// Returns the source type this payload's typed record belongs to, or
    /// `None` for a generic mapping.
    #[must_use]
    pub fn record_type(&self) -> Option<SourceType> {
        match self {
            Self::Document(_) => Some(SourceType::Document),
            Self::ModelImport(_) => Some(SourceType::ModelImport),
            Self::RangeScan(_) => Some(SourceType::RangeScan),
            Self::Ar(_) => Some(SourceType::Ar),
            Self::Manual(_) => Some(SourceType::Manual),
            Self::Generic(_) => None,
        }
    }

    /// The equipment id carried inside the payload, if any.
    #[must_use]
    pub fn equipment_id(&self) -> Option<&str> {
        let id = match self {
            Self::Document(record) => record.equipment_id.as_deref(),
            Self::ModelImport(element) => Some(element.global_id.as_str()),
            Self::RangeScan(detection) => detection.equipment_id.as_deref(),
            Self::Ar(placement) => placement.equipment_id.as_deref(),
            Self::Manual(entry) => Some(entry.equipment_id.as_str()),
            Self::Generic(map) => map
                .get(EQUIPMENT_ID_KEY)
                .or_else(|| map.get("id"))
                .and_then(Value::as_str),
        };
        id.filter(|id| !id.is_empty())
    }
}

/// One timestamped observation of equipment from a capture method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub source_type: SourceType,
    pub timestamp: DateTime<Utc>,
    pub confidence: ConfidenceLevel,
    pub payload: SourcePayload,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl DataSource {
    /// Creates a source stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        source_type: SourceType,
        confidence: ConfidenceLevel,
        payload: SourcePayload,
    ) -> Self {
        Self {
            id: id.into(),
            source_type,
            timestamp: Utc::now(),
            confidence,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Sets an explicit capture timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Tags the source with an equipment id in its metadata.
    #[must_use]
    pub fn with_equipment_id(self, equipment_id: impl Into<String>) -> Self {
        self.with_metadata(EQUIPMENT_ID_KEY, equipment_id.into())
    }

    /// Resolves the equipment id this source describes.
    ///
    /// Metadata wins over the payload's own id field. Empty strings count as
    /// absent.
    #[must_use]
    pub fn equipment_id(&self) -> Option<&str> {
        self.metadata
            .get(EQUIPMENT_ID_KEY)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .or_else(|| self.payload.equipment_id())
    }
}

/// Lightweight reference to a source, kept on merged records and conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub source_type: SourceType,
    pub confidence: ConfidenceLevel,
    pub timestamp: DateTime<Utc>,
}

impl From<&DataSource> for SourceRef {
    fn from(source: &DataSource) -> Self {
        Self {
            id: source.id.clone(),
            source_type: source.source_type,
            confidence: source.confidence,
            timestamp: source.timestamp,
        }
    }
}
