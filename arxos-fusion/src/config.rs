use arxos_changes::ChangeDetectorConfig;
use arxos_merge::MergerConfig;
use arxos_resolution::ResolverConfig;
use serde::{Deserialize, Serialize};

/// Default radius for matching a scan detection to a known equipment hint.
pub const DEFAULT_MATCH_RADIUS: f64 = 1.0;

/// Configuration for the whole fusion pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub merger: MergerConfig,
    pub resolver: ResolverConfig,
    pub changes: ChangeDetectorConfig,
    pub scan: ScanConfig,
}

/// Partial-scan matching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Used when a hint carries no search radius of its own (metres).
    pub match_radius: f64,
    /// Prefix for ids given to unmatched detections.
    pub unmatched_id_prefix: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            match_radius: DEFAULT_MATCH_RADIUS,
            unmatched_id_prefix: "scan".to_string(),
        }
    }
}
