//! The building fusion pipeline.
//!
//! For each equipment id the pipeline merges the grouped sources, resolves
//! every carried conflict, writes at most one resolved value per field back
//! onto the record and then diffs that record against the caller's existing
//! model. Groups are processed in equipment-id order.

use arxos_changes::ChangeDetector;
use arxos_merge::{ConfidenceManager, StrategyMerger};
use arxos_resolution::{ConflictResolver, ResolutionResult};
use arxos_types::{
    Change, ConfidenceLevel, Conflict, ConflictValue, DataSource, MergedEquipment, SourceRef,
    SourceType,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{FusionConfig, ScanConfig};
use crate::error::FusionError;
use crate::model::{CoverageTracker, ExistingModel};
use crate::result::{
    FusionResult, FusionStatistics, NewEquipmentCandidate, PartialScanResult,
    RemovedEquipmentCandidate,
};
use crate::scan::{scan_sources, EquipmentHint, RangeScanPass};

/// Source count at which the confidence boost saturates.
const SOURCE_SATURATION: f64 = 5.0;
/// Maximum relative boost for well-attested records.
const MAX_SOURCE_BOOST: f64 = 0.5;

/// Sources grouped by equipment id.
struct Partition {
    groups: BTreeMap<String, Vec<DataSource>>,
    unattributed: usize,
    breakdown: HashMap<SourceType, usize>,
}

fn partition_sources(sources: &[DataSource]) -> Partition {
    let mut partition = Partition {
        groups: BTreeMap::new(),
        unattributed: 0,
        breakdown: HashMap::new(),
    };

    for source in sources {
        *partition.breakdown.entry(source.source_type).or_default() += 1;
        match source.equipment_id() {
            Some(id) => partition
                .groups
                .entry(id.to_string())
                .or_default()
                .push(source.clone()),
            None => {
                debug!(source_id = %source.id, "Source has no equipment id");
                partition.unattributed += 1;
            }
        }
    }
    partition
}

/// Running totals for one fusion call.
#[derive(Default)]
struct FusionRun {
    equipment: Vec<MergedEquipment>,
    changes: Vec<Change>,
    conflicts: Vec<Conflict>,
    resolutions: Vec<ResolutionResult>,
    dropped: usize,
    processed: usize,
}

/// Orchestrates merging, change detection and conflict resolution for a
/// building.
pub struct DataFusion {
    merger: StrategyMerger,
    resolver: ConflictResolver,
    changes: ChangeDetector,
    scan: ScanConfig,
    coverage: Option<Arc<dyn CoverageTracker>>,
}

impl Default for DataFusion {
    fn default() -> Self {
        Self::new(FusionConfig::default())
    }
}

impl DataFusion {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            merger: StrategyMerger::new(config.merger),
            resolver: ConflictResolver::new(config.resolver),
            changes: ChangeDetector::new(config.changes),
            scan: config.scan,
            coverage: None,
        }
    }

    /// Attaches the coverage collaborator.
    #[must_use]
    pub fn with_coverage_tracker(mut self, tracker: Arc<dyn CoverageTracker>) -> Self {
        self.coverage = Some(tracker);
        self
    }

    /// Attaches the confidence collaborator, keeping the merger's settings.
    #[must_use]
    pub fn with_confidence_manager(mut self, manager: Arc<dyn ConfidenceManager>) -> Self {
        let config = (*self.merger.config()).clone();
        self.merger = StrategyMerger::with_confidence_manager(config, manager);
        self
    }

    pub fn merger(&self) -> &StrategyMerger {
        &self.merger
    }

    pub fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    pub fn change_detector(&self) -> &ChangeDetector {
        &self.changes
    }

    /// Fuses every source for a building.
    ///
    /// Never fails as a whole: equipment ids whose merge fails are counted in
    /// [`FusionStatistics::equipment_dropped`] and left out.
    pub fn fuse_building(
        &self,
        building_id: &str,
        sources: &[DataSource],
        existing: &dyn ExistingModel,
    ) -> FusionResult {
        let started = Instant::now();
        let partition = partition_sources(sources);
        let mut run = FusionRun::default();
        // Without a token the loop always runs to completion.
        if let Err(e) = self.run_groups(&partition, existing, &mut run, None) {
            warn!(building_id, error = %e, "Fusion stopped early");
        }
        self.finish(building_id, sources.len(), partition, run, started)
    }

    /// Like [`fuse_building`](Self::fuse_building), checking the token
    /// before each equipment group.
    pub fn fuse_building_with_cancel(
        &self,
        building_id: &str,
        sources: &[DataSource],
        existing: &dyn ExistingModel,
        cancel_token: &CancellationToken,
    ) -> Result<FusionResult, FusionError> {
        let started = Instant::now();
        let partition = partition_sources(sources);
        let mut run = FusionRun::default();

        if let Err(e) = self.run_groups(&partition, existing, &mut run, Some(cancel_token)) {
            warn!(building_id, processed = run.processed, "Fusion cancelled");
            return Err(e);
        }
        Ok(self.finish(building_id, sources.len(), partition, run, started))
    }

    /// Processes groups in equipment-id order until done or cancelled.
    fn run_groups(
        &self,
        partition: &Partition,
        existing: &dyn ExistingModel,
        run: &mut FusionRun,
        cancel_token: Option<&CancellationToken>,
    ) -> Result<(), FusionError> {
        for (equipment_id, group) in &partition.groups {
            if cancel_token.is_some_and(CancellationToken::is_cancelled) {
                return Err(FusionError::Cancelled {
                    processed: run.processed,
                });
            }
            self.process_group(equipment_id, group, existing, run);
        }
        Ok(())
    }

    fn process_group(
        &self,
        equipment_id: &str,
        group: &[DataSource],
        existing: &dyn ExistingModel,
        run: &mut FusionRun,
    ) {
        run.processed += 1;

        let mut merged = match self.merger.merge_equipment_data(equipment_id, group) {
            Ok(merged) => merged,
            Err(e) => {
                warn!(equipment_id, error = %e, "Dropping equipment from fusion");
                run.dropped += 1;
                return;
            }
        };

        let detected = std::mem::take(&mut merged.conflicts);
        let resolutions: Vec<ResolutionResult> = detected
            .iter()
            .map(|conflict| self.resolver.resolve_conflict(conflict))
            .collect();

        let primary = merged.sources.first().map(|source| source.id.clone());
        for index in select_resolutions(&detected, &resolutions, primary.as_deref()) {
            apply_resolution(&mut merged, &resolutions[index]);
        }

        for (conflict, resolution) in detected.into_iter().zip(resolutions) {
            if resolution.resolved_value.is_none() {
                merged.conflicts.push(conflict.clone());
            }
            run.conflicts.push(conflict);
            run.resolutions.push(resolution);
        }

        // Diff the record as it will be returned, resolved values included.
        if let Some(previous) = existing.get_equipment(equipment_id) {
            run.changes.extend(self.changes.detect_changes(&previous, &merged));
        }

        run.equipment.push(merged);
    }

    fn finish(
        &self,
        building_id: &str,
        total_sources: usize,
        partition: Partition,
        run: FusionRun,
        started: Instant,
    ) -> FusionResult {
        let coverage = self
            .coverage
            .as_ref()
            .map_or(0.0, |tracker| tracker.coverage_percentage());
        let confidence_score = confidence_score(&run.equipment);

        let statistics = FusionStatistics {
            total_sources,
            source_breakdown: partition.breakdown,
            equipment_processed: run.equipment.len(),
            equipment_dropped: run.dropped,
            unattributed_sources: partition.unattributed,
            conflicts_detected: run.conflicts.len(),
            conflicts_resolved: run
                .resolutions
                .iter()
                .filter(|r| r.resolved_value.is_some())
                .count(),
            changes_detected: run.changes.len(),
            processing_time: started.elapsed(),
        };

        info!(
            building_id,
            equipment = statistics.equipment_processed,
            dropped = statistics.equipment_dropped,
            conflicts = statistics.conflicts_detected,
            changes = statistics.changes_detected,
            elapsed_ms = statistics.processing_time.as_millis() as u64,
            "Building fusion complete"
        );

        FusionResult {
            building_id: building_id.to_string(),
            equipment: run.equipment,
            changes: run.changes,
            conflicts: run.conflicts,
            resolutions: run.resolutions,
            coverage,
            confidence_score,
            statistics,
            completed_at: Utc::now(),
        }
    }

    /// Fuses one range-scan pass against known equipment.
    ///
    /// Matched detections are fused like any other source. Unmatched ones
    /// become new-equipment candidates. Known records the pass did not see
    /// become removal candidates only where the coverage tracker reports the
    /// area as scanned.
    pub fn fuse_partial_scan(
        &self,
        building_id: &str,
        pass: &RangeScanPass,
        hints: &[EquipmentHint],
        existing: &dyn ExistingModel,
    ) -> PartialScanResult {
        let matches = scan_sources(pass, hints, self.scan.match_radius);
        let mut fusion = self.fuse_building(building_id, &matches.sources, existing);

        let mut new_equipment = Vec::with_capacity(matches.unmatched.len());
        for index in matches.unmatched {
            let Some(detection) = pass.detections.get(index) else {
                continue;
            };
            let candidate = NewEquipmentCandidate {
                candidate_id: format!("{}-{}-{index}", self.scan.unmatched_id_prefix, pass.scan_id),
                equipment_type: detection.class_label.clone(),
                position: detection.centroid,
                dimensions: detection.extent,
                confidence: ConfidenceLevel::from_score(detection.score),
                score: detection.score,
            };

            let mut record = MergedEquipment::new(
                candidate.candidate_id.clone(),
                candidate.equipment_type.clone(),
                candidate.position,
                candidate.dimensions,
                candidate.confidence,
            );
            record.sources.push(SourceRef {
                id: format!("{}-{index}", pass.scan_id),
                source_type: SourceType::RangeScan,
                confidence: candidate.confidence,
                timestamp: pass.timestamp,
            });
            fusion.changes.push(self.changes.detect_addition(&record));
            new_equipment.push(candidate);
        }

        let mut removed_equipment = Vec::new();
        for previous in existing.get_all_equipment() {
            if fusion.get_equipment(&previous.equipment_id).is_some() {
                continue;
            }
            let region = self
                .coverage
                .as_ref()
                .and_then(|tracker| tracker.region_confidence(&previous.position));
            let Some(region_confidence) = region else {
                debug!(
                    equipment_id = %previous.equipment_id,
                    "Area not scanned, not treating as removed"
                );
                continue;
            };

            fusion
                .changes
                .push(self.changes.detect_removal(&previous.equipment_id));
            removed_equipment.push(RemovedEquipmentCandidate {
                equipment_id: previous.equipment_id,
                equipment_type: previous.equipment_type,
                last_position: previous.position,
                region_confidence,
            });
        }
        fusion.statistics.changes_detected = fusion.changes.len();

        info!(
            building_id,
            scan_id = %pass.scan_id,
            matched = fusion.statistics.total_sources,
            new = new_equipment.len(),
            removed = removed_equipment.len(),
            "Partial scan fusion complete"
        );

        PartialScanResult {
            fusion,
            new_equipment,
            removed_equipment,
        }
    }
}

/// Picks at most one valued resolution per conflict type.
///
/// A resolution whose conflict involves the primary source beats one that
/// does not. Higher confidence breaks the tie, then detection order. Returns
/// indices in detection order.
fn select_resolutions(
    conflicts: &[Conflict],
    resolutions: &[ResolutionResult],
    primary: Option<&str>,
) -> Vec<usize> {
    let rank = |index: usize| {
        let conflict = &conflicts[index];
        let involves_primary = primary
            .is_some_and(|id| conflict.source1.id == id || conflict.source2.id == id);
        (involves_primary, resolutions[index].confidence)
    };

    let mut chosen: Vec<usize> = Vec::new();
    for (index, resolution) in resolutions.iter().enumerate() {
        if resolution.resolved_value.is_none() {
            continue;
        }
        let conflict_type = conflicts[index].conflict_type;
        match chosen
            .iter_mut()
            .find(|current| conflicts[**current].conflict_type == conflict_type)
        {
            Some(current) => {
                if rank(index) > rank(*current) {
                    *current = index;
                }
            }
            None => chosen.push(index),
        }
    }
    chosen.sort_unstable();
    chosen
}

/// Writes a resolved value onto the record. Resolutions without a value
/// leave the record alone.
fn apply_resolution(merged: &mut MergedEquipment, resolution: &ResolutionResult) {
    let Some(value) = &resolution.resolved_value else {
        return;
    };
    match value {
        ConflictValue::Position(position) => merged.position = *position,
        ConflictValue::Dimensions(dimensions) => merged.dimensions = *dimensions,
        ConflictValue::Type(equipment_type) => merged.equipment_type = equipment_type.clone(),
    }
    merged.confidence = resolution.confidence;
}

/// Mean per-record confidence, each boosted by up to half again for
/// corroborating sources and capped at 1.0. Zero for an empty building.
pub fn confidence_score(equipment: &[MergedEquipment]) -> f64 {
    if equipment.is_empty() {
        return 0.0;
    }
    let total: f64 = equipment
        .iter()
        .map(|merged| {
            let saturation = (merged.sources.len() as f64 / SOURCE_SATURATION).min(1.0);
            (merged.confidence.as_fraction() * (1.0 + MAX_SOURCE_BOOST * saturation)).min(1.0)
        })
        .sum();
    total / equipment.len() as f64
}
