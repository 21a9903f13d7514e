//! Capability contracts supplied by the caller.

use arxos_types::{ConfidenceLevel, MergedEquipment, Point3};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

use crate::result::FusionResult;

/// Read-only view of the previously fused building.
pub trait ExistingModel: Send + Sync {
    fn get_equipment(&self, equipment_id: &str) -> Option<MergedEquipment>;

    fn get_all_equipment(&self) -> Vec<MergedEquipment>;

    /// Opaque floor plan for a floor, if the host has one.
    fn get_floor_plan(&self, floor: i32) -> Option<Value>;
}

/// Tracks how much of the building has been scanned, and how well.
pub trait CoverageTracker: Send + Sync {
    /// Share of the building's extent scanned with at least minimal
    /// confidence, as a percentage in `[0, 100]`.
    fn coverage_percentage(&self) -> f64;

    /// Scan confidence at a point; `None` if the point was never scanned.
    fn region_confidence(&self, point: &Point3) -> Option<ConfidenceLevel>;
}

/// `HashMap`-backed [`ExistingModel`] for hosts that keep the last result
/// in memory.
#[derive(Debug, Default)]
pub struct InMemoryModel {
    equipment: RwLock<HashMap<String, MergedEquipment>>,
    floor_plans: RwLock<HashMap<i32, Value>>,
}

impl InMemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the model from a previous fusion result.
    pub fn from_result(result: &FusionResult) -> Self {
        let model = Self::new();
        model.absorb(result);
        model
    }

    /// Inserts or replaces a record.
    pub fn insert(&self, equipment: MergedEquipment) {
        self.equipment
            .write()
            .insert(equipment.equipment_id.clone(), equipment);
    }

    pub fn remove(&self, equipment_id: &str) -> Option<MergedEquipment> {
        self.equipment.write().remove(equipment_id)
    }

    pub fn set_floor_plan(&self, floor: i32, plan: Value) {
        self.floor_plans.write().insert(floor, plan);
    }

    /// Replaces every record the result carries, keeping the rest.
    pub fn absorb(&self, result: &FusionResult) {
        let mut equipment = self.equipment.write();
        for merged in &result.equipment {
            equipment.insert(merged.equipment_id.clone(), merged.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.equipment.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.equipment.read().is_empty()
    }
}

impl ExistingModel for InMemoryModel {
    fn get_equipment(&self, equipment_id: &str) -> Option<MergedEquipment> {
        self.equipment.read().get(equipment_id).cloned()
    }

    fn get_all_equipment(&self) -> Vec<MergedEquipment> {
        let mut all: Vec<MergedEquipment> = self.equipment.read().values().cloned().collect();
        all.sort_by(|a, b| a.equipment_id.cmp(&b.equipment_id));
        all
    }

    fn get_floor_plan(&self, floor: i32) -> Option<Value> {
        self.floor_plans.read().get(&floor).cloned()
    }
}
