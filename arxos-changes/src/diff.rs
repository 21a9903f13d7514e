//! Field-by-field comparison of two merged snapshots.
//!
//! Pure functions; the detector decides whether to run them and where the
//! results go.

use arxos_types::{Change, ChangeType, MergedEquipment};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Field name used for position changes.
pub const FIELD_POSITION: &str = "position";
/// Field name used for the aggregate dimension change.
pub const FIELD_DIMENSIONS: &str = "dimensions";
/// Field name used for type changes.
pub const FIELD_TYPE: &str = "type";
/// Prefix for attribute field names, e.g. `attributes.voltage`.
pub const ATTRIBUTE_PREFIX: &str = "attributes.";

/// Thresholds applied by [`diff_equipment`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffThresholds {
    /// Minimum displacement in metres, inclusive.
    pub position: f64,
    /// Per-axis relative delta that must be exceeded on at least one axis.
    pub dimension: f64,
}

/// Compares two snapshots of the same equipment.
///
/// Changes carry the new snapshot's merge time and confidence. Comparing a
/// snapshot with an identical copy yields nothing. Dimensions are skipped
/// when either side is unknown (all zero).
pub fn diff_equipment(
    old: &MergedEquipment,
    new: &MergedEquipment,
    thresholds: DiffThresholds,
) -> Vec<Change> {
    let mut changes = Vec::new();
    let change = |change_type, field: String, old_value, new_value, magnitude| {
        Change::new(
            new.equipment_id.clone(),
            change_type,
            field,
            old_value,
            new_value,
            magnitude,
            new.confidence,
        )
        .with_timestamp(new.merged_at)
    };

    let displacement = old.position.distance_to(&new.position);
    if displacement >= thresholds.position && displacement > 0.0 {
        changes.push(change(
            ChangeType::Position,
            FIELD_POSITION.to_string(),
            to_json(&old.position),
            to_json(&new.position),
            displacement,
        ));
    }

    let deltas = old.dimensions.relative_deltas(&new.dimensions);
    let sized = !old.dimensions.is_unknown() && !new.dimensions.is_unknown();
    if sized && deltas.iter().any(|delta| *delta > thresholds.dimension) {
        let magnitude = deltas.iter().sum::<f64>() / 3.0;
        changes.push(change(
            ChangeType::Dimension,
            FIELD_DIMENSIONS.to_string(),
            to_json(&old.dimensions),
            to_json(&new.dimensions),
            magnitude,
        ));
    }

    if old.equipment_type != new.equipment_type {
        changes.push(change(
            ChangeType::Type,
            FIELD_TYPE.to_string(),
            Some(Value::String(old.equipment_type.clone())),
            Some(Value::String(new.equipment_type.clone())),
            1.0,
        ));
    }

    let keys: BTreeSet<&String> = old.attributes.keys().chain(new.attributes.keys()).collect();
    for key in keys {
        let field = format!("{ATTRIBUTE_PREFIX}{key}");
        match (old.attributes.get(key), new.attributes.get(key)) {
            (None, Some(value)) => {
                changes.push(change(ChangeType::Added, field, None, Some(value.clone()), 1.0));
            }
            (Some(value), None) => {
                changes.push(change(ChangeType::Attribute, field, Some(value.clone()), None, 1.0));
            }
            (Some(before), Some(after)) if !values_equal(before, after) => {
                changes.push(change(
                    ChangeType::Attribute,
                    field,
                    Some(before.clone()),
                    Some(after.clone()),
                    attribute_magnitude(before, after),
                ));
            }
            _ => {}
        }
    }

    changes
}

/// Structural equality that treats numbers by value, so `1` equals `1.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Relative numeric difference when both values read as numbers, else 1.0.
pub fn attribute_magnitude(a: &Value, b: &Value) -> f64 {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => {
            let scale = x.abs().max(y.abs());
            if scale == 0.0 {
                0.0
            } else {
                (x - y).abs() / scale
            }
        }
        _ => 1.0,
    }
}

// Numeric strings count, matching values typed in by hand.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_json<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}
