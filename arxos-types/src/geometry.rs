//! Geometry primitives for equipment placement.
//!
//! Positions are building-local coordinates in metres.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A point in building-local 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(&self, other: &Point3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Midpoint between two points.
    #[must_use]
    pub fn midpoint(&self, other: &Point3) -> Point3 {
        Point3::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }

    /// Reads a point from `{"x":..,"y":..,"z":..}` or `[x, y, z]`.
    ///
    /// A missing `z` in the object form defaults to 0.
    pub fn from_json(value: &Value) -> Option<Point3> {
        match value {
            Value::Object(map) => {
                let x = map.get("x")?.as_f64()?;
                let y = map.get("y")?.as_f64()?;
                let z = map.get("z").and_then(Value::as_f64).unwrap_or(0.0);
                Some(Point3::new(x, y, z))
            }
            Value::Array(items) if items.len() == 3 => Some(Point3::new(
                items[0].as_f64()?,
                items[1].as_f64()?,
                items[2].as_f64()?,
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Bounding dimensions of a piece of equipment, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    #[must_use]
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// True for the all-zero triple recorded when no source reported a size.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.length == 0.0 && self.width == 0.0 && self.height == 0.0
    }

    /// Per-axis relative differences `|a - b| / max(a, b)`, in
    /// length/width/height order. An axis where both values are zero
    /// contributes 0.
    #[must_use]
    pub fn relative_deltas(&self, other: &Dimensions) -> [f64; 3] {
        [
            relative_difference(self.length, other.length),
            relative_difference(self.width, other.width),
            relative_difference(self.height, other.height),
        ]
    }

    /// Mean of the three per-axis relative differences.
    #[must_use]
    pub fn mean_relative_delta(&self, other: &Dimensions) -> f64 {
        let deltas = self.relative_deltas(other);
        deltas.iter().sum::<f64>() / 3.0
    }

    /// Axis-wise mean of two dimension triples.
    #[must_use]
    pub fn average(&self, other: &Dimensions) -> Dimensions {
        Dimensions::new(
            (self.length + other.length) / 2.0,
            (self.width + other.width) / 2.0,
            (self.height + other.height) / 2.0,
        )
    }

    /// Reads dimensions from `{"length":..,"width":..,"height":..}` or
    /// `[length, width, height]`.
    pub fn from_json(value: &Value) -> Option<Dimensions> {
        match value {
            Value::Object(map) => Some(Dimensions::new(
                map.get("length")?.as_f64()?,
                map.get("width")?.as_f64()?,
                map.get("height")?.as_f64()?,
            )),
            Value::Array(items) if items.len() == 3 => Some(Dimensions::new(
                items[0].as_f64()?,
                items[1].as_f64()?,
                items[2].as_f64()?,
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} x {:.2} x {:.2}",
            self.length, self.width, self.height
        )
    }
}

fn relative_difference(a: f64, b: f64) -> f64 {
    let max = a.abs().max(b.abs());
    if max == 0.0 {
        0.0
    } else {
        (a - b).abs() / max
    }
}
