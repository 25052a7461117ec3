//! # Deck Geometry
//!
//! Positions on the robot deck are millimetre vectors in the deck frame:
//! `x` grows to the right, `y` grows towards the back, `z` grows upward
//! from the deck surface.
//!
//! A gantry move targets a [`Point`] for a given [`Mount`]. Which physical
//! part of the pipette lands on that point is chosen by a [`CriticalPoint`].

use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

// ─── Point ───────────────────────────────────────────────────────────

/// A position or displacement in deck coordinates (millimetres).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    /// The origin, also the zero displacement.
    pub const ZERO: Point = Point::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build a point from a `[x, y, z]` slice.
    pub fn from_slice(v: &[f64]) -> Result<Self, GeometryError> {
        match v {
            [x, y, z] => Ok(Self::new(*x, *y, *z)),
            other => Err(GeometryError::VectorArity(other.len())),
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Same point with `z` replaced.
    pub fn with_z(self, z: f64) -> Self {
        Self { z, ..self }
    }

    /// Component-wise comparison within `tolerance` millimetres.
    pub fn approx_eq(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f64; 3]> for Point {
    fn from(v: [f64; 3]) -> Self {
        Point::new(v[0], v[1], v[2])
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ─── Mount ───────────────────────────────────────────────────────────

/// One of the two pipette-carrying positions on the gantry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mount {
    Left,
    Right,
}

impl Mount {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// The mount on the other side of the gantry.
    pub fn other(&self) -> Mount {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl std::fmt::Display for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mount {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(GeometryError::UnknownMount(s.to_string())),
        }
    }
}

// ─── Critical Point ──────────────────────────────────────────────────

/// The part of an instrument that is placed at a move's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalPoint {
    /// End of the bare nozzle, ignoring any attached tip.
    Nozzle,
    /// End of the attached tip (the nozzle when no tip is attached).
    Tip,
    /// Horizontal centre of a multi-channel head.
    XyCenter,
    /// Frontmost nozzle of a multi-channel head.
    FrontNozzle,
}

impl std::fmt::Display for CriticalPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Nozzle => "NOZZLE",
            Self::Tip => "TIP",
            Self::XyCenter => "XY_CENTER",
            Self::FrontNozzle => "FRONT_NOZZLE",
        };
        f.write_str(s)
    }
}
