//! # Motion Planning
//!
//! A [`MotionPlanner`] turns a point-to-point request into a sequence of
//! [`Waypoint`]s that clear everything on the deck. [`ArcPlanner`] is the
//! reference implementation: rise to a safe height, traverse, descend.

use serde::Serialize;

use pcal_core::{CriticalPoint, Point};
use pcal_deck::DeckModel;

use crate::error::HardwareError;

/// Height above the tallest deck object at which traversals happen.
pub const DEFAULT_ARC_MARGIN: f64 = 10.0;

/// XY distance under which a move is treated as purely vertical.
const XY_TOLERANCE: f64 = 1e-3;

/// Rounding slack when comparing heights derived from the same limit.
const HEIGHT_TOLERANCE: f64 = 1e-6;

/// One stop along a planned path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Waypoint {
    pub position: Point,
    /// Critical point to place at `position`; `None` means the default.
    pub critical_point: Option<CriticalPoint>,
}

impl Waypoint {
    pub fn new(position: Point, critical_point: Option<CriticalPoint>) -> Self {
        Self {
            position,
            critical_point,
        }
    }
}

pub trait MotionPlanner: Send + Sync {
    /// Height at which a traversal from `from` to `to` clears the deck,
    /// never above `max_height`.
    fn safe_height(
        &self,
        from: Point,
        to: Point,
        deck: &dyn DeckModel,
        max_height: f64,
    ) -> Result<f64, HardwareError>;

    /// Waypoints from `from` to `to` through `safe_height`. The final
    /// waypoint is `to` with `dest_cp`.
    fn plan_arc(
        &self,
        from: Point,
        to: Point,
        safe_height: f64,
        origin_cp: Option<CriticalPoint>,
        dest_cp: Option<CriticalPoint>,
    ) -> Vec<Waypoint>;
}

/// Rise, traverse, descend.
#[derive(Debug, Clone, Copy)]
pub struct ArcPlanner {
    margin: f64,
}

impl ArcPlanner {
    pub fn new(margin: f64) -> Self {
        Self { margin }
    }
}

impl Default for ArcPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_ARC_MARGIN)
    }
}

impl MotionPlanner for ArcPlanner {
    fn safe_height(
        &self,
        from: Point,
        to: Point,
        deck: &dyn DeckModel,
        max_height: f64,
    ) -> Result<f64, HardwareError> {
        let floor = deck.highest_z().max(from.z).max(to.z);
        if floor > max_height + HEIGHT_TOLERANCE {
            return Err(HardwareError::Planning(format!(
                "deck clearance {floor:.2} exceeds instrument reach {max_height:.2}"
            )));
        }
        Ok((floor + self.margin).min(max_height))
    }

    fn plan_arc(
        &self,
        from: Point,
        to: Point,
        safe_height: f64,
        origin_cp: Option<CriticalPoint>,
        dest_cp: Option<CriticalPoint>,
    ) -> Vec<Waypoint> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if (dx * dx + dy * dy).sqrt() < XY_TOLERANCE {
            return vec![Waypoint::new(to, dest_cp)];
        }
        let mut path = Vec::with_capacity(3);
        if from.z < safe_height {
            path.push(Waypoint::new(from.with_z(safe_height), origin_cp));
        }
        if to.z < safe_height {
            path.push(Waypoint::new(to.with_z(safe_height), dest_cp));
        }
        path.push(Waypoint::new(to, dest_cp));
        path
    }
}
