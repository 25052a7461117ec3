//! # Motion Coordination
//!
//! [`MotionCoordinator`] issues the gantry moves of one session's mount:
//! planned arc moves, tip pick-up with a scoped current override, and tip
//! return. It holds no workflow state; the session decides what to move
//! where.

use std::sync::Arc;

use pcal_core::{CriticalPoint, Mount, Point};
use pcal_deck::{Deck, DeckError, DeckModel, Well};
use pcal_hardware::{HardwareController, HardwareError, MotionPlanner};

use crate::constants::{
    MOVE_TO_REFERENCE_SAFETY_BUFFER, MULTI_CHANNEL_PICK_UP_CURRENT, TRASH_REFERENCE_OFFSET,
    TRASH_REFERENCE_WELL,
};

pub struct MotionCoordinator {
    hardware: Arc<dyn HardwareController>,
    planner: Arc<dyn MotionPlanner>,
    mount: Mount,
    critical_point_override: Option<CriticalPoint>,
    multichannel: bool,
}

impl std::fmt::Debug for MotionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionCoordinator")
            .field("mount", &self.mount)
            .field("critical_point_override", &self.critical_point_override)
            .field("multichannel", &self.multichannel)
            .finish_non_exhaustive()
    }
}

impl MotionCoordinator {
    /// Multi-channel pipettes are positioned by their front nozzle; single
    /// channels by their default critical point.
    pub fn new(
        hardware: Arc<dyn HardwareController>,
        planner: Arc<dyn MotionPlanner>,
        mount: Mount,
        channels: u8,
    ) -> Self {
        let multichannel = channels > 1;
        Self {
            hardware,
            planner,
            mount,
            critical_point_override: multichannel.then_some(CriticalPoint::FrontNozzle),
            multichannel,
        }
    }

    pub fn mount(&self) -> Mount {
        self.mount
    }

    pub fn critical_point_override(&self) -> Option<CriticalPoint> {
        self.critical_point_override
    }

    /// Current position of the default critical point, or of `critical_point`.
    pub async fn current_point(
        &self,
        critical_point: Option<CriticalPoint>,
    ) -> Result<Point, HardwareError> {
        self.hardware.gantry_position(self.mount, critical_point).await
    }

    /// Arc move to `target`, landing `this_move_cp` (or the session override)
    /// on it. Waypoints are issued one at a time, each awaited.
    pub async fn move_to(
        &self,
        deck: &dyn DeckModel,
        target: Point,
        this_move_cp: Option<CriticalPoint>,
    ) -> Result<(), HardwareError> {
        let from = self.current_point(None).await?;
        let dest_cp = this_move_cp.or(self.critical_point_override);
        let max_height = self
            .hardware
            .instrument_max_height(self.mount, dest_cp)
            .await?;
        let safe = self.planner.safe_height(from, target, deck, max_height)?;
        for waypoint in self.planner.plan_arc(from, target, safe, None, dest_cp) {
            tracing::debug!(
                mount = %self.mount,
                position = %waypoint.position,
                critical_point = ?waypoint.critical_point,
                "waypoint"
            );
            self.hardware
                .move_to(self.mount, waypoint.position, waypoint.critical_point)
                .await?;
        }
        Ok(())
    }

    pub async fn jog(&self, vector: Point) -> Result<(), HardwareError> {
        self.hardware.move_rel(self.mount, vector).await
    }

    /// Pick up a tip of `tip_length` from the current position. Returns the
    /// pre-pickup position, which the session records as the tip origin.
    ///
    /// Multi-channel pipettes pick up with a reduced current; the configured
    /// current is restored before this returns, on success or failure.
    pub async fn pick_up_tip(&self, tip_length: f64) -> Result<Point, HardwareError> {
        let origin = self.current_point(self.critical_point_override).await?;
        tracing::info!(mount = %self.mount, %origin, tip_length, "picking up tip");
        let _current = if self.multichannel {
            Some(PickUpCurrentGuard::engage(
                self.hardware.as_ref(),
                self.mount,
                MULTI_CHANNEL_PICK_UP_CURRENT,
            )?)
        } else {
            None
        };
        self.hardware.pick_up_tip(self.mount, tip_length).await?;
        Ok(origin)
    }

    /// Lower into the well at `origin` so the tip sits `tip_length ×
    /// return_tip_height` deep, then eject it.
    pub async fn return_tip(
        &self,
        origin: Point,
        tip_length: f64,
        return_tip_height: f64,
    ) -> Result<(), HardwareError> {
        let target = origin - Point::new(0.0, 0.0, tip_length * return_tip_height);
        tracing::info!(mount = %self.mount, %target, "returning tip");
        self.hardware
            .move_to(self.mount, target, self.critical_point_override)
            .await?;
        self.hardware.drop_tip(self.mount).await
    }

    /// The static z reference: the calibration block's short side when a
    /// block well is given, otherwise the flat surface of the fixed trash.
    pub fn reference_location(deck: &Deck, block_well: Option<&Well>) -> Result<Point, DeckError> {
        match block_well {
            Some(well) => Ok(well.top() + MOVE_TO_REFERENCE_SAFETY_BUFFER),
            None => {
                let trash_top = deck.trash()?.well(TRASH_REFERENCE_WELL)?.top();
                Ok(trash_top + TRASH_REFERENCE_OFFSET + MOVE_TO_REFERENCE_SAFETY_BUFFER)
            }
        }
    }
}

/// Holds a pick-up current override for one mount and restores the saved
/// value when dropped.
struct PickUpCurrentGuard<'a> {
    hardware: &'a dyn HardwareController,
    mount: Mount,
    saved: f64,
}

impl<'a> PickUpCurrentGuard<'a> {
    fn engage(
        hardware: &'a dyn HardwareController,
        mount: Mount,
        amps: f64,
    ) -> Result<Self, HardwareError> {
        let saved = hardware.pick_up_current(mount)?;
        hardware.set_pick_up_current(mount, amps)?;
        Ok(Self {
            hardware,
            mount,
            saved,
        })
    }
}

impl Drop for PickUpCurrentGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.hardware.set_pick_up_current(self.mount, self.saved) {
            tracing::error!(mount = %self.mount, error = %e, "failed to restore pick-up current");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcal_deck::{LabwareLibrary, TrashKind};
    use pcal_hardware::{ArcPlanner, FaultPoint, HardwareEvent, SimulatedHardware};

    fn coordinator(hw: &SimulatedHardware, mount: Mount, channels: u8) -> MotionCoordinator {
        MotionCoordinator::new(
            Arc::new(hw.clone()),
            Arc::new(ArcPlanner::default()),
            mount,
            channels,
        )
    }

    #[tokio::test]
    async fn test_move_follows_arc() {
        let hw = SimulatedHardware::new()
            .with_pipette(Mount::Right, "p300_single_v2.0", "P3H")
            .unwrap();
        let deck = Deck::new(TrashKind::Standard).unwrap();
        let target = Point::new(100.0, 100.0, 20.0);
        coordinator(&hw, Mount::Right, 1)
            .move_to(&deck, target, None)
            .await
            .unwrap();
        let events = hw.events();
        assert_eq!(events.len(), 2, "traverse at home height, then descend");
        assert_eq!(
            events.last(),
            Some(&HardwareEvent::MoveTo {
                mount: Mount::Right,
                target,
                critical_point: None
            })
        );
        assert_eq!(hw.gantry_position(Mount::Right, None).await.unwrap(), target);
    }

    #[tokio::test]
    async fn test_multichannel_moves_use_front_nozzle() {
        let hw = SimulatedHardware::new()
            .with_pipette(Mount::Left, "p20_multi_v2.0", "P20M")
            .unwrap();
        let deck = Deck::new(TrashKind::Standard).unwrap();
        coordinator(&hw, Mount::Left, 8)
            .move_to(&deck, Point::new(50.0, 50.0, 10.0), None)
            .await
            .unwrap();
        assert!(matches!(
            hw.events().last(),
            Some(HardwareEvent::MoveTo {
                critical_point: Some(CriticalPoint::FrontNozzle),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_pick_up_current_restored() {
        let hw = SimulatedHardware::new()
            .with_pipette(Mount::Left, "p20_multi_v2.0", "P20M")
            .unwrap();
        let coord = coordinator(&hw, Mount::Left, 8);
        coord.pick_up_tip(30.0).await.unwrap();
        assert_eq!(
            hw.events(),
            vec![HardwareEvent::PickUpTip {
                mount: Mount::Left,
                tip_length: 30.0,
                current: MULTI_CHANNEL_PICK_UP_CURRENT
            }]
        );
        assert_eq!(hw.pick_up_current(Mount::Left).unwrap(), 0.6);
    }

    #[tokio::test]
    async fn test_pick_up_current_restored_on_fault() {
        let hw = SimulatedHardware::new()
            .with_pipette(Mount::Left, "p20_multi_v2.0", "P20M")
            .unwrap();
        hw.fail_next(FaultPoint::PickUpTip, "tip not detected");
        let err = coordinator(&hw, Mount::Left, 8).pick_up_tip(30.0).await;
        assert!(err.is_err());
        assert_eq!(hw.pick_up_current(Mount::Left).unwrap(), 0.6);
    }

    #[tokio::test]
    async fn test_single_channel_keeps_current() {
        let hw = SimulatedHardware::new()
            .with_pipette(Mount::Right, "p300_single_v2.0", "P3H")
            .unwrap();
        coordinator(&hw, Mount::Right, 1).pick_up_tip(51.1).await.unwrap();
        assert_eq!(
            hw.events(),
            vec![HardwareEvent::PickUpTip {
                mount: Mount::Right,
                tip_length: 51.1,
                current: 0.125
            }]
        );
    }

    #[tokio::test]
    async fn test_return_tip_depth() {
        let hw = SimulatedHardware::new()
            .with_pipette(Mount::Right, "p300_single_v2.0", "P3H")
            .unwrap();
        let coord = coordinator(&hw, Mount::Right, 1);
        let origin = Point::new(10.0, 20.0, 100.0);
        coord.return_tip(origin, 50.0, 0.5).await.unwrap();
        assert_eq!(
            hw.events(),
            vec![
                HardwareEvent::MoveTo {
                    mount: Mount::Right,
                    target: Point::new(10.0, 20.0, 75.0),
                    critical_point: None
                },
                HardwareEvent::DropTip { mount: Mount::Right },
            ]
        );
    }

    #[test]
    fn test_reference_location_on_trash() {
        let deck = Deck::new(TrashKind::Standard).unwrap();
        let trash_top = deck.trash().unwrap().well("A1").unwrap().top();
        let reference = MotionCoordinator::reference_location(&deck, None).unwrap();
        assert!(reference.approx_eq(
            &(trash_top + Point::new(-57.84, -55.0, 5.0)),
            1e-9
        ));
    }

    #[test]
    fn test_reference_location_on_block() {
        let mut deck = Deck::new(TrashKind::Standard).unwrap();
        let block = LabwareLibrary::bundled()
            .unwrap()
            .load("opentrons_calibrationblock_short_side_right")
            .unwrap();
        let lw = deck.position_labware(block, "1").unwrap();
        deck.set("1", lw).unwrap();
        let well = deck.get("1").unwrap().well("A1").unwrap();
        let reference = MotionCoordinator::reference_location(&deck, Some(&well)).unwrap();
        assert_eq!(reference, well.top() + Point::new(0.0, 0.0, 5.0));
    }
}
