//! # Simulated Gantry
//!
//! An in-memory [`HardwareController`] that tracks instrument state per
//! mount and records every motion and tip operation as a [`HardwareEvent`].
//! Used by the CLI `run` command and by the session test-suite.
//!
//! Critical points are resolved against the nozzle position: the tip
//! critical point sits one tip length below it, and multi-channel
//! instruments shift the XY-center and front-nozzle points along Y.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use pcal_core::{CriticalPoint, Mount, PipetteId, Point};

use crate::controller::HardwareController;
use crate::error::HardwareError;
use crate::pipette::PipetteDescriptor;

/// Nozzle position after homing.
pub const HOME_POSITION: Point = Point::new(418.0, 353.0, 218.0);

/// Nozzle height at the top of Z travel.
pub const Z_MAX: f64 = 218.0;

/// Slack on the Z limit for targets computed as `Z_MAX - offset + offset`.
const Z_TOLERANCE: f64 = 1e-6;

/// Y distance from the back nozzle to the centre of an 8-channel head.
const MULTI_CENTER_OFFSET_Y: f64 = -31.5;

/// Y distance from the back nozzle to the front nozzle of an 8-channel head.
const MULTI_FRONT_OFFSET_Y: f64 = -63.0;

/// One recorded hardware operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HardwareEvent {
    MoveTo {
        mount: Mount,
        target: Point,
        critical_point: Option<CriticalPoint>,
    },
    MoveRel {
        mount: Mount,
        delta: Point,
    },
    PickUpTip {
        mount: Mount,
        tip_length: f64,
        current: f64,
    },
    DropTip {
        mount: Mount,
    },
    Home {
        mount: Option<Mount>,
    },
    Retract {
        mount: Mount,
        margin: f64,
    },
    ResetInstrument {
        mount: Mount,
    },
}

/// Operation names accepted by [`SimulatedHardware::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    MoveTo,
    MoveRel,
    PickUpTip,
    DropTip,
    Home,
    Retract,
}

impl FaultPoint {
    fn as_str(&self) -> &'static str {
        match self {
            Self::MoveTo => "move_to",
            Self::MoveRel => "move_rel",
            Self::PickUpTip => "pick_up_tip",
            Self::DropTip => "drop_tip",
            Self::Home => "home",
            Self::Retract => "retract",
        }
    }
}

#[derive(Debug, Default)]
struct State {
    pipettes: HashMap<Mount, PipetteDescriptor>,
    nozzles: HashMap<Mount, Point>,
    events: Vec<HardwareEvent>,
    faults: HashMap<FaultPoint, String>,
}

impl State {
    fn nozzle(&self, mount: Mount) -> Point {
        self.nozzles.get(&mount).copied().unwrap_or(HOME_POSITION)
    }

    fn pipette_mut(&mut self, mount: Mount) -> Result<&mut PipetteDescriptor, HardwareError> {
        self.pipettes
            .get_mut(&mount)
            .ok_or(HardwareError::NoPipette { mount })
    }

    fn take_fault(&mut self, point: FaultPoint) -> Result<(), HardwareError> {
        match self.faults.remove(&point) {
            Some(reason) => Err(HardwareError::Fault {
                operation: point.as_str().to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Offset from the nozzle to `cp` for the instrument on `mount`.
    fn cp_offset(&self, mount: Mount, cp: Option<CriticalPoint>) -> Point {
        let Some(pipette) = self.pipettes.get(&mount) else {
            return Point::ZERO;
        };
        let tip_drop = if pipette.has_tip {
            pipette
                .current_tip_length
                .unwrap_or(pipette.config_tip_length)
        } else {
            0.0
        };
        let multi = pipette.is_multichannel();
        match cp {
            Some(CriticalPoint::Nozzle) => Point::ZERO,
            None | Some(CriticalPoint::Tip) => Point::new(0.0, 0.0, -tip_drop),
            Some(CriticalPoint::XyCenter) if multi => {
                Point::new(0.0, MULTI_CENTER_OFFSET_Y, -tip_drop)
            }
            Some(CriticalPoint::FrontNozzle) if multi => {
                Point::new(0.0, MULTI_FRONT_OFFSET_Y, -tip_drop)
            }
            Some(CriticalPoint::XyCenter) | Some(CriticalPoint::FrontNozzle) => {
                Point::new(0.0, 0.0, -tip_drop)
            }
        }
    }
}

/// A gantry that exists only in memory.
///
/// Cheaply cloneable; all clones share the same state, so a test can keep a
/// handle to inspect the event log after handing one to a session.
#[derive(Debug, Clone, Default)]
pub struct SimulatedHardware {
    state: Arc<Mutex<State>>,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a pipette of `model` with serial `serial` to `mount`.
    pub fn with_pipette(
        self,
        mount: Mount,
        model: &str,
        serial: &str,
    ) -> Result<Self, HardwareError> {
        let descriptor = PipetteDescriptor::from_model(model, PipetteId::new(serial), mount)?;
        self.state.lock().pipettes.insert(mount, descriptor);
        Ok(self)
    }

    /// Everything recorded since construction or the last [`clear_events`](Self::clear_events).
    pub fn events(&self) -> Vec<HardwareEvent> {
        self.state.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Make the next call to `point` fail with `reason`.
    pub fn fail_next(&self, point: FaultPoint, reason: impl Into<String>) {
        self.state.lock().faults.insert(point, reason.into());
    }

    /// Place the nozzle of `mount` directly, bypassing the event log.
    pub fn set_nozzle_position(&self, mount: Mount, position: Point) {
        self.state.lock().nozzles.insert(mount, position);
    }

    pub fn nozzle_position(&self, mount: Mount) -> Point {
        self.state.lock().nozzle(mount)
    }
}

#[async_trait]
impl HardwareController for SimulatedHardware {
    async fn attached_pipette(
        &self,
        mount: Mount,
    ) -> Result<Option<PipetteDescriptor>, HardwareError> {
        Ok(self.state.lock().pipettes.get(&mount).cloned())
    }

    async fn gantry_position(
        &self,
        mount: Mount,
        critical_point: Option<CriticalPoint>,
    ) -> Result<Point, HardwareError> {
        let state = self.state.lock();
        Ok(state.nozzle(mount) + state.cp_offset(mount, critical_point))
    }

    async fn refresh_position(&self, _mount: Mount) -> Result<(), HardwareError> {
        Ok(())
    }

    async fn move_to(
        &self,
        mount: Mount,
        target: Point,
        critical_point: Option<CriticalPoint>,
    ) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::MoveTo)?;
        let nozzle = target - state.cp_offset(mount, critical_point);
        if nozzle.z > Z_MAX + Z_TOLERANCE {
            return Err(HardwareError::OutOfBounds { mount, target });
        }
        tracing::trace!(%mount, %target, "simulated move_to");
        state.nozzles.insert(mount, nozzle);
        state.events.push(HardwareEvent::MoveTo {
            mount,
            target,
            critical_point,
        });
        Ok(())
    }

    async fn move_rel(&self, mount: Mount, delta: Point) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::MoveRel)?;
        let nozzle = state.nozzle(mount) + delta;
        if nozzle.z > Z_MAX + Z_TOLERANCE {
            return Err(HardwareError::OutOfBounds {
                mount,
                target: nozzle,
            });
        }
        state.nozzles.insert(mount, nozzle);
        state.events.push(HardwareEvent::MoveRel { mount, delta });
        Ok(())
    }

    async fn pick_up_tip(&self, mount: Mount, tip_length: f64) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::PickUpTip)?;
        let pipette = state.pipette_mut(mount)?;
        if pipette.has_tip {
            return Err(HardwareError::TipAlreadyAttached { mount });
        }
        pipette.has_tip = true;
        pipette.current_tip_length = Some(tip_length);
        let current = pipette.pick_up_current;
        state.events.push(HardwareEvent::PickUpTip {
            mount,
            tip_length,
            current,
        });
        Ok(())
    }

    async fn drop_tip(&self, mount: Mount) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::DropTip)?;
        let pipette = state.pipette_mut(mount)?;
        pipette.has_tip = false;
        state.events.push(HardwareEvent::DropTip { mount });
        Ok(())
    }

    async fn home(&self, mount: Option<Mount>) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::Home)?;
        match mount {
            Some(m) => {
                state.nozzles.insert(m, HOME_POSITION);
            }
            None => {
                state.nozzles.insert(Mount::Left, HOME_POSITION);
                state.nozzles.insert(Mount::Right, HOME_POSITION);
            }
        }
        state.events.push(HardwareEvent::Home { mount });
        Ok(())
    }

    async fn retract(&self, mount: Mount, margin: f64) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::Retract)?;
        let nozzle = state.nozzle(mount).with_z(Z_MAX - margin);
        state.nozzles.insert(mount, nozzle);
        state.events.push(HardwareEvent::Retract { mount, margin });
        Ok(())
    }

    async fn reset_instrument(&self, mount: Mount) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        if let Some(pipette) = state.pipettes.get_mut(&mount) {
            let fresh = PipetteDescriptor::from_model(
                &pipette.model,
                pipette.pipette_id.clone(),
                mount,
            )?;
            // Tip presence is physical, not configuration.
            let has_tip = pipette.has_tip;
            *pipette = PipetteDescriptor { has_tip, ..fresh };
        }
        state.events.push(HardwareEvent::ResetInstrument { mount });
        Ok(())
    }

    async fn instrument_max_height(
        &self,
        mount: Mount,
        critical_point: Option<CriticalPoint>,
    ) -> Result<f64, HardwareError> {
        let state = self.state.lock();
        Ok(Z_MAX + state.cp_offset(mount, critical_point).z)
    }

    fn pick_up_current(&self, mount: Mount) -> Result<f64, HardwareError> {
        let mut state = self.state.lock();
        Ok(state.pipette_mut(mount)?.pick_up_current)
    }

    fn set_pick_up_current(&self, mount: Mount, amps: f64) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        state.pipette_mut(mount)?.pick_up_current = amps;
        Ok(())
    }

    fn set_current_tip_length(&self, mount: Mount, tip_length: f64) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        state.pipette_mut(mount)?.current_tip_length = Some(tip_length);
        Ok(())
    }

    fn set_pipette_offset(&self, mount: Mount, offset: Point) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        state.pipette_mut(mount)?.pipette_offset = offset;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single() -> SimulatedHardware {
        SimulatedHardware::new()
            .with_pipette(Mount::Right, "p300_single_v2.0", "P3HSV2020041502")
            .unwrap()
    }

    fn multi() -> SimulatedHardware {
        SimulatedHardware::new()
            .with_pipette(Mount::Left, "p20_multi_v2.0", "P20MV2020052201")
            .unwrap()
    }

    // ── Positions and critical points ─────────────────────────────────

    #[tokio::test]
    async fn test_starts_at_home() {
        let hw = single();
        let pos = hw.gantry_position(Mount::Right, None).await.unwrap();
        assert_eq!(pos, HOME_POSITION);
    }

    #[tokio::test]
    async fn test_tip_critical_point_tracks_tip_length() {
        let hw = single();
        hw.pick_up_tip(Mount::Right, 50.0).await.unwrap();
        let noz = hw
            .gantry_position(Mount::Right, Some(CriticalPoint::Nozzle))
            .await
            .unwrap();
        let tip = hw
            .gantry_position(Mount::Right, Some(CriticalPoint::Tip))
            .await
            .unwrap();
        assert!((noz.z - tip.z - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_move_to_places_critical_point() {
        let hw = single();
        hw.pick_up_tip(Mount::Right, 50.0).await.unwrap();
        let target = Point::new(100.0, 100.0, 20.0);
        hw.move_to(Mount::Right, target, None).await.unwrap();
        assert_eq!(hw.gantry_position(Mount::Right, None).await.unwrap(), target);
        assert_eq!(hw.nozzle_position(Mount::Right), Point::new(100.0, 100.0, 70.0));
    }

    #[tokio::test]
    async fn test_multichannel_front_nozzle_offset() {
        let hw = multi();
        hw.set_nozzle_position(Mount::Left, Point::new(50.0, 100.0, 80.0));
        let front = hw
            .gantry_position(Mount::Left, Some(CriticalPoint::FrontNozzle))
            .await
            .unwrap();
        assert_eq!(front, Point::new(50.0, 37.0, 80.0));
        let center = hw
            .gantry_position(Mount::Left, Some(CriticalPoint::XyCenter))
            .await
            .unwrap();
        assert_eq!(center, Point::new(50.0, 68.5, 80.0));
    }

    #[tokio::test]
    async fn test_move_above_reach_rejected() {
        let hw = single();
        let err = hw
            .move_to(Mount::Right, Point::new(0.0, 0.0, 500.0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, HardwareError::OutOfBounds { .. }));
        assert!(hw.events().is_empty());
    }

    // ── Tips and instrument configuration ─────────────────────────────

    #[tokio::test]
    async fn test_double_pick_up_rejected() {
        let hw = single();
        hw.pick_up_tip(Mount::Right, 50.0).await.unwrap();
        assert_eq!(
            hw.pick_up_tip(Mount::Right, 50.0).await,
            Err(HardwareError::TipAlreadyAttached { mount: Mount::Right })
        );
    }

    #[tokio::test]
    async fn test_pick_up_records_current() {
        let hw = multi();
        hw.set_pick_up_current(Mount::Left, 0.1).unwrap();
        hw.pick_up_tip(Mount::Left, 30.0).await.unwrap();
        assert_eq!(
            hw.events(),
            vec![HardwareEvent::PickUpTip {
                mount: Mount::Left,
                tip_length: 30.0,
                current: 0.1
            }]
        );
    }

    #[tokio::test]
    async fn test_no_pipette() {
        let hw = single();
        assert_eq!(
            hw.pick_up_tip(Mount::Left, 50.0).await,
            Err(HardwareError::NoPipette { mount: Mount::Left })
        );
        assert!(hw.attached_pipette(Mount::Left).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_restores_model_configuration() {
        let hw = single();
        hw.set_pick_up_current(Mount::Right, 0.9).unwrap();
        hw.set_pipette_offset(Mount::Right, Point::new(1.0, 2.0, 3.0))
            .unwrap();
        hw.pick_up_tip(Mount::Right, 40.0).await.unwrap();
        hw.reset_instrument(Mount::Right).await.unwrap();
        let p = hw.attached_pipette(Mount::Right).await.unwrap().unwrap();
        assert_eq!(p.pick_up_current, 0.125);
        assert_eq!(p.pipette_offset, Point::ZERO);
        assert_eq!(p.current_tip_length, None);
        assert!(p.has_tip);
    }

    // ── Motion and faults ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_retract_and_home() {
        let hw = single();
        hw.set_nozzle_position(Mount::Right, Point::new(10.0, 10.0, 10.0));
        hw.retract(Mount::Right, 20.0).await.unwrap();
        assert_eq!(hw.nozzle_position(Mount::Right), Point::new(10.0, 10.0, 198.0));
        hw.home(None).await.unwrap();
        assert_eq!(hw.nozzle_position(Mount::Right), HOME_POSITION);
    }

    #[tokio::test]
    async fn test_fault_fires_once() {
        let hw = single();
        hw.fail_next(FaultPoint::Home, "limit switch");
        let err = hw.home(None).await.unwrap_err();
        assert_eq!(
            err,
            HardwareError::Fault {
                operation: "home".into(),
                reason: "limit switch".into()
            }
        );
        hw.home(None).await.unwrap();
        assert_eq!(hw.events(), vec![HardwareEvent::Home { mount: None }]);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let hw = single();
        let handle = hw.clone();
        hw.move_rel(Mount::Right, Point::new(0.0, 0.0, -10.0))
            .await
            .unwrap();
        assert_eq!(handle.events().len(), 1);
        handle.clear_events();
        assert!(hw.events().is_empty());
    }
}
