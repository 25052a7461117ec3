//! # Hardware Controller Interface
//!
//! The gantry as the calibration engine sees it. Every motion and tip
//! operation suspends until the device confirms completion. Implementations
//! own their timeouts.
//!
//! Instrument configuration setters (`set_pick_up_current`,
//! `set_current_tip_length`, `set_pipette_offset`) are synchronous: they
//! update cached configuration and issue no motion, so they can run from a
//! `Drop` guard.

use async_trait::async_trait;

use pcal_core::{CriticalPoint, Mount, Point};

use crate::error::HardwareError;
use crate::pipette::PipetteDescriptor;

#[async_trait]
pub trait HardwareController: Send + Sync {
    /// The pipette on `mount`, with its live instrument state.
    async fn attached_pipette(
        &self,
        mount: Mount,
    ) -> Result<Option<PipetteDescriptor>, HardwareError>;

    /// Where the chosen critical point of `mount`'s instrument is.
    /// `None` selects the instrument's default critical point.
    async fn gantry_position(
        &self,
        mount: Mount,
        critical_point: Option<CriticalPoint>,
    ) -> Result<Point, HardwareError>;

    /// Re-read the gantry position from the motor encoders.
    async fn refresh_position(&self, mount: Mount) -> Result<(), HardwareError>;

    /// Absolute move placing `critical_point` at `target`.
    async fn move_to(
        &self,
        mount: Mount,
        target: Point,
        critical_point: Option<CriticalPoint>,
    ) -> Result<(), HardwareError>;

    /// Relative move by `delta`.
    async fn move_rel(&self, mount: Mount, delta: Point) -> Result<(), HardwareError>;

    /// Press onto a tip, registering `tip_length` as attached.
    async fn pick_up_tip(&self, mount: Mount, tip_length: f64) -> Result<(), HardwareError>;

    /// Eject whatever tip is attached. No-op motion-wise when none is.
    async fn drop_tip(&self, mount: Mount) -> Result<(), HardwareError>;

    /// Home one mount, or every axis when `None`.
    async fn home(&self, mount: Option<Mount>) -> Result<(), HardwareError>;

    /// Raise `mount` to `margin` mm below its homed height.
    async fn retract(&self, mount: Mount, margin: f64) -> Result<(), HardwareError>;

    /// Discard cached instrument configuration for `mount`.
    async fn reset_instrument(&self, mount: Mount) -> Result<(), HardwareError>;

    /// Highest reachable height of `critical_point` on `mount`.
    async fn instrument_max_height(
        &self,
        mount: Mount,
        critical_point: Option<CriticalPoint>,
    ) -> Result<f64, HardwareError>;

    /// Pick-up current currently configured for `mount`.
    fn pick_up_current(&self, mount: Mount) -> Result<f64, HardwareError>;

    fn set_pick_up_current(&self, mount: Mount, amps: f64) -> Result<(), HardwareError>;

    /// Override the tip length the instrument uses for tip critical points.
    fn set_current_tip_length(&self, mount: Mount, tip_length: f64) -> Result<(), HardwareError>;

    /// Apply a calibrated pipette offset to the instrument.
    fn set_pipette_offset(&self, mount: Mount, offset: Point) -> Result<(), HardwareError>;
}
