//! Errors raised by hardware collaborators.

use thiserror::Error;

use pcal_core::{Mount, Point};

/// A gantry, instrument, or planning fault.
///
/// The calibration engine propagates these unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    /// No instrument is attached to the mount.
    #[error("no pipette attached on {mount} mount")]
    NoPipette {
        /// The mount queried.
        mount: Mount,
    },

    /// A pipette model is not in the configuration table.
    #[error("unknown pipette model {0:?}")]
    UnknownModel(String),

    /// The pipette model table could not be parsed.
    #[error("pipette model table is invalid: {0}")]
    ModelTable(String),

    /// A tip pick-up was requested while a tip is attached.
    #[error("{mount} pipette already has a tip attached")]
    TipAlreadyAttached {
        /// The mount.
        mount: Mount,
    },

    /// A move target lies outside the gantry's reachable volume.
    #[error("{mount} mount cannot reach {target}")]
    OutOfBounds {
        /// The mount.
        mount: Mount,
        /// The requested target.
        target: Point,
    },

    /// The motion planner could not produce a path.
    #[error("motion planning failed: {0}")]
    Planning(String),

    /// The device reported a failure.
    #[error("{operation} failed: {reason}")]
    Fault {
        /// The operation that failed.
        operation: String,
        /// Device-reported reason.
        reason: String,
    },
}
