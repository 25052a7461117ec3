//! # pcal-hardware — Gantry and Motion Collaborators
//!
//! The calibration engine never drives motors directly. It talks to two
//! collaborators defined here:
//!
//! - **`HardwareController`** (`controller.rs`): async gantry interface.
//!   Motion, tip handling, homing, and instrument configuration.
//! - **`MotionPlanner`** (`planner.rs`): pure path planning. Computes a safe
//!   traversal height and the waypoints of an arc move.
//!
//! Alongside the interfaces:
//!
//! - **Pipette models** (`pipette.rs`): the bundled per-model configuration
//!   table and the `PipetteDescriptor` a controller reports for an attached
//!   instrument.
//! - **`ArcPlanner`**: rise, traverse, descend.
//! - **`SimulatedHardware`** (`simulator.rs`): in-memory controller with an
//!   event log and one-shot fault injection.
//!
//! ## Crate Policy
//!
//! - Every collaborator error is a [`HardwareError`]. Callers propagate it
//!   unchanged.
//! - Configuration setters are synchronous and never move the gantry.

pub mod controller;
pub mod error;
pub mod pipette;
pub mod planner;
pub mod simulator;

pub use controller::HardwareController;
pub use error::HardwareError;
pub use pipette::{PipetteDescriptor, PipetteModelConfig};
pub use planner::{ArcPlanner, MotionPlanner, Waypoint, DEFAULT_ARC_MARGIN};
pub use simulator::{FaultPoint, HardwareEvent, SimulatedHardware, HOME_POSITION, Z_MAX};
