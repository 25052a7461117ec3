//! # pcal-session — Pipette Calibration Sessions
//!
//! Runs the interactive pipette-offset calibration workflow, optionally
//! preceded by tip-length calibration, against a hardware controller and a
//! calibration store.
//!
//! ## Components
//!
//! - **`CalibrationSession`** (`session.rs`): owns the deck, the workflow
//!   state and the transient captures of one session. Single mutating entry
//!   point: [`CalibrationSession::handle_command`].
//!
//! - **`MotionCoordinator`** (`motion.rs`): planned arc moves, tip pick-up
//!   under a scoped current override, tip return, and the static height
//!   reference.
//!
//! - **`CalibrationCommand`** (`command.rs`): typed commands parsed from a
//!   wire name and JSON payload.
//!
//! - **`SessionError`** / **`ErrorClass`** (`error.rs`): every session fault
//!   and how a caller should treat it.
//!
//! - **`CalibrationConfig`** (`config.rs`): robot-wide settings from
//!   defaults, environment, or YAML.
//!
//! ## Crate Policy
//!
//! - Commands are processed one at a time; `handle_command` takes
//!   `&mut self`.
//! - A handler finishes all of its checks before its first hardware call.
//!   A failed command never commits a state change.
//! - Hardware and store faults are propagated unchanged inside
//!   [`SessionError`].

pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod motion;
pub mod session;

pub use command::CalibrationCommand;
pub use config::{CalibrationConfig, ConfigError, DEFAULT_CALIBRATION_DIR};
pub use error::{ErrorClass, SessionError};
pub use motion::MotionCoordinator;
pub use session::{AttachedPipette, CalibrationSession, RequiredLabware, SessionParams};
