//! # pcal-store — Calibration Record Persistence
//!
//! Calibration results outlive the session that measured them. This crate
//! defines the two record types, the [`CalibrationStore`] interface the
//! session persists through, and two implementations:
//!
//! - [`MemoryCalibrationStore`]: records in process memory, shared between
//!   clones. Used by tests and short-lived tooling.
//! - [`FileCalibrationStore`]: one JSON document per record under a
//!   calibration directory.
//!
//! Offset records are keyed by `(pipette id, mount)`. Tip-length records
//! are keyed by `(pipette id, tip-rack content hash)`; a missing tip-length
//! record is reported as [`StoreError::NotFound`] rather than `None`.

pub mod error;
pub mod file;
pub mod memory;
pub mod record;
pub mod store;

pub use error::StoreError;
pub use file::FileCalibrationStore;
pub use memory::MemoryCalibrationStore;
pub use record::{PipetteOffsetRecord, TipLengthRecord};
pub use store::CalibrationStore;
