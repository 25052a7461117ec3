//! # pcal-schema — Labware Definition Validation
//!
//! Labware definitions arrive from outside the engine: bundled with the
//! crate, uploaded alongside a calibration request, or read from disk by
//! the CLI. Every one of them passes through [`SchemaValidator`] before
//! its geometry is trusted for gantry moves.
//!
//! The bundled `labware-definition.schema.json` (Draft 7) is embedded at
//! compile time. Additional schemas can be loaded from a directory.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pcal-*` crates.
//! - Schema resolution never touches the network.
//! - Invalid documents are rejected with the instance path, schema path,
//!   and message of every violation.

pub mod validate;

pub use validate::{
    SchemaValidationError, SchemaValidator, ValidationViolations, Violation,
    LABWARE_DEFINITION_SCHEMA,
};
