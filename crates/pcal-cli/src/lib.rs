//! # pcal-cli — Pipette Calibration Command-Line Interface
//!
//! ## Subcommands
//!
//! - `run`: drive a calibration session on the simulated robot from a
//!   YAML command script
//! - `validate-labware`: check labware definitions against the bundled
//!   schema and print their URI and content hash
//! - `graph`: list the transitions of a workflow graph
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to the domain crates and report failures through
//!   `anyhow`; the library crates never see `anyhow` types.

pub mod graph;
pub mod labware;
pub mod run;
