//! # pcal-state — Calibration Workflow State Machines
//!
//! A calibration session moves through a closed set of named states in
//! response to a closed set of commands. This crate holds the pure part of
//! that: the transition tables and the lookup over them. Nothing here
//! performs I/O or touches hardware.
//!
//! ## Components
//!
//! - **`StateMachine`** (`machine.rs`): generic over state and command
//!   types. A table maps `(from, command) → to`, plus one reserved wildcard
//!   source that matches every state. Wildcard entries take precedence over
//!   state-specific ones.
//!
//! - **`CommandKind`** (`command.rs`): the twelve commands a session accepts,
//!   with their wire names.
//!
//! - **Graphs** (`graph.rs`): `OffsetState` for pipette-offset-only
//!   calibration and `TipLengthOffsetState` for tip-length followed by
//!   pipette-offset calibration. Each has one shared, validated
//!   `StateMachine`. `CalibrationGraph` and `WorkflowState` put the two
//!   disjoint state enums behind one interface.
//!
//! ## Design
//!
//! The two graphs use distinct state types. A session started on the
//! offset-only graph cannot be placed in `measuringTipOffset`; there is no
//! such `OffsetState`.

pub mod command;
pub mod graph;
pub mod machine;

pub use command::{CommandKind, UnknownCommand};
pub use graph::{
    CalibrationGraph, GraphKind, OffsetState, TipLengthOffsetState, WorkflowState,
};
pub use machine::{FromState, GraphError, StateMachine, Transition};
