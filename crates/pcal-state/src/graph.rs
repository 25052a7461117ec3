//! # Calibration Graphs
//!
//! Two workflows share one command set but not one state set.
//!
//! ## Pipette offset only
//!
//! ```text
//! sessionStarted ─loadLabware─▶ labwareLoaded ─moveToTipRack─▶ preparingPipette
//!                                                                │ pickUpTip
//!                                    invalidateTip ◀── inspectingTip
//!                                                                │ moveToDeck
//!   calibrationComplete ◀─saveOffset─ savingPointOne ◀─moveToPointOne─ joggingToDeck
//! ```
//!
//! ## Tip length, then pipette offset
//!
//! ```text
//! labwareLoaded ─moveToReferencePoint─▶ measuringNozzleOffset ─saveOffset─▶ (self)
//!                                              │ moveToTipRack
//!                                       preparingPipette ─pickUpTip─▶ inspectingTip
//!                                                                       │ moveToReferencePoint
//!   tipLengthComplete ◀─saveOffset─ measuringTipOffset ◀────────────────┘
//!        │ moveToDeck
//!   joggingToDeck ─▶ savingPointOne ─▶ calibrationComplete
//! ```
//!
//! In both graphs `exit` leads to `sessionExited` and `invalidateLastAction`
//! leads to `preparingPipette` from every state.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::command::CommandKind;
use crate::machine::{GraphError, StateMachine, Transition};

// ─── Offset-Only States ──────────────────────────────────────────────

/// States of the pipette-offset-only workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OffsetState {
    SessionStarted,
    LabwareLoaded,
    PreparingPipette,
    InspectingTip,
    JoggingToDeck,
    SavingPointOne,
    CalibrationComplete,
    SessionExited,
}

impl OffsetState {
    pub const ALL: [OffsetState; 8] = [
        Self::SessionStarted,
        Self::LabwareLoaded,
        Self::PreparingPipette,
        Self::InspectingTip,
        Self::JoggingToDeck,
        Self::SavingPointOne,
        Self::CalibrationComplete,
        Self::SessionExited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStarted => "sessionStarted",
            Self::LabwareLoaded => "labwareLoaded",
            Self::PreparingPipette => "preparingPipette",
            Self::InspectingTip => "inspectingTip",
            Self::JoggingToDeck => "joggingToDeck",
            Self::SavingPointOne => "savingPointOne",
            Self::CalibrationComplete => "calibrationComplete",
            Self::SessionExited => "sessionExited",
        }
    }

    /// The shared offset-only machine.
    pub fn machine() -> Result<&'static StateMachine<OffsetState, CommandKind>, GraphError> {
        static MACHINE: OnceLock<Result<StateMachine<OffsetState, CommandKind>, GraphError>> =
            OnceLock::new();
        MACHINE
            .get_or_init(|| StateMachine::new(&Self::ALL, &offset_transitions()))
            .as_ref()
            .map_err(Clone::clone)
    }
}

impl std::fmt::Display for OffsetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn offset_transitions() -> [Transition<OffsetState, CommandKind>; 16] {
    use CommandKind::*;
    use OffsetState::*;
    [
        Transition::on(SessionStarted, LoadLabware, LabwareLoaded),
        Transition::on(SessionStarted, SetHasCalibrationBlock, SessionStarted),
        Transition::on(LabwareLoaded, MoveToTipRack, PreparingPipette),
        Transition::on(LabwareLoaded, SetHasCalibrationBlock, LabwareLoaded),
        Transition::on(PreparingPipette, Jog, PreparingPipette),
        Transition::on(PreparingPipette, MoveToTipRack, PreparingPipette),
        Transition::on(PreparingPipette, PickUpTip, InspectingTip),
        Transition::on(InspectingTip, InvalidateTip, PreparingPipette),
        Transition::on(InspectingTip, MoveToDeck, JoggingToDeck),
        Transition::on(JoggingToDeck, Jog, JoggingToDeck),
        Transition::on(JoggingToDeck, SaveOffset, JoggingToDeck),
        Transition::on(JoggingToDeck, MoveToPointOne, SavingPointOne),
        Transition::on(SavingPointOne, Jog, SavingPointOne),
        Transition::on(SavingPointOne, SaveOffset, CalibrationComplete),
        Transition::any(Exit, SessionExited),
        Transition::any(InvalidateLastAction, PreparingPipette),
    ]
}

// ─── Tip-Length + Offset States ──────────────────────────────────────

/// States of the combined tip-length and pipette-offset workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TipLengthOffsetState {
    SessionStarted,
    LabwareLoaded,
    MeasuringNozzleOffset,
    PreparingPipette,
    InspectingTip,
    MeasuringTipOffset,
    TipLengthComplete,
    JoggingToDeck,
    SavingPointOne,
    CalibrationComplete,
    SessionExited,
}

impl TipLengthOffsetState {
    pub const ALL: [TipLengthOffsetState; 11] = [
        Self::SessionStarted,
        Self::LabwareLoaded,
        Self::MeasuringNozzleOffset,
        Self::PreparingPipette,
        Self::InspectingTip,
        Self::MeasuringTipOffset,
        Self::TipLengthComplete,
        Self::JoggingToDeck,
        Self::SavingPointOne,
        Self::CalibrationComplete,
        Self::SessionExited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStarted => "sessionStarted",
            Self::LabwareLoaded => "labwareLoaded",
            Self::MeasuringNozzleOffset => "measuringNozzleOffset",
            Self::PreparingPipette => "preparingPipette",
            Self::InspectingTip => "inspectingTip",
            Self::MeasuringTipOffset => "measuringTipOffset",
            Self::TipLengthComplete => "tipLengthComplete",
            Self::JoggingToDeck => "joggingToDeck",
            Self::SavingPointOne => "savingPointOne",
            Self::CalibrationComplete => "calibrationComplete",
            Self::SessionExited => "sessionExited",
        }
    }

    /// The shared tip-length + offset machine.
    pub fn machine(
    ) -> Result<&'static StateMachine<TipLengthOffsetState, CommandKind>, GraphError> {
        static MACHINE: OnceLock<
            Result<StateMachine<TipLengthOffsetState, CommandKind>, GraphError>,
        > = OnceLock::new();
        MACHINE
            .get_or_init(|| StateMachine::new(&Self::ALL, &tip_length_offset_transitions()))
            .as_ref()
            .map_err(Clone::clone)
    }
}

impl std::fmt::Display for TipLengthOffsetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn tip_length_offset_transitions() -> [Transition<TipLengthOffsetState, CommandKind>; 26] {
    use CommandKind::*;
    use TipLengthOffsetState::*;
    [
        Transition::on(SessionStarted, LoadLabware, LabwareLoaded),
        Transition::on(SessionStarted, SetHasCalibrationBlock, SessionStarted),
        Transition::on(LabwareLoaded, MoveToReferencePoint, MeasuringNozzleOffset),
        Transition::on(LabwareLoaded, MoveToTipRack, PreparingPipette),
        Transition::on(LabwareLoaded, SetHasCalibrationBlock, LabwareLoaded),
        Transition::on(MeasuringNozzleOffset, Jog, MeasuringNozzleOffset),
        Transition::on(MeasuringNozzleOffset, SaveOffset, MeasuringNozzleOffset),
        Transition::on(MeasuringNozzleOffset, MoveToTipRack, PreparingPipette),
        // Unreachable: the wildcard entry below wins.
        Transition::on(MeasuringNozzleOffset, InvalidateLastAction, MeasuringNozzleOffset),
        Transition::on(PreparingPipette, Jog, PreparingPipette),
        Transition::on(PreparingPipette, MoveToTipRack, PreparingPipette),
        Transition::on(PreparingPipette, PickUpTip, InspectingTip),
        Transition::on(InspectingTip, InvalidateTip, PreparingPipette),
        Transition::on(InspectingTip, MoveToReferencePoint, MeasuringTipOffset),
        Transition::on(InspectingTip, MoveToDeck, JoggingToDeck),
        Transition::on(MeasuringTipOffset, Jog, MeasuringTipOffset),
        Transition::on(MeasuringTipOffset, SaveOffset, TipLengthComplete),
        Transition::on(TipLengthComplete, InvalidateTip, PreparingPipette),
        Transition::on(TipLengthComplete, MoveToDeck, JoggingToDeck),
        Transition::on(JoggingToDeck, Jog, JoggingToDeck),
        Transition::on(JoggingToDeck, SaveOffset, JoggingToDeck),
        Transition::on(JoggingToDeck, MoveToPointOne, SavingPointOne),
        Transition::on(SavingPointOne, Jog, SavingPointOne),
        Transition::on(SavingPointOne, SaveOffset, CalibrationComplete),
        Transition::any(Exit, SessionExited),
        Transition::any(InvalidateLastAction, PreparingPipette),
    ]
}

// ─── Graph Selection ─────────────────────────────────────────────────

/// Which of the two workflows a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphKind {
    /// Pipette offset only; a tip length is already known.
    PipetteOffset,
    /// Tip length first, then pipette offset.
    TipLengthAndOffset,
}

impl std::fmt::Display for GraphKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PipetteOffset => "PIPETTE_OFFSET",
            Self::TipLengthAndOffset => "TIP_LENGTH_AND_OFFSET",
        };
        f.write_str(s)
    }
}

/// The current state of a session, tagged with the graph it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum WorkflowState {
    PipetteOffset(OffsetState),
    TipLengthAndOffset(TipLengthOffsetState),
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PipetteOffset(s) => s.as_str(),
            Self::TipLengthAndOffset(s) => s.as_str(),
        }
    }

    pub fn graph_kind(&self) -> GraphKind {
        match self {
            Self::PipetteOffset(_) => GraphKind::PipetteOffset,
            Self::TipLengthAndOffset(_) => GraphKind::TipLengthAndOffset,
        }
    }

    /// Whether the session has been torn down.
    pub fn is_exited(&self) -> bool {
        matches!(
            self,
            Self::PipetteOffset(OffsetState::SessionExited)
                | Self::TipLengthAndOffset(TipLengthOffsetState::SessionExited)
        )
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two shared machines, chosen once per session.
#[derive(Debug, Clone, Copy)]
pub enum CalibrationGraph {
    PipetteOffset(&'static StateMachine<OffsetState, CommandKind>),
    TipLengthAndOffset(&'static StateMachine<TipLengthOffsetState, CommandKind>),
}

impl CalibrationGraph {
    /// Resolve the shared machine for `kind`.
    pub fn for_kind(kind: GraphKind) -> Result<Self, GraphError> {
        Ok(match kind {
            GraphKind::PipetteOffset => Self::PipetteOffset(OffsetState::machine()?),
            GraphKind::TipLengthAndOffset => {
                Self::TipLengthAndOffset(TipLengthOffsetState::machine()?)
            }
        })
    }

    pub fn kind(&self) -> GraphKind {
        match self {
            Self::PipetteOffset(_) => GraphKind::PipetteOffset,
            Self::TipLengthAndOffset(_) => GraphKind::TipLengthAndOffset,
        }
    }

    /// The state every session on this graph starts in.
    pub fn initial_state(&self) -> WorkflowState {
        match self {
            Self::PipetteOffset(_) => WorkflowState::PipetteOffset(OffsetState::SessionStarted),
            Self::TipLengthAndOffset(_) => {
                WorkflowState::TipLengthAndOffset(TipLengthOffsetState::SessionStarted)
            }
        }
    }

    /// Next state for `command` from `from`.
    ///
    /// Returns `None` when the command is unmapped, and also when `from`
    /// belongs to the other graph.
    pub fn get_next_state(
        &self,
        from: WorkflowState,
        command: CommandKind,
    ) -> Option<WorkflowState> {
        match (self, from) {
            (Self::PipetteOffset(m), WorkflowState::PipetteOffset(s)) => m
                .get_next_state(s, command)
                .map(WorkflowState::PipetteOffset),
            (Self::TipLengthAndOffset(m), WorkflowState::TipLengthAndOffset(s)) => m
                .get_next_state(s, command)
                .map(WorkflowState::TipLengthAndOffset),
            _ => None,
        }
    }

    /// Whether `state` belongs to this graph.
    pub fn contains(&self, state: WorkflowState) -> bool {
        match (self, state) {
            (Self::PipetteOffset(m), WorkflowState::PipetteOffset(s)) => m.contains_state(s),
            (Self::TipLengthAndOffset(m), WorkflowState::TipLengthAndOffset(s)) => {
                m.contains_state(s)
            }
            _ => false,
        }
    }

    /// The transition table as `(from, command, to)` rows, wildcard as `*`.
    pub fn rows(&self) -> Vec<(String, CommandKind, &'static str)> {
        match self {
            Self::PipetteOffset(m) => m
                .transitions()
                .iter()
                .map(|t| (t.from.to_string(), t.command, t.to.as_str()))
                .collect(),
            Self::TipLengthAndOffset(m) => m
                .transitions()
                .iter()
                .map(|t| (t.from.to_string(), t.command, t.to.as_str()))
                .collect(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
