//! # Session Errors
//!
//! Every fault a session can surface, and the [`ErrorClass`] that tells a
//! caller how to react to it.

use thiserror::Error;

use pcal_core::Mount;
use pcal_deck::DeckError;
use pcal_hardware::HardwareError;
use pcal_state::{CommandKind, GraphError, UnknownCommand, WorkflowState};
use pcal_store::StoreError;

/// How a caller should treat a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The session could not be created. Nothing to retry against.
    ConstructionFault,
    /// A guard rejected the command before any motion. The session is
    /// unchanged; another command may be issued.
    PreconditionViolation,
    /// The command is not valid here at all. Blind retries will not help.
    ProtocolMisuse,
    /// A step that must precede this one never happened.
    WorkflowAssertion,
    /// Propagated from the hardware controller or motion planner.
    HardwareFault,
    /// Propagated from the calibration store.
    StorageFault,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ConstructionFault => "CONSTRUCTION_FAULT",
            Self::PreconditionViolation => "PRECONDITION_VIOLATION",
            Self::ProtocolMisuse => "PROTOCOL_MISUSE",
            Self::WorkflowAssertion => "WORKFLOW_ASSERTION",
            Self::HardwareFault => "HARDWARE_FAULT",
            Self::StorageFault => "STORAGE_FAULT",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    /// No pipette is attached on the requested mount.
    #[error("no pipette attached on {mount} mount")]
    NoPipetteOnMount {
        /// The mount requested.
        mount: Mount,
    },

    /// No default tip rack is known for the pipette's volume class.
    #[error("no default tip rack for a {max_volume} µL pipette")]
    NoDefaultTipRack {
        /// The pipette's maximum volume.
        max_volume: u32,
    },

    /// The deck has no calibration point with this id.
    #[error("deck has no calibration point {0:?}")]
    MissingCalibrationPoint(String),

    /// Bundled labware or deck geometry could not be set up.
    #[error("deck setup failed: {0}")]
    DeckSetup(#[source] DeckError),

    /// A calibration graph failed validation.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A handler guard rejected the command for the current state.
    #[error("{handler} is not allowed in state {state}: {condition}")]
    UnmetStateTransitionRequirement {
        /// The command whose guard failed.
        handler: CommandKind,
        /// The state the session was in.
        state: WorkflowState,
        /// The condition that was not met.
        condition: &'static str,
    },

    /// A supplied labware definition is invalid.
    #[error("invalid tip rack definition: {0}")]
    InvalidLabware(#[source] DeckError),

    /// A supplied labware definition is valid but is not a tip rack.
    #[error("labware {uri} is not a tip rack")]
    NotATipRack {
        /// URI of the offending definition.
        uri: String,
    },

    /// No transition is defined for the command from the current state.
    #[error("cannot {command} from state {state}")]
    BadStateTransition {
        /// The rejected command.
        command: CommandKind,
        /// The state the session was in.
        state: WorkflowState,
    },

    /// The command name is not part of the calibration command set.
    #[error(transparent)]
    UnknownCommand(#[from] UnknownCommand),

    /// The command payload does not match the command.
    #[error("invalid payload for {command}: {reason}")]
    InvalidPayload {
        /// The command.
        command: CommandKind,
        /// What was wrong.
        reason: String,
    },

    /// The session has already been exited.
    #[error("session has exited")]
    SessionExited,

    /// A capture an operation depends on was never taken.
    #[error("{handler}: {reason}")]
    WorkflowAssertion {
        /// The command that detected it.
        handler: CommandKind,
        /// The missing capture.
        reason: &'static str,
    },

    /// Deck geometry lookup failed mid-workflow.
    #[error(transparent)]
    Deck(#[from] DeckError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoPipetteOnMount { .. }
            | Self::NoDefaultTipRack { .. }
            | Self::MissingCalibrationPoint(_)
            | Self::DeckSetup(_)
            | Self::Graph(_) => ErrorClass::ConstructionFault,
            Self::UnmetStateTransitionRequirement { .. }
            | Self::InvalidLabware(_)
            | Self::NotATipRack { .. } => ErrorClass::PreconditionViolation,
            Self::BadStateTransition { .. }
            | Self::UnknownCommand(_)
            | Self::InvalidPayload { .. }
            | Self::SessionExited => ErrorClass::ProtocolMisuse,
            Self::WorkflowAssertion { .. } | Self::Deck(_) => ErrorClass::WorkflowAssertion,
            Self::Hardware(_) => ErrorClass::HardwareFault,
            Self::Store(_) => ErrorClass::StorageFault,
        }
    }
}
