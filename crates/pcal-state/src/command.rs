//! The closed set of commands a calibration session accepts.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A command name that is not part of the calibration command set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown calibration command {0:?}")]
pub struct UnknownCommand(pub String);

/// Command names, independent of their payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    LoadLabware,
    MoveToReferencePoint,
    Jog,
    PickUpTip,
    InvalidateTip,
    SaveOffset,
    MoveToTipRack,
    MoveToDeck,
    MoveToPointOne,
    SetHasCalibrationBlock,
    Exit,
    InvalidateLastAction,
}

impl CommandKind {
    /// Every command, in a fixed order.
    pub const ALL: [CommandKind; 12] = [
        Self::LoadLabware,
        Self::MoveToReferencePoint,
        Self::Jog,
        Self::PickUpTip,
        Self::InvalidateTip,
        Self::SaveOffset,
        Self::MoveToTipRack,
        Self::MoveToDeck,
        Self::MoveToPointOne,
        Self::SetHasCalibrationBlock,
        Self::Exit,
        Self::InvalidateLastAction,
    ];

    /// The command's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadLabware => "loadLabware",
            Self::MoveToReferencePoint => "moveToReferencePoint",
            Self::Jog => "jog",
            Self::PickUpTip => "pickUpTip",
            Self::InvalidateTip => "invalidateTip",
            Self::SaveOffset => "saveOffset",
            Self::MoveToTipRack => "moveToTipRack",
            Self::MoveToDeck => "moveToDeck",
            Self::MoveToPointOne => "moveToPointOne",
            Self::SetHasCalibrationBlock => "setHasCalibrationBlock",
            Self::Exit => "exit",
            Self::InvalidateLastAction => "invalidateLastAction",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}
