//! # Calibration Commands
//!
//! The typed form of a session command. Callers that speak the wire form
//! (a command name plus a JSON payload) go through
//! [`CalibrationCommand::from_parts`]; everything after that point matches
//! on the enum.

use serde::Deserialize;
use serde_json::Value;

use pcal_core::Point;
use pcal_state::CommandKind;

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationCommand {
    /// Optionally replace the tip rack with a caller-supplied definition.
    LoadLabware { tiprack_definition: Option<Value> },
    MoveToReferencePoint,
    Jog { vector: Point },
    PickUpTip,
    InvalidateTip,
    SaveOffset,
    MoveToTipRack,
    MoveToDeck,
    MoveToPointOne,
    SetHasCalibrationBlock { has_block: bool },
    Exit,
    InvalidateLastAction,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct LoadLabwarePayload {
    #[serde(default)]
    tiprack_definition: Option<Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct JogPayload {
    vector: Vec<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SetHasCalibrationBlockPayload {
    has_block: bool,
}

impl CalibrationCommand {
    /// Parse a wire command. `data` may be `null` for commands without a
    /// payload.
    pub fn from_parts(name: &str, data: Value) -> Result<Self, SessionError> {
        let kind: CommandKind = name.parse()?;
        let data = match data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let invalid = |reason: String| SessionError::InvalidPayload {
            command: kind,
            reason,
        };
        Ok(match kind {
            CommandKind::LoadLabware => {
                let p: LoadLabwarePayload =
                    serde_json::from_value(data).map_err(|e| invalid(e.to_string()))?;
                Self::LoadLabware {
                    tiprack_definition: p.tiprack_definition,
                }
            }
            CommandKind::Jog => {
                let p: JogPayload =
                    serde_json::from_value(data).map_err(|e| invalid(e.to_string()))?;
                Self::Jog {
                    vector: Point::from_slice(&p.vector).map_err(|e| invalid(e.to_string()))?,
                }
            }
            CommandKind::SetHasCalibrationBlock => {
                let p: SetHasCalibrationBlockPayload =
                    serde_json::from_value(data).map_err(|e| invalid(e.to_string()))?;
                Self::SetHasCalibrationBlock {
                    has_block: p.has_block,
                }
            }
            CommandKind::MoveToReferencePoint => no_payload(kind, &data, Self::MoveToReferencePoint)?,
            CommandKind::PickUpTip => no_payload(kind, &data, Self::PickUpTip)?,
            CommandKind::InvalidateTip => no_payload(kind, &data, Self::InvalidateTip)?,
            CommandKind::SaveOffset => no_payload(kind, &data, Self::SaveOffset)?,
            CommandKind::MoveToTipRack => no_payload(kind, &data, Self::MoveToTipRack)?,
            CommandKind::MoveToDeck => no_payload(kind, &data, Self::MoveToDeck)?,
            CommandKind::MoveToPointOne => no_payload(kind, &data, Self::MoveToPointOne)?,
            CommandKind::Exit => no_payload(kind, &data, Self::Exit)?,
            CommandKind::InvalidateLastAction => {
                no_payload(kind, &data, Self::InvalidateLastAction)?
            }
        })
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::LoadLabware { .. } => CommandKind::LoadLabware,
            Self::MoveToReferencePoint => CommandKind::MoveToReferencePoint,
            Self::Jog { .. } => CommandKind::Jog,
            Self::PickUpTip => CommandKind::PickUpTip,
            Self::InvalidateTip => CommandKind::InvalidateTip,
            Self::SaveOffset => CommandKind::SaveOffset,
            Self::MoveToTipRack => CommandKind::MoveToTipRack,
            Self::MoveToDeck => CommandKind::MoveToDeck,
            Self::MoveToPointOne => CommandKind::MoveToPointOne,
            Self::SetHasCalibrationBlock { .. } => CommandKind::SetHasCalibrationBlock,
            Self::Exit => CommandKind::Exit,
            Self::InvalidateLastAction => CommandKind::InvalidateLastAction,
        }
    }
}

fn no_payload(
    kind: CommandKind,
    data: &Value,
    command: CalibrationCommand,
) -> Result<CalibrationCommand, SessionError> {
    match data.as_object() {
        Some(fields) if fields.is_empty() => Ok(command),
        _ => Err(SessionError::InvalidPayload {
            command: kind,
            reason: format!("{kind} takes no data, got {data}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use serde_json::json;

    #[test]
    fn test_jog_payload() {
        let cmd = CalibrationCommand::from_parts("jog", json!({"vector": [0.0, 0.5, -1.0]})).unwrap();
        assert_eq!(
            cmd,
            CalibrationCommand::Jog {
                vector: Point::new(0.0, 0.5, -1.0)
            }
        );
    }

    #[test]
    fn test_jog_wrong_arity() {
        let err = CalibrationCommand::from_parts("jog", json!({"vector": [1.0, 2.0]})).unwrap_err();
        assert_eq!(err.class(), ErrorClass::ProtocolMisuse);
    }

    #[test]
    fn test_unit_commands_accept_null_or_empty() {
        assert_eq!(
            CalibrationCommand::from_parts("pickUpTip", Value::Null).unwrap(),
            CalibrationCommand::PickUpTip
        );
        assert_eq!(
            CalibrationCommand::from_parts("exit", json!({})).unwrap(),
            CalibrationCommand::Exit
        );
    }

    #[test]
    fn test_unit_command_rejects_data() {
        let err = CalibrationCommand::from_parts("saveOffset", json!({"x": 1})).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidPayload {
                command: CommandKind::SaveOffset,
                ..
            }
        ));
    }

    #[test]
    fn test_load_labware_optional_definition() {
        assert_eq!(
            CalibrationCommand::from_parts("loadLabware", json!({})).unwrap(),
            CalibrationCommand::LoadLabware {
                tiprack_definition: None
            }
        );
        let cmd = CalibrationCommand::from_parts(
            "loadLabware",
            json!({"tiprackDefinition": {"namespace": "custom"}}),
        )
        .unwrap();
        assert!(matches!(
            cmd,
            CalibrationCommand::LoadLabware {
                tiprack_definition: Some(_)
            }
        ));
    }

    #[test]
    fn test_set_has_block() {
        assert_eq!(
            CalibrationCommand::from_parts("setHasCalibrationBlock", json!({"hasBlock": true}))
                .unwrap(),
            CalibrationCommand::SetHasCalibrationBlock { has_block: true }
        );
        assert!(CalibrationCommand::from_parts("setHasCalibrationBlock", json!({})).is_err());
    }

    #[test]
    fn test_unknown_command() {
        let err = CalibrationCommand::from_parts("calibrateDeck", Value::Null).unwrap_err();
        assert!(matches!(err, SessionError::UnknownCommand(_)));
        assert_eq!(err.class(), ErrorClass::ProtocolMisuse);
    }

    #[test]
    fn test_kind_matches_wire_name() {
        for kind in CommandKind::ALL {
            let data = match kind {
                CommandKind::Jog => json!({"vector": [0, 0, 0]}),
                CommandKind::SetHasCalibrationBlock => json!({"hasBlock": false}),
                _ => Value::Null,
            };
            assert_eq!(
                CalibrationCommand::from_parts(kind.as_str(), data).unwrap().kind(),
                kind
            );
        }
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn jog_vector_survives_parsing(
                x in -100.0f64..100.0,
                y in -100.0f64..100.0,
                z in -100.0f64..100.0,
            ) {
                let cmd = CalibrationCommand::from_parts("jog", json!({"vector": [x, y, z]})).unwrap();
                prop_assert_eq!(cmd, CalibrationCommand::Jog { vector: Point::new(x, y, z) });
            }

            #[test]
            fn jog_rejects_other_arities(v in proptest::collection::vec(-10.0f64..10.0, 0..8)) {
                prop_assume!(v.len() != 3);
                let result = CalibrationCommand::from_parts("jog", json!({"vector": v}));
                prop_assert!(
                    matches!(result, Err(SessionError::InvalidPayload { command: CommandKind::Jog, .. })),
                    "unexpected result: {:?}",
                    result
                );
            }
        }
    }
}
