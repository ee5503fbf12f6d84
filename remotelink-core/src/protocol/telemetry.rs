use serde_json::{Map, Value};

use crate::{CommandId, CoreError, DeviceId, RemoteState, fields};

/// `state` value announcing a freshly learned command.
pub const CREATE_STATE: &str = "create";

/// A decoded telemetry message body.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// The remote learned a new command and wants it stored.
    CreateCommand(CommandRegistration),
    /// Any other report; its fields are merged onto the remote.
    Report(StateReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandRegistration {
    /// Id to store the command under; `None` lets the registry pick one.
    pub command_id: Option<CommandId>,
    pub command_name: String,
    pub command_len: i64,
    pub command: Value,
    /// Device whose `commands` map receives the new entry.
    pub device_id: DeviceId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateReport {
    /// Reported state. `None` when the body has no `state` or a null one;
    /// such a report never counts as idle.
    pub state: Option<RemoteState>,
    /// Every field of the body, as sent.
    pub fields: Map<String, Value>,
}

impl TelemetryEvent {
    pub fn from_body(body: Map<String, Value>) -> Result<Self, CoreError> {
        let state = match body.get(fields::STATE) {
            None | Some(Value::Null) => None,
            Some(Value::String(state)) => Some(RemoteState::from(state.as_str())),
            Some(_) => {
                return Err(CoreError::InvalidField {
                    field: fields::STATE,
                    expected: "a string",
                });
            }
        };

        match state {
            Some(RemoteState::Busy(ref marker)) if marker == CREATE_STATE => {
                CommandRegistration::from_body(&body).map(TelemetryEvent::CreateCommand)
            }
            state => Ok(TelemetryEvent::Report(StateReport {
                state,
                fields: body,
            })),
        }
    }
}

impl CommandRegistration {
    fn from_body(body: &Map<String, Value>) -> Result<Self, CoreError> {
        let command_id = match body.get(fields::COMMAND_ID) {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if id.is_empty() => None,
            Some(Value::String(id)) => Some(CommandId(id.clone())),
            Some(_) => {
                return Err(CoreError::InvalidField {
                    field: fields::COMMAND_ID,
                    expected: "a string",
                });
            }
        };

        let command_name = required_str(body, fields::COMMAND_NAME)?;
        let device_id = required_str(body, fields::DEVICE_ID)?;

        let command_len = match body.get(fields::COMMAND_LEN) {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_i64().ok_or(CoreError::InvalidField {
                field: fields::COMMAND_LEN,
                expected: "an integer",
            })?,
        };

        Ok(Self {
            command_id,
            command_name,
            command_len,
            command: body.get(fields::COMMAND).cloned().unwrap_or(Value::Null),
            device_id: DeviceId(device_id),
        })
    }
}

fn required_str(body: &Map<String, Value>, field: &'static str) -> Result<String, CoreError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(CoreError::MissingField(field)),
        Some(Value::String(value)) if value.is_empty() => Err(CoreError::MissingField(field)),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(CoreError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}
