use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CommandId, CoreError, RemoteId};

/// `message` value asking the relay to replay a stored command.
pub const SEND_MESSAGE: &str = "send";

/// Command-send request as received from a client, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCommandRequest {
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub command_id: Option<String>,
    #[serde(default)]
    pub command: Option<Value>,
}

/// Where the bytes sent to the remote come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandPayload {
    /// The payload travels with the request.
    Inline(Value),
    /// The payload is a command previously stored in the registry.
    Stored(CommandId),
}

/// A validated dispatch request.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub remote_id: RemoteId,
    pub message: Option<String>,
    pub payload: CommandPayload,
}

impl DispatchRequest {
    /// Inline payload without `send` framing, as used by liveness probes.
    pub fn inline(remote_id: RemoteId, command: Value) -> Self {
        Self {
            remote_id,
            message: None,
            payload: CommandPayload::Inline(command),
        }
    }

    /// Replay of a stored command.
    pub fn stored(remote_id: RemoteId, command_id: CommandId) -> Self {
        Self {
            remote_id,
            message: Some(SEND_MESSAGE.to_owned()),
            payload: CommandPayload::Stored(command_id),
        }
    }

    pub fn is_send(&self) -> bool {
        self.message.as_deref() == Some(SEND_MESSAGE)
    }
}

impl TryFrom<SendCommandRequest> for DispatchRequest {
    type Error = CoreError;

    fn try_from(request: SendCommandRequest) -> Result<Self, Self::Error> {
        let remote_id = request
            .remote_id
            .filter(|id| !id.is_empty())
            .map(RemoteId)
            .ok_or(CoreError::MissingField("remoteId"))?;

        let is_send = request.message.as_deref() == Some(SEND_MESSAGE);
        let command_id = request.command_id.filter(|id| !id.is_empty());

        let payload = match (is_send, command_id, request.command) {
            (true, Some(id), _) => CommandPayload::Stored(CommandId(id)),
            (_, _, Some(command)) if !command.is_null() => CommandPayload::Inline(command),
            _ => return Err(CoreError::NoPayload),
        };

        Ok(Self {
            remote_id,
            message: request.message,
            payload,
        })
    }
}
