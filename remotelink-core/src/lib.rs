pub mod error;
pub mod protocol;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use error::CoreError;
pub use protocol::dispatch::{CommandPayload, DispatchRequest, SEND_MESSAGE, SendCommandRequest};
pub use protocol::telemetry::{CREATE_STATE, CommandRegistration, StateReport, TelemetryEvent};

/// Field names used by the stored documents. These are shared with the
/// firmware and the mobile client, so they keep their camelCase spelling.
pub mod fields {
    pub const IS_ONLINE: &str = "isOnline";
    pub const IS_AVAILABLE: &str = "isAvailable";
    pub const STATE: &str = "state";
    pub const REMOTE_ID: &str = "remoteId";
    pub const DEVICE_ID: &str = "deviceId";
    pub const COMMANDS: &str = "commands";
    pub const COMMAND_ID: &str = "commandId";
    pub const COMMAND_NAME: &str = "commandName";
    pub const COMMAND_LEN: &str = "commandLen";
    pub const COMMAND: &str = "command";
    pub const MESSAGE: &str = "message";
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a remote gateway, assigned at provisioning.
    RemoteId
);
string_id!(
    /// Identifier of an end device bound to a remote.
    DeviceId
);
string_id!(
    /// Identifier of a stored command definition.
    CommandId
);

/// Transitional state reported by a remote.
///
/// The stored form is a plain string: the empty string is `Idle`, anything
/// else is a provider specific busy marker. A missing or null value reads
/// back as `Idle`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum RemoteState {
    #[default]
    Idle,
    Busy(String),
}

impl RemoteState {
    pub fn is_idle(&self) -> bool {
        matches!(self, RemoteState::Idle)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RemoteState::Idle => "",
            RemoteState::Busy(reason) => reason,
        }
    }
}

impl From<String> for RemoteState {
    fn from(value: String) -> Self {
        if value.is_empty() {
            RemoteState::Idle
        } else {
            RemoteState::Busy(value)
        }
    }
}

impl From<&str> for RemoteState {
    fn from(value: &str) -> Self {
        RemoteState::from(value.to_owned())
    }
}

impl From<Option<String>> for RemoteState {
    fn from(value: Option<String>) -> Self {
        value.map(RemoteState::from).unwrap_or_default()
    }
}

impl From<RemoteState> for String {
    fn from(value: RemoteState) -> Self {
        match value {
            RemoteState::Idle => String::new(),
            RemoteState::Busy(reason) => reason,
        }
    }
}

impl fmt::Display for RemoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteState::Idle => f.write_str("idle"),
            RemoteState::Busy(reason) => write!(f, "busy({reason})"),
        }
    }
}

/// The Availability Rule: a device is available only while its remote is
/// online and idle.
pub fn is_available(is_online: bool, state: &RemoteState) -> bool {
    is_online && state.is_idle()
}

/// A gateway that receives dispatched commands.
///
/// Remote documents also carry free-form telemetry fields; only the fields
/// the relay reasons about are modelled here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remote {
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub state: RemoteState,
}

impl Remote {
    pub fn is_available(&self) -> bool {
        is_available(self.is_online, &self.state)
    }
}

/// An end device bound to exactly one remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub remote_id: RemoteId,
    #[serde(default)]
    pub is_available: bool,
    /// Command name to stored command id.
    #[serde(default)]
    pub commands: BTreeMap<String, CommandId>,
}

/// A stored, named command definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub command_name: String,
    /// Declared payload length. Advisory only.
    #[serde(default)]
    pub command_len: i64,
    /// Opaque, provider specific payload.
    #[serde(default)]
    pub command: Value,
}

/// Result of a delivery attempt through the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    Delivered,
    Failed(String),
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered)
    }
}
