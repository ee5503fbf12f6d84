//! Decodes telemetry published by remotes and routes it to the registry or
//! the reconciler.

use std::collections::HashMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use futures::FutureExt;
use remotelink_core::{
    Command, CommandId, CommandRegistration, DeviceId, RemoteId, RemoteState, TelemetryEvent,
    fields,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::RelayError;
use crate::reconcile::{ReconcileReport, StateReconciler, TelemetryLiveness};
use crate::registry::CommandRegistry;
use crate::store::{Collection, DocumentStore, FieldPath, Update};
use crate::writes::{PendingWrite, WriteReport, join_writes};

/// Message attributes that may carry the sender's id, in lookup order.
const SENDER_ATTRIBUTES: [&str; 2] = ["deviceId", "remoteId"];

/// A message as delivered by the telemetry topic: string attributes plus a
/// base64 encoded JSON body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub data: String,
}

impl InboundMessage {
    pub fn new(remote_id: &str, body: &Value) -> Self {
        Self {
            attributes: HashMap::from([(SENDER_ATTRIBUTES[0].to_owned(), remote_id.to_owned())]),
            data: STANDARD.encode(body.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IngestReport {
    #[serde(rename_all = "camelCase")]
    CommandRegistered {
        remote_id: RemoteId,
        device_id: DeviceId,
        command_id: CommandId,
        writes: WriteReport,
    },
    StateApplied(ReconcileReport),
}

/// Split a message into its sender and decoded event.
pub fn decode(message: &InboundMessage) -> Result<(RemoteId, TelemetryEvent), RelayError> {
    let remote_id = SENDER_ATTRIBUTES
        .iter()
        .find_map(|name| message.attributes.get(*name).filter(|id| !id.is_empty()))
        .map(|id| RemoteId(id.clone()))
        .ok_or_else(|| RelayError::MalformedPayload("message has no sender attribute".into()))?;

    let bytes = STANDARD
        .decode(message.data.trim())
        .map_err(|e| RelayError::MalformedPayload(format!("invalid base64: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| RelayError::MalformedPayload(format!("invalid utf-8: {e}")))?;
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(body)) => body,
        Ok(_) => {
            return Err(RelayError::MalformedPayload(
                "body is not a JSON object".into(),
            ));
        }
        Err(e) => return Err(RelayError::MalformedPayload(format!("invalid json: {e}"))),
    };

    let event =
        TelemetryEvent::from_body(body).map_err(|e| RelayError::MalformedPayload(e.to_string()))?;

    Ok((remote_id, event))
}

pub struct TelemetryIngestor<S> {
    store: S,
    registry: CommandRegistry<S>,
    reconciler: StateReconciler<S>,
}

impl<S: DocumentStore> TelemetryIngestor<S> {
    pub fn new(store: S, liveness: TelemetryLiveness) -> Self {
        Self {
            registry: CommandRegistry::new(store.clone()),
            reconciler: StateReconciler::new(store.clone(), liveness),
            store,
        }
    }

    /// Decode and apply one message. Malformed messages are reported and
    /// nothing is written for them.
    #[instrument(skip_all)]
    pub async fn ingest(&self, message: &InboundMessage) -> Result<IngestReport, RelayError> {
        let (remote_id, event) = decode(message).inspect_err(|e| {
            warn!(error = %e, "dropping telemetry message");
        })?;

        match event {
            TelemetryEvent::CreateCommand(registration) => {
                self.register(remote_id, registration).await
            }
            TelemetryEvent::Report(report) => self
                .reconciler
                .apply_telemetry(&remote_id, report)
                .await
                .map(IngestReport::StateApplied),
        }
    }

    /// Store a learned command, link it on the device and put the remote
    /// back to idle. No availability cascade happens here.
    async fn register(
        &self,
        remote_id: RemoteId,
        registration: CommandRegistration,
    ) -> Result<IngestReport, RelayError> {
        let command_name = registration.command_name.clone();
        let command_id = self
            .registry
            .create(
                registration.command_id,
                Command {
                    command_name: registration.command_name,
                    command_len: registration.command_len,
                    command: registration.command,
                },
            )
            .await?;

        let device_write = {
            let store = self.store.clone();
            let id = registration.device_id.clone();
            let update = Update::new().set(
                FieldPath::nested(fields::COMMANDS, command_name.as_str()),
                command_id.as_str(),
            );
            async move {
                store
                    .update(Collection::Devices, id.as_str(), update)
                    .await
            }
            .boxed()
        };

        let remote_write = {
            let store = self.store.clone();
            let id = remote_id.clone();
            let update = Update::new().field(fields::STATE, String::from(RemoteState::Idle));
            async move {
                store
                    .update(Collection::Remotes, id.as_str(), update)
                    .await
            }
            .boxed()
        };

        let writes = join_writes(vec![
            PendingWrite::new(Collection::Devices, registration.device_id.as_str(), device_write),
            PendingWrite::new(Collection::Remotes, remote_id.as_str(), remote_write),
        ])
        .await;

        info!(
            remote_id = %remote_id,
            device_id = %registration.device_id,
            command_id = %command_id,
            command_name = %command_name,
            failed = writes.failures.len(),
            "command registered"
        );

        Ok(IngestReport::CommandRegistered {
            remote_id,
            device_id: registration.device_id,
            command_id,
            writes,
        })
    }
}
