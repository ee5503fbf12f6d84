//! Resolves a command payload and hands it to the transport.

use remotelink_core::{CommandPayload, DispatchRequest, Outcome, SEND_MESSAGE, fields};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::RelayError;
use crate::registry::CommandRegistry;
use crate::store::{DocumentStore, StoreError};
use crate::transport::CommandTransport;

pub struct Dispatcher<S, T> {
    registry: CommandRegistry<S>,
    transport: T,
}

impl<S, T> Dispatcher<S, T>
where
    S: DocumentStore,
    T: CommandTransport,
{
    pub fn new(store: S, transport: T) -> Self {
        Self {
            registry: CommandRegistry::new(store),
            transport,
        }
    }

    /// Deliver a request to its remote.
    ///
    /// A stored command that cannot be resolved fails the dispatch before the
    /// transport is touched. Transport errors are returned as
    /// [`Outcome::Failed`] and never retried here. Remote and device state is
    /// left alone; reconciling it is the caller's job.
    #[instrument(skip_all, fields(remote_id = %request.remote_id))]
    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<Outcome, RelayError> {
        let payload = self.resolve(request).await?;
        let bytes = serde_json::to_vec(&payload).map_err(StoreError::from)?;

        match self.transport.send(&request.remote_id, bytes).await {
            Ok(()) => {
                info!("command delivered");
                Ok(Outcome::Delivered)
            }
            Err(e) => {
                warn!(error = %e, "unable to send command");
                Ok(Outcome::Failed(e.to_string()))
            }
        }
    }

    async fn resolve(&self, request: &DispatchRequest) -> Result<Value, RelayError> {
        match &request.payload {
            CommandPayload::Inline(command) => Ok(command.clone()),
            CommandPayload::Stored(id) => {
                let command = self.registry.get(id).await?;
                let mut payload = serde_json::to_value(&command).map_err(StoreError::from)?;
                if request.is_send()
                    && let Value::Object(map) = &mut payload
                {
                    map.insert(fields::MESSAGE.to_owned(), Value::from(SEND_MESSAGE));
                }
                Ok(payload)
            }
        }
    }
}
