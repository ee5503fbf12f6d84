//! Stored, reusable command definitions.

use remotelink_core::{Command, CommandId};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::RelayError;
use crate::store::{Collection, DocumentStore, StoreError};

pub struct CommandRegistry<S> {
    store: S,
}

impl<S: DocumentStore> CommandRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Store a command and return the id it was stored under.
    ///
    /// An absent or empty `id` gets a freshly generated one. An explicit id
    /// overwrites whatever was stored there (last writer wins).
    pub async fn create(
        &self,
        id: Option<CommandId>,
        command: Command,
    ) -> Result<CommandId, RelayError> {
        let id = match id {
            Some(id) if !id.as_str().is_empty() => id,
            _ => CommandId(self.store.new_id(Collection::Commands)),
        };

        let fields = match serde_json::to_value(&command).map_err(StoreError::from)? {
            Value::Object(fields) => fields,
            _ => unreachable!("Command serializes to an object"),
        };

        self.store
            .set(Collection::Commands, id.as_str(), fields)
            .await?;

        info!(command_id = %id, command_name = %command.command_name, "command stored");
        Ok(id)
    }

    /// Fetch a command, failing with [`RelayError::NotFound`] if absent.
    pub async fn get(&self, id: &CommandId) -> Result<Command, RelayError> {
        let Some(fields) = self.store.get(Collection::Commands, id.as_str()).await? else {
            debug!(command_id = %id, "command lookup missed");
            return Err(RelayError::NotFound(id.clone()));
        };

        serde_json::from_value(Value::Object(fields))
            .map_err(|e| RelayError::Store(StoreError::from(e)))
    }
}
