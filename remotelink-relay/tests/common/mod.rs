#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use remotelink_relay::store::{StoredDocument, Update};
use remotelink_relay::{Collection, Document, DocumentStore, MemoryDocumentStore, StoreError};
use serde_json::Value;

pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("test documents must be JSON objects"),
    }
}

/// Seed a remote with `devices` bound devices named `{remote}-d{i}`, each
/// consistent with the remote's current availability.
pub async fn seed_remote<S: DocumentStore>(
    store: &S,
    remote_id: &str,
    state: &str,
    is_online: bool,
    devices: usize,
) -> Result<(), StoreError> {
    store
        .set(
            Collection::Remotes,
            remote_id,
            doc(serde_json::json!({ "isOnline": is_online, "state": state })),
        )
        .await?;

    let is_available = is_online && state.is_empty();
    for i in 0..devices {
        store
            .set(
                Collection::Devices,
                &format!("{remote_id}-d{i}"),
                doc(serde_json::json!({ "remoteId": remote_id, "isAvailable": is_available })),
            )
            .await?;
    }

    Ok(())
}

pub async fn field<S: DocumentStore>(
    store: &S,
    collection: Collection,
    id: &str,
    name: &str,
) -> Option<Value> {
    store
        .get(collection, id)
        .await
        .ok()
        .flatten()
        .and_then(|document| document.get(name).cloned())
}

/// Memory store whose `update` fails for chosen documents.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryDocumentStore,
    failing: Arc<HashSet<(Collection, String)>>,
}

impl FlakyStore {
    pub fn failing_updates(targets: impl IntoIterator<Item = (Collection, &'static str)>) -> Self {
        Self {
            inner: MemoryDocumentStore::new(),
            failing: Arc::new(
                targets
                    .into_iter()
                    .map(|(collection, id)| (collection, id.to_owned()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn set(
        &self,
        collection: Collection,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.inner.set(collection, id, fields).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        update: Update,
    ) -> Result<(), StoreError> {
        if self.failing.contains(&(collection, id.to_owned())) {
            return Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        self.inner.update(collection, id, update).await
    }

    async fn query(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.query(collection, field, value).await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.list(collection).await
    }
}
