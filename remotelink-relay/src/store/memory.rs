use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::store::{
    Collection, Document, DocumentStore, StoreError, StoredDocument, Update, apply_update,
    merge_fields,
};

/// In-memory document store.
/// This is primarily intended for testing and as a reference
/// implementation of the DocumentStore trait.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<Collection, BTreeMap<String, Document>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn set(
        &self,
        collection: Collection,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let document = collections
            .entry(collection)
            .or_default()
            .entry(id.to_owned())
            .or_default();
        merge_fields(document, fields);
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        update: Update,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let document = collections
            .get_mut(&collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_owned(),
            })?;
        apply_update(document, update);
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(&collection) else {
            return Ok(Vec::new());
        };

        Ok(documents
            .iter()
            .filter(|(_, fields)| fields.get(field) == Some(value))
            .map(|(id, fields)| StoredDocument {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, fields)| StoredDocument {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
