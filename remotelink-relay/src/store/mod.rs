pub mod memory;
pub mod sqlite;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use ulid::Ulid;

/// A stored record: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Collections the relay reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Remotes,
    Devices,
    Commands,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Remotes => "remotes",
            Collection::Devices => "devices",
            Collection::Commands => "commands",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path to a possibly nested field. Segments are never split on dots, so a
/// command name like `vol.up` stays a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn nested(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self(vec![parent.into(), child.into()])
    }
}

/// A set of field writes merged into an existing document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    entries: Vec<(FieldPath, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: FieldPath, value: impl Into<Value>) -> Self {
        self.entries.push((path, value.into()));
        self
    }

    pub fn field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(FieldPath::field(name), value)
    }
}

impl From<Document> for Update {
    fn from(document: Document) -> Self {
        Self {
            entries: document
                .into_iter()
                .map(|(name, value)| (FieldPath::field(name), value))
                .collect(),
        }
    }
}

/// A document together with its id, as returned by queries.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Document,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: Collection, id: String },
    #[error("document {collection}/{id} is not a JSON object")]
    Corrupt { collection: Collection, id: String },
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Document store the relay runs against.
///
/// Single-document writes are atomic. Nothing spans documents: a
/// reconciliation pass is a sequence of independent writes.
#[async_trait]
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Fetch a document, `None` if it does not exist.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// Write the given fields, creating the document if needed. Fields that
    /// are not named keep their current value.
    async fn set(&self, collection: Collection, id: &str, fields: Document)
    -> Result<(), StoreError>;

    /// Merge field writes into an existing document.
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update(&self, collection: Collection, id: &str, update: Update)
    -> Result<(), StoreError>;

    /// All documents whose top-level `field` equals `value`.
    async fn query(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Every document of a collection.
    async fn list(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError>;

    /// A fresh unique id. Nothing is written.
    fn new_id(&self, _collection: Collection) -> String {
        Ulid::new().to_string()
    }
}

pub(crate) fn merge_fields(document: &mut Document, fields: Document) {
    for (name, value) in fields {
        document.insert(name, value);
    }
}

pub(crate) fn apply_update(document: &mut Document, update: Update) {
    for (path, value) in update.entries {
        let Some((last, parents)) = path.0.split_last() else {
            continue;
        };

        let mut target = &mut *document;
        for segment in parents {
            let slot = target
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            target = match slot {
                Value::Object(map) => map,
                _ => unreachable!("slot was just made an object"),
            };
        }
        target.insert(last.clone(), value);
    }
}
