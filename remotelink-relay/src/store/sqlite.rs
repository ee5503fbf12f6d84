use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    Row, SqlitePool,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};

use crate::store::{
    Collection, Document, DocumentStore, StoreError, StoredDocument, Update, apply_update,
    merge_fields,
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed document store.
/// Each document is a JSON object stored in a single row.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub async fn new(path: impl AsRef<str>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.as_ref()))?
            .create_if_missing(true);
        Self::connect(options).await
    }

    pub async fn new_in_memory() -> Result<Self, StoreError> {
        Self::connect(SqliteConnectOptions::from_str("sqlite::memory:")?).await
    }

    // Read-modify-write transactions are serialized through one connection;
    // this also keeps an in-memory database alive for the pool's lifetime.
    async fn connect(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }
}

fn parse_body(collection: Collection, id: &str, body: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(document) => Ok(document),
        _ => Err(StoreError::Corrupt {
            collection,
            id: id.to_owned(),
        }),
    }
}

fn map_row(collection: Collection, row: &SqliteRow) -> Result<StoredDocument, StoreError> {
    let id: String = row.try_get("id")?;
    let body: String = row.try_get("body")?;
    let fields = parse_body(collection, &id, &body)?;
    Ok(StoredDocument { id, fields })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let body: String = row.try_get("body")?;
        parse_body(collection, id, &body).map(Some)
    }

    async fn set(
        &self,
        collection: Collection,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let mut document = match existing {
            Some(row) => parse_body(collection, id, &row.try_get::<String, _>("body")?)?,
            None => Document::new(),
        };
        merge_fields(&mut document, fields);

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO documents (collection, id, body)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(serde_json::to_string(&document)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        update: Update,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_owned(),
            });
        };

        let mut document = parse_body(collection, id, &row.try_get::<String, _>("body")?)?;
        apply_update(&mut document, update);

        sqlx::query("UPDATE documents SET body = ? WHERE collection = ? AND id = ?")
            .bind(serde_json::to_string(&document)?)
            .bind(collection.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let path = format!("$.\"{}\"", field.replace('"', "\\\""));

        let rows = sqlx::query(
            r#"
            SELECT id, body FROM documents
            WHERE collection = ? AND json_extract(body, ?) = json_extract(?, '$')
            ORDER BY id
            "#,
        )
        .bind(collection.as_str())
        .bind(path)
        .bind(serde_json::to_string(value)?)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| map_row(collection, row)).collect()
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError> {
        let rows = sqlx::query("SELECT id, body FROM documents WHERE collection = ? ORDER BY id")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|row| map_row(collection, row)).collect()
    }
}
