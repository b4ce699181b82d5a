//! SQLite document store, one row per document with a JSON body.
//!
//! The pool is capped at a single connection, so `conditional_update`'s
//! read-check-write runs inside one transaction with no interleaved writer.

use hearth_storage::{Collection, Document, DocumentStore, StoreError};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self { pool })
    }
}

fn encode(document: &Document) -> Result<String, StoreError> {
    serde_json::to_string(document).map_err(|e| StoreError::Unavailable(e.to_string()))
}

fn decode(body: &str) -> Result<Document, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::Unavailable(e.to_string()))
}

#[async_trait::async_trait]
impl DocumentStore for SqliteStore {
    async fn create(
        &self,
        collection: Collection,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents(collection,doc_key,body) VALUES(?,?,?)")
            .bind(collection.as_str())
            .bind(key)
            .bind(encode(&document)?)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let s = e.to_string();
                if s.contains("UNIQUE") {
                    StoreError::AlreadyExists
                } else {
                    StoreError::Unavailable(s)
                }
            })?;
        Ok(())
    }

    async fn get_by_key(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Document, StoreError> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT body FROM documents WHERE collection=? AND doc_key=?",
        )
        .bind(collection.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match row {
            None => Err(StoreError::NotFound),
            Some((body,)) => decode(&body),
        }
    }

    async fn get_by_indexed_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Document, StoreError> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT body FROM documents WHERE collection=? AND json_extract(body, ?)=?",
        )
        .bind(collection.as_str())
        .bind(format!("$.{field}"))
        .bind(value)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match rows.len() {
            0 => Err(StoreError::NotFound),
            1 => decode(&rows[0].0),
            _ => Err(StoreError::AmbiguousIndex(field.to_string())),
        }
    }

    async fn conditional_update(
        &self,
        collection: Collection,
        key: &str,
        expected: &Document,
        changes: &Document,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let row = sqlx::query_as::<_, (String,)>(
            "SELECT body FROM documents WHERE collection=? AND doc_key=?",
        )
        .bind(collection.as_str())
        .bind(key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        // Dropping the transaction without committing rolls it back.
        let mut doc = match row {
            None => return Err(StoreError::NotFound),
            Some((body,)) => decode(&body)?,
        };

        for (field, want) in expected {
            // An absent field compares equal to null.
            if doc.get(field).unwrap_or(&serde_json::Value::Null) != want {
                return Err(StoreError::PreconditionFailed);
            }
        }
        for (field, val) in changes {
            doc.insert(field.clone(), val.clone());
        }

        sqlx::query("UPDATE documents SET body=? WHERE collection=? AND doc_key=?")
            .bind(encode(&doc)?)
            .bind(collection.as_str())
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
