//! # SQLite Document Store
//!
//! The production `DocumentStore` implementation: one `documents` table of
//! JSON bodies, addressed by `(collection, key)`.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SQLite Document Store                              │
//! │                                                                         │
//! │  Host startup                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreConfig::new(path) ← Configure pool settings                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqliteStore::open(config).await ← Create pool + ensure schema         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  documents(collection TEXT, key TEXT, body TEXT, created_at TEXT)      │
//! │       PRIMARY KEY (collection, key)                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! WAL (Write-Ahead Logging) is enabled so catalog reads never block the
//! transaction-log appends that happen after payment.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::document::{Document, DocumentStore};
use crate::error::{StoreError, StoreResult};

// =============================================================================
// Configuration
// =============================================================================

/// Document store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/data/troli.db").max_connections(5);
/// let store = SqliteStore::open(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (sufficient for a single tablet)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    pub min_connections: u32,

    /// Timeout when acquiring a connection from the pool.
    pub acquire_timeout: Duration,
}

impl StoreConfig {
    /// Creates a configuration with the given database path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the maximum number of pooled connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

// =============================================================================
// SQLite Store
// =============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,
    key         TEXT NOT NULL,
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (collection, key)
);
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection);
"#;

/// SQLite-backed document store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database and ensures the schema.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        info!(path = %config.database_path.display(), "Opening document store");

        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        let store = SqliteStore { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Opens an ephemeral in-memory database (tests, demos).
    ///
    /// Capped at one connection: each SQLite `:memory:` connection is its
    /// own database, so a pool of them would not share data.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .journal_mode(SqliteJournalMode::Memory);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = SqliteStore { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Closes the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Document store schema ready");
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ?1 AND key = ?2")
            .bind(collection)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: String = row.try_get("body")?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn scan(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let rows =
            sqlx::query("SELECT key, body FROM documents WHERE collection = ?1 ORDER BY key")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key")?;
            let body: String = row.try_get("body")?;
            let body: Value =
                serde_json::from_str(&body).map_err(|e| StoreError::InvalidDocument {
                    collection: collection.to_string(),
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            documents.push(Document { key, body });
        }
        Ok(documents)
    }

    async fn append(&self, collection: &str, body: &Value) -> StoreResult<String> {
        let key = Uuid::new_v4().to_string();
        self.put(collection, &key, body).await?;
        Ok(key)
    }

    async fn put(&self, collection: &str, key: &str, body: &Value) -> StoreResult<()> {
        let body_text = serde_json::to_string(body)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, key, body, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (collection, key) DO UPDATE SET body = excluded.body
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(body_text)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(collection = %collection, key = %key, "Document written");
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM documents WHERE collection = ?1 AND key = ?2")
            .bind(collection)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_roundtrip() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store
            .put("products", "A01", &json!({"name": "Teh Botol", "price": 4000}))
            .await
            .unwrap();

        let body = store.get("products", "A01").await.unwrap().unwrap();
        assert_eq!(body["name"], "Teh Botol");
        assert_eq!(body["price"], 4000);
    }

    #[tokio::test]
    async fn test_missing_is_none() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert!(store.get("products", "NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_body() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store.put("local", "k", &json!({"v": 1})).await.unwrap();
        store.put("local", "k", &json!({"v": 2})).await.unwrap();

        let body = store.get("local", "k").await.unwrap().unwrap();
        assert_eq!(body["v"], 2);
    }

    #[tokio::test]
    async fn test_scan_returns_all_documents() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store.put("products", "B02", &json!({"n": 2})).await.unwrap();
        store.put("products", "A01", &json!({"n": 1})).await.unwrap();
        store.put("users", "budi", &json!({})).await.unwrap();

        let docs = store.scan("products").await.unwrap();
        assert_eq!(docs.len(), 2);
        // Keyed order, not insertion order
        assert_eq!(docs[0].key, "A01");
        assert_eq!(docs[1].key, "B02");
    }

    #[tokio::test]
    async fn test_append_then_scan() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        let key = store
            .append("transactions", &json!({"totalItems": 5}))
            .await
            .unwrap();

        let docs = store.scan("transactions").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].key, key);
    }
}
