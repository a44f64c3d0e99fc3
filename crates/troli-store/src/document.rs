//! # Document Store Trait
//!
//! The key-value document interface the rest of the system is written
//! against, plus an in-memory implementation for tests.
//!
//! ## Why a Trait?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    DocumentStore Injection                              │
//! │                                                                         │
//! │   Production                       Tests                                │
//! │   ──────────                       ─────                                │
//! │   SqliteStore (pool, WAL)          MemoryStore (HashMap)                │
//! │        │                                │                               │
//! │        └────────────┬───────────────────┘                               │
//! │                     ▼                                                   │
//! │          ProductRepository<S> / CatalogResolver<S> / ...               │
//! │                                                                         │
//! │  The store is an explicitly owned, injectable value with its own       │
//! │  lifecycle - never process-wide state - so every consumer can be       │
//! │  exercised against MemoryStore without touching a database.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Document
// =============================================================================

/// A document returned by a collection scan: its key plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Key within the collection.
    pub key: String,

    /// JSON body.
    pub body: Value,
}

// =============================================================================
// Document Store Trait
// =============================================================================

/// The key-value document read/write interface (the external collaborator
/// surface of the system).
///
/// Implementations are cheap to clone (pool/Arc handles) so repositories
/// can each hold their own copy.
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Reads a document by key. Missing documents are `Ok(None)`, never an
    /// error - callers must be able to tell "absent" from "store down".
    fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = StoreResult<Option<Value>>> + Send;

    /// Reads every document in a collection (client-side filtering is the
    /// caller's job, matching the collaborator's scan-all contract).
    fn scan(&self, collection: &str) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Appends a document under a freshly generated key and returns it.
    fn append(
        &self,
        collection: &str,
        body: &Value,
    ) -> impl Future<Output = StoreResult<String>> + Send;

    /// Writes a document at a specific key, replacing any existing body.
    fn put(
        &self,
        collection: &str,
        key: &str,
        body: &Value,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Deletes a document. Deleting a missing key is not an error.
    fn delete(&self, collection: &str, key: &str) -> impl Future<Output = StoreResult<()>> + Send;
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// HashMap-backed document store for tests and ephemeral sessions.
///
/// Collections are `BTreeMap`s so scans are deterministic. The `failing`
/// flag lets tests exercise the store-failure paths, which must stay
/// distinguishable from "no results".
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, BTreeMap<String, Value>>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// When set, every operation fails with a backend error until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Backend("memory store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        self.check_available()?;
        let guard = self.inner.lock().expect("memory store lock poisoned");
        Ok(guard.get(collection).and_then(|c| c.get(key)).cloned())
    }

    async fn scan(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.check_available()?;
        let guard = self.inner.lock().expect("memory store lock poisoned");
        Ok(guard
            .get(collection)
            .map(|c| {
                c.iter()
                    .map(|(key, body)| Document {
                        key: key.clone(),
                        body: body.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn append(&self, collection: &str, body: &Value) -> StoreResult<String> {
        self.check_available()?;
        let key = Uuid::new_v4().to_string();
        let mut guard = self.inner.lock().expect("memory store lock poisoned");
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(key.clone(), body.clone());
        Ok(key)
    }

    async fn put(&self, collection: &str, key: &str, body: &Value) -> StoreResult<()> {
        self.check_available()?;
        let mut guard = self.inner.lock().expect("memory store lock poisoned");
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), body.clone());
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut guard = self.inner.lock().expect("memory store lock poisoned");
        if let Some(c) = guard.get_mut(collection) {
            c.remove(key);
        }
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
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("products", "A01").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        store
            .put("products", "A01", &json!({"name": "Teh", "price": 4000}))
            .await
            .unwrap();

        let body = store.get("products", "A01").await.unwrap().unwrap();
        assert_eq!(body["name"], "Teh");
    }

    #[tokio::test]
    async fn test_append_generates_unique_keys() {
        let store = MemoryStore::new();
        let k1 = store.append("transactions", &json!({"n": 1})).await.unwrap();
        let k2 = store.append("transactions", &json!({"n": 2})).await.unwrap();

        assert_ne!(k1, k2);
        assert_eq!(store.scan("transactions").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.put("local", "currentUser", &json!({})).await.unwrap();

        store.delete("local", "currentUser").await.unwrap();
        store.delete("local", "currentUser").await.unwrap();
        assert_eq!(store.get("local", "currentUser").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failing_store_errors_distinctly() {
        let store = MemoryStore::new();
        store.set_failing(true);

        let err = store.get("products", "A01").await.unwrap_err();
        assert!(err.is_retryable());

        store.set_failing(false);
        assert!(store.get("products", "A01").await.is_ok());
    }
}
