//! # Catalog Resolver
//!
//! Resolves raw identifiers and free-text queries into product records.
//!
//! ## Search Debounce
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Debounced Name Search                                │
//! │                                                                         │
//! │  keystroke "t"    → under 2 chars → results cleared, no lookup         │
//! │  keystroke "te"   → timer armed (300 ms)                               │
//! │  keystroke "teh"  → previous timer CANCELLED, timer re-armed           │
//! │        │                                                                │
//! │        │  300 ms of quiescence                                         │
//! │        ▼                                                                │
//! │  store scan + substring filter → SearchOutcome::Results               │
//! │                                                                         │
//! │  A store failure is its own outcome, NEVER an empty result list.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use troli_core::Product;
use troli_store::{DocumentStore, ProductRepository};

use crate::error::SyncResult;

/// Minimum query length before a lookup is attempted.
pub const MIN_QUERY_LEN: usize = 2;

/// Input quiescence window before a lookup fires.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

// =============================================================================
// Resolver
// =============================================================================

/// Resolves identifiers and queries against the product catalog.
#[derive(Debug, Clone)]
pub struct CatalogResolver<S> {
    products: ProductRepository<S>,
}

impl<S: DocumentStore> CatalogResolver<S> {
    /// Creates a resolver over the given document store.
    pub fn new(store: S) -> Self {
        CatalogResolver {
            products: ProductRepository::new(store),
        }
    }

    /// Resolves a raw identifier to a product.
    ///
    /// The identifier is canonicalized before lookup; an unknown id is
    /// `Ok(None)` (reported to the user, cart unchanged) while a store
    /// failure is `Err` (a distinct failure mode).
    pub async fn resolve_by_id(&self, raw_id: &str) -> SyncResult<Option<Product>> {
        Ok(self.products.get_by_id(raw_id).await?)
    }

    /// Case-insensitive substring search over product names.
    pub async fn search(&self, query: &str) -> SyncResult<Vec<Product>> {
        Ok(self.products.search_by_name(query).await?)
    }
}

// =============================================================================
// Search Debouncer
// =============================================================================

/// Outcome of a debounced search, delivered on the outcome channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The query ran and produced these candidates (possibly none).
    Results {
        query: String,
        products: Vec<Product>,
    },

    /// Input fell below the minimum length; any shown results are stale.
    Cleared,

    /// The store failed; distinct from "no results" so the host can show
    /// a persistence error instead of an empty list.
    Failed { query: String, error: String },
}

/// Debounces keystrokes into catalog searches.
///
/// Each call to [`SearchDebouncer::input`] cancels the pending lookup (if
/// any) and re-arms the 300 ms timer; only 300 ms of quiescence lets a
/// lookup actually hit the store.
pub struct SearchDebouncer<S> {
    resolver: Arc<CatalogResolver<S>>,
    outcome_tx: mpsc::UnboundedSender<SearchOutcome>,
    window: Duration,
    min_len: usize,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<S: DocumentStore> SearchDebouncer<S> {
    /// Creates a debouncer with the default window and minimum length.
    /// Returns the debouncer and the outcome receiver.
    pub fn new(
        resolver: Arc<CatalogResolver<S>>,
    ) -> (Self, mpsc::UnboundedReceiver<SearchOutcome>) {
        Self::with_settings(resolver, DEBOUNCE_WINDOW, MIN_QUERY_LEN)
    }

    /// Creates a debouncer with explicit settings (config-driven hosts).
    pub fn with_settings(
        resolver: Arc<CatalogResolver<S>>,
        window: Duration,
        min_len: usize,
    ) -> (Self, mpsc::UnboundedReceiver<SearchOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        (
            SearchDebouncer {
                resolver,
                outcome_tx,
                window,
                min_len,
                pending: Mutex::new(None),
            },
            outcome_rx,
        )
    }

    /// Feeds a keystroke's worth of input.
    ///
    /// Cancels any pending lookup. Input shorter than the minimum length
    /// clears the results immediately and arms nothing.
    pub fn input(&self, query: &str) {
        self.cancel();

        let query = query.trim().to_string();
        if query.len() < self.min_len {
            let _ = self.outcome_tx.send(SearchOutcome::Cleared);
            return;
        }

        let resolver = self.resolver.clone();
        let outcome_tx = self.outcome_tx.clone();
        let window = self.window;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;

            debug!(query = %query, "Debounce window elapsed, searching");

            let outcome = match resolver.search(&query).await {
                Ok(products) => SearchOutcome::Results { query, products },
                Err(e) => {
                    warn!(error = %e, "Catalog search failed");
                    SearchOutcome::Failed {
                        query,
                        error: e.to_string(),
                    }
                }
            };

            let _ = outcome_tx.send(outcome);
        });

        *self.pending.lock().expect("debounce lock poisoned") = Some(handle);
    }

    /// Cancels the pending lookup, if any (screen exit, session teardown).
    pub fn cancel(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .expect("debounce lock poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

impl<S> Drop for SearchDebouncer<S> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .pending
            .lock()
            .expect("debounce lock poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use troli_store::{MemoryStore, PRODUCTS};

    async fn seeded_resolver() -> (Arc<CatalogResolver<MemoryStore>>, MemoryStore) {
        let store = MemoryStore::new();
        store
            .put(PRODUCTS, "A01", &json!({"name": "Teh Botol", "price": 4_000}))
            .await
            .unwrap();
        store
            .put(PRODUCTS, "A02", &json!({"name": "Teh Pucuk", "price": 3_500}))
            .await
            .unwrap();
        (Arc::new(CatalogResolver::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_resolve_by_id() {
        let (resolver, _) = seeded_resolver().await;

        let product = resolver.resolve_by_id(" a01 ").await.unwrap().unwrap();
        assert_eq!(product.name, "Teh Botol");

        assert!(resolver.resolve_by_id("Z99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_store_failure_is_error() {
        let (resolver, store) = seeded_resolver().await;
        store.set_failing(true);

        let err = resolver.resolve_by_id("A01").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_fires_after_quiescence() {
        let (resolver, _) = seeded_resolver().await;
        let (debouncer, mut rx) = SearchDebouncer::new(resolver);

        debouncer.input("teh");
        tokio::time::sleep(Duration::from_millis(350)).await;

        let outcome = rx.try_recv().unwrap();
        match outcome {
            SearchOutcome::Results { query, products } => {
                assert_eq!(query, "teh");
                assert_eq!(products.len(), 2);
            }
            other => panic!("expected results, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_keystroke_cancels_pending_lookup() {
        let (resolver, _) = seeded_resolver().await;
        let (debouncer, mut rx) = SearchDebouncer::new(resolver);

        debouncer.input("te");
        tokio::time::sleep(Duration::from_millis(100)).await;
        // Within the window: restarts the timer, the "te" lookup never runs
        debouncer.input("teh p");
        tokio::time::sleep(Duration::from_millis(350)).await;

        let outcome = rx.try_recv().unwrap();
        match outcome {
            SearchOutcome::Results { query, products } => {
                assert_eq!(query, "teh p");
                assert_eq!(products.len(), 1);
                assert_eq!(products[0].id, "A02");
            }
            other => panic!("expected results, got {:?}", other),
        }

        // Exactly one outcome: the cancelled lookup produced nothing
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_input_clears_without_lookup() {
        let (resolver, _) = seeded_resolver().await;
        let (debouncer, mut rx) = SearchDebouncer::new(resolver);

        debouncer.input("t");
        assert_eq!(rx.try_recv().unwrap(), SearchOutcome::Cleared);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_surfaces_as_failed_outcome() {
        let (resolver, store) = seeded_resolver().await;
        let (debouncer, mut rx) = SearchDebouncer::new(resolver);

        store.set_failing(true);
        debouncer.input("teh");
        tokio::time::sleep(Duration::from_millis(350)).await;

        match rx.try_recv().unwrap() {
            SearchOutcome::Failed { query, .. } => assert_eq!(query, "teh"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_lookup() {
        let (resolver, _) = seeded_resolver().await;
        let (debouncer, mut rx) = SearchDebouncer::new(resolver);

        debouncer.input("teh");
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err());
    }
}
