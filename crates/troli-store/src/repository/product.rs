//! # Product Repository
//!
//! Catalog reads against the `products` collection.
//!
//! ## Lookup Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Catalog Lookups Work                             │
//! │                                                                         │
//! │  Scanner sends: " a01 "                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  canonicalize: trim + uppercase → "A01"                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  read products/A01 → {name, price} → Product      (missing → None)     │
//! │                                                                         │
//! │  Name search: scan the whole collection, case-insensitive substring    │
//! │  match on `name`, client side. The catalog is small enough (hundreds   │
//! │  of SKUs) that a scan per debounced keystroke is fine.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use troli_core::validation::validate_product_id;
use troli_core::{Money, Product};

use crate::document::DocumentStore;
use crate::error::{StoreError, StoreResult};
use crate::PRODUCTS;

/// Body shape of a `products/{id}` document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductDoc {
    name: String,
    price: u64,
}

/// Repository for catalog reads.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(store);
///
/// // Identifier lookup (scan / typed entry)
/// let product = repo.get_by_id(" a01 ").await?;
///
/// // Name search (search box)
/// let matches = repo.search_by_name("teh").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository<S> {
    store: S,
}

impl<S: DocumentStore> ProductRepository<S> {
    /// Creates a new ProductRepository over the given store.
    pub fn new(store: S) -> Self {
        ProductRepository { store }
    }

    /// Resolves a raw identifier into a product record.
    ///
    /// The identifier is canonicalized (trim + uppercase) before lookup.
    /// A missing record is `Ok(None)`; only store-level failures are `Err`.
    pub async fn get_by_id(&self, raw_id: &str) -> StoreResult<Option<Product>> {
        let id = match validate_product_id(raw_id) {
            Ok(id) => id,
            // Whitespace-only scanner noise resolves to "not found"
            Err(_) => return Ok(None),
        };

        debug!(id = %id, "Catalog lookup");

        let Some(body) = self.store.get(PRODUCTS, &id).await? else {
            return Ok(None);
        };

        let doc: ProductDoc =
            serde_json::from_value(body).map_err(|e| StoreError::InvalidDocument {
                collection: PRODUCTS.to_string(),
                key: id.clone(),
                reason: e.to_string(),
            })?;

        Ok(Some(Product::new(id, doc.name, Money::from_units(doc.price))))
    }

    /// Searches products by name: case-insensitive substring match.
    ///
    /// Returns an empty vec for no matches. Store failures propagate -
    /// they must never be mistaken for "no results".
    pub async fn search_by_name(&self, query: &str) -> StoreResult<Vec<Product>> {
        let needle = query.trim().to_lowercase();

        debug!(query = %needle, "Catalog name search");

        let documents = self.store.scan(PRODUCTS).await?;
        let mut results = Vec::new();

        for doc in documents {
            // Malformed catalog entries are skipped, not fatal: one bad
            // document must not take the whole search box down.
            let Ok(parsed) = serde_json::from_value::<ProductDoc>(doc.body) else {
                debug!(key = %doc.key, "Skipping malformed product document");
                continue;
            };

            if parsed.name.to_lowercase().contains(&needle) {
                results.push(Product::new(
                    doc.key,
                    parsed.name,
                    Money::from_units(parsed.price),
                ));
            }
        }

        Ok(results)
    }

    /// Seeds a product document (admin/import tooling and tests).
    pub async fn upsert(&self, product: &Product) -> StoreResult<()> {
        let body = serde_json::to_value(ProductDoc {
            name: product.name.clone(),
            price: product.price.units(),
        })?;
        self.store.put(PRODUCTS, &product.id, &body).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
