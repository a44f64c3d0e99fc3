//! # Transaction Repository
//!
//! Append-only log of completed transactions. After the cashier confirms
//! payment, the session is persisted here and only then reset; a write
//! failure leaves the in-memory cart untouched so the save can be retried.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use troli_core::{CartSession, CoreError, Money};

use crate::document::DocumentStore;
use crate::error::StoreResult;
use crate::TRANSACTIONS;

// =============================================================================
// Record Shapes
// =============================================================================

/// One line of a persisted transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItem {
    /// Canonical product identifier.
    pub id: String,

    /// Product name at time of sale (frozen).
    pub name: String,

    /// Unit price at time of sale (frozen).
    pub price: Money,

    /// Quantity sold.
    pub qty: u32,

    /// price × qty for this line.
    pub subtotal: Money,
}

/// A persisted transaction document (`transactions/{auto-id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// The 3-digit cart number the session ran under.
    pub cart_number: String,

    /// The cart lines at completion time.
    pub items: Vec<TransactionItem>,

    /// Sum of quantities.
    pub total_items: u64,

    /// Sum of subtotals.
    pub total_price: Money,

    /// When payment was confirmed (RFC 3339).
    pub timestamp: String,

    /// When this record was written (RFC 3339).
    pub created_at: String,
}

impl TransactionRecord {
    /// Builds a record from a cart session.
    ///
    /// Requires an assigned session; the items and totals are taken from
    /// the live cart contents at call time.
    pub fn from_session(session: &CartSession) -> Result<Self, CoreError> {
        let cart_number = session
            .session_id()
            .ok_or(CoreError::CartNotAssigned)?
            .to_string();

        let items = session
            .lines()
            .iter()
            .map(|line| TransactionItem {
                id: line.product_id.clone(),
                name: line.name.clone(),
                price: line.unit_price,
                qty: line.quantity,
                subtotal: line.line_total(),
            })
            .collect();

        let now = Utc::now().to_rfc3339();

        Ok(TransactionRecord {
            cart_number,
            items,
            total_items: session.total_items(),
            total_price: session.total_price(),
            timestamp: now.clone(),
            created_at: now,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the completed-transaction log.
#[derive(Debug, Clone)]
pub struct TransactionRepository<S> {
    store: S,
}

impl<S: DocumentStore> TransactionRepository<S> {
    /// Creates a new TransactionRepository over the given store.
    pub fn new(store: S) -> Self {
        TransactionRepository { store }
    }

    /// Appends a completed session to the log and returns the document key.
    pub async fn record(&self, record: &TransactionRecord) -> StoreResult<String> {
        let body = serde_json::to_value(record)?;
        let key = self.store.append(TRANSACTIONS, &body).await?;

        info!(
            cart = %record.cart_number,
            total = %record.total_price,
            key = %key,
            "Transaction persisted"
        );
        Ok(key)
    }

    /// Lists all persisted transactions, most recent first.
    pub async fn list(&self) -> StoreResult<Vec<TransactionRecord>> {
        let documents = self.store.scan(TRANSACTIONS).await?;

        let mut records: Vec<TransactionRecord> = documents
            .into_iter()
            .filter_map(|doc| serde_json::from_value(doc.body).ok())
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
