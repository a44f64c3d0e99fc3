//! # Wire Protocol
//!
//! Payload types and topic naming for the tablet ↔ cashier broker link.
//!
//! ## Topic Namespace
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Topic Namespace for Cart Session "007"                     │
//! │                                                                         │
//! │  INBOUND (cashier/scanner → tablet)                                    │
//! │  ──────────────────────────────────                                    │
//! │  007/IDProducts      ──► product identifiers (string|number|object)    │
//! │  007/payment-status  ──► { status, paymentMethod, totalAmount }        │
//! │                                                                         │
//! │  OUTBOUND (tablet → cashier, every 1 s while unpaid)                   │
//! │  ───────────────────────────────────────────────────                   │
//! │  007/payment         ──► { id, items: [{ id, qty }] }                  │
//! │                                                                         │
//! │  Snapshots deliberately OMIT prices: the cashier terminal is the      │
//! │  pricing authority and re-prices every item itself.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! JSON-encoded text on all three topics, camelCase field names, no version
//! field - schema changes are not backward compatible.

use serde::{Deserialize, Serialize};

use troli_core::CartSession;

/// The only payment status value that triggers the paid transition.
pub const STATUS_PAID: &str = "paid";

// =============================================================================
// Topic Namespace
// =============================================================================

/// The three broker topics derived from one session identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    /// Inbound scanned/typed product identifiers.
    pub scans: String,

    /// Outbound cart snapshots.
    pub snapshot: String,

    /// Inbound payment confirmations.
    pub status: String,
}

impl TopicSet {
    /// Derives the topic namespace for a session identifier.
    pub fn for_session(session_id: &str) -> Self {
        TopicSet {
            scans: format!("{}/IDProducts", session_id),
            snapshot: format!("{}/payment", session_id),
            status: format!("{}/payment-status", session_id),
        }
    }
}

// =============================================================================
// Outbound Snapshot
// =============================================================================

/// One line of an outbound snapshot: product identifier and quantity only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotItem {
    /// Canonical product identifier.
    pub id: String,

    /// Quantity in the cart.
    pub qty: u32,
}

/// The outbound message representing current cart contents at publish time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// Identifier of the paying party (the logged-in operator).
    pub id: String,

    /// Cart lines in insertion order.
    pub items: Vec<SnapshotItem>,
}

impl CartSnapshot {
    /// Builds a snapshot from the CURRENT cart contents.
    ///
    /// Callers must build at publish time, never cache: the whole point of
    /// the periodic publisher is that each tick reflects the live cart.
    pub fn from_session(payer_id: &str, session: &CartSession) -> Self {
        CartSnapshot {
            id: payer_id.to_string(),
            items: session
                .lines()
                .iter()
                .map(|line| SnapshotItem {
                    id: line.product_id.clone(),
                    qty: line.quantity,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Inbound Payment Status
// =============================================================================

/// A payment confirmation from the cashier terminal.
///
/// Only `status` is required; `"paid"` triggers the paid transition and any
/// other value is ignored (not an error). The remaining fields feed the
/// user-visible confirmation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
    /// Status value; `"paid"` is the only one acted on.
    pub status: String,

    /// How the shopper paid ("cash", "qris", ...), if the cashier sent it.
    #[serde(default)]
    pub payment_method: Option<String>,

    /// Amount collected, if the cashier sent it.
    #[serde(default)]
    pub total_amount: Option<u64>,
}

impl PaymentStatus {
    /// Whether this confirmation marks the session paid.
    pub fn is_paid(&self) -> bool {
        self.status == STATUS_PAID
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
