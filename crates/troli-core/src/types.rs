//! # Domain Types
//!
//! Core domain types used throughout Troli POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   ScanPayload   │   │  SessionPhase   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (canonical) │   │  Id(String)     │   │  Unassigned     │       │
//! │  │  name           │   │  Numeric(i64)   │   │  AssignedUnpaid │       │
//! │  │  price (Money)  │   │  Object{id|...} │   │  AssignedPaid   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ScanPayload is decoded ONCE at the broker boundary; downstream code   │
//! │  only ever sees a canonical product id string.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// Immutable once fetched: the catalog is the source of truth and the cart
/// freezes a snapshot of `name`/`price` when a line is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Canonical identifier (trimmed, uppercased barcode or SKU).
    pub id: String,

    /// Display name shown to the shopper and on the cashier terminal.
    pub name: String,

    /// Unit price in whole currency units.
    pub price: Money,
}

impl Product {
    /// Creates a product record with a canonicalized identifier.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        Product {
            id: canonical_product_id(&id.into()),
            name: name.into(),
            price,
        }
    }
}

/// Canonical form of a product identifier: trimmed and uppercased.
///
/// Scanners on the floor emit a mix of cases; the catalog stores uppercase
/// keys, so every lookup path funnels through this one function.
pub fn canonical_product_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

// =============================================================================
// Scan Payload (inbound wire shapes)
// =============================================================================

/// The shapes a scanned/typed product identifier arrives in on the
/// `{id}/IDProducts` topic.
///
/// Cashier-side hardware is inconsistent: barcode bridges publish bare JSON
/// strings, keypads publish numbers, and the handheld app publishes an
/// object. All three are accepted; anything else is "no identifier".
#[derive(Debug, Clone, PartialEq)]
pub enum ScanPayload {
    /// A bare string identifier: `"A01"`.
    Id(String),
    /// A numeric identifier, coerced to its decimal string: `42` -> `"42"`.
    Numeric(i64),
    /// An object carrying `id` or `productId`.
    Object { id: String },
}

impl ScanPayload {
    /// Decodes a raw JSON value into one of the accepted shapes.
    ///
    /// Returns `None` for null, booleans, floats, arrays, and objects
    /// without an `id`/`productId` field.
    pub fn from_value(value: &Value) -> Option<ScanPayload> {
        match value {
            Value::String(s) => Some(ScanPayload::Id(s.clone())),
            Value::Number(n) => n.as_i64().map(ScanPayload::Numeric),
            Value::Object(map) => {
                let field = map.get("id").or_else(|| map.get("productId"))?;
                match field {
                    Value::String(s) => Some(ScanPayload::Object { id: s.clone() }),
                    Value::Number(n) => n.as_i64().map(|n| ScanPayload::Object {
                        id: n.to_string(),
                    }),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Extracts the canonical product identifier, if any.
    ///
    /// Whitespace-only identifiers normalize to `None` rather than an empty
    /// key that would never match the catalog.
    pub fn canonical_id(&self) -> Option<String> {
        let raw = match self {
            ScanPayload::Id(s) => s.clone(),
            ScanPayload::Numeric(n) => n.to_string(),
            ScanPayload::Object { id } => id.clone(),
        };

        let canonical = canonical_product_id(&raw);
        if canonical.is_empty() {
            None
        } else {
            Some(canonical)
        }
    }
}

/// Single normalization point for inbound scan payloads.
///
/// This is the ONLY place raw wire shapes are inspected; everything past
/// this function works with a canonical id string or skips the message.
///
/// ## Example
/// ```rust
/// use serde_json::json;
/// use troli_core::types::product_id_from_value;
///
/// assert_eq!(product_id_from_value(&json!("a01")), Some("A01".into()));
/// assert_eq!(product_id_from_value(&json!(42)), Some("42".into()));
/// assert_eq!(product_id_from_value(&json!({"productId": "b-2"})), Some("B-2".into()));
/// assert_eq!(product_id_from_value(&json!([1, 2])), None);
/// ```
pub fn product_id_from_value(value: &Value) -> Option<String> {
    ScanPayload::from_value(value).and_then(|p| p.canonical_id())
}

// =============================================================================
// Session Phase
// =============================================================================

/// Derived view of a cart session's lifecycle position.
///
/// ```text
/// Unassigned ──assign_session──► AssignedUnpaid ──mark_paid──► AssignedPaid
///     ▲                                │                            │
///     └────────────reset───────────────┴──────────reset────────────┘
/// ```
///
/// There is no edge from `Unassigned` straight to `AssignedPaid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No cart number assigned yet.
    Unassigned,
    /// Cart number assigned, waiting for the cashier confirmation.
    AssignedUnpaid,
    /// Payment confirmed by the cashier.
    AssignedPaid,
}

// =============================================================================
// Unit Tests
// =============================================================================
