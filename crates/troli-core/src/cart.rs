//! # Cart State Machine
//!
//! The authoritative in-memory cart for one shopping session.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Session State Machine                           │
//! │                                                                         │
//! │  ┌────────────┐  assign_session(n)  ┌────────────────┐                 │
//! │  │ Unassigned │ ──────────────────► │ AssignedUnpaid │                 │
//! │  └────────────┘                     └───────┬────────┘                 │
//! │        ▲                                    │                           │
//! │        │                          mark_paid │                           │
//! │        │                                    ▼                           │
//! │        │                            ┌──────────────┐                    │
//! │        └──────────── reset ──────── │ AssignedPaid │                    │
//! │        (also legal from unpaid)     └──────────────┘                    │
//! │                                                                         │
//! │  NO direct edge Unassigned → AssignedPaid.                             │
//! │  mark_paid is one-way; only reset returns to Unassigned.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Line Invariants
//! - At most one CartLine per product identifier (adding merges quantity)
//! - Quantity is always >= 1; decrement at 1 is a no-op, never a delete
//! - `remove` is the only operation that deletes a line
//! - Totals are computed from the lines, never cached

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Product, SessionPhase};
use crate::validation::validate_cart_number;

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the shopping cart.
///
/// ## Design Notes
/// - `product_id`: the canonical catalog key for this line
/// - `name`/`unit_price`: frozen copies of the product data at add time,
///   so the cart keeps displaying consistent data even if the catalog
///   changes mid-session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Canonical product identifier.
    pub product_id: String,

    /// Product name at time of adding (frozen).
    pub name: String,

    /// Unit price at time of adding (frozen).
    pub unit_price: Money,

    /// Quantity in cart, always >= 1.
    pub quantity: u32,

    /// When this line was first added.
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a new cart line from a product with quantity 1.
    fn from_product(product: &Product) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
            added_at: Utc::now(),
        }
    }

    /// Line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart Session
// =============================================================================

/// One shopping session: an ordered set of lines keyed by product id,
/// an optional cart number, and the paid flag.
///
/// Lines keep insertion order (the order the shopper added products), which
/// is also the order snapshots are published in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSession {
    /// Lines in the cart, unique by product_id, insertion-ordered.
    lines: Vec<CartLine>,

    /// Zero-padded 3-digit cart number ("001"-"100"), set by the operator.
    session_id: Option<String>,

    /// Whether the cashier has confirmed payment.
    paid: bool,
}

impl CartSession {
    /// Creates a new, unassigned, empty session.
    pub fn new() -> Self {
        CartSession::default()
    }

    // =========================================================================
    // Line Mutations
    // =========================================================================

    /// Adds a product to the cart, merging into an existing line.
    ///
    /// This is the single merge point for scanned AND searched additions:
    /// a line already present gets quantity += 1, otherwise a new line with
    /// quantity 1 is appended. Repeated scans of the same code accumulate
    /// quantity; that is intentional behavior, not a bug.
    pub fn add_product(&mut self, product: &Product) {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product.id)
        {
            line.quantity = line.quantity.saturating_add(1);
            return;
        }

        self.lines.push(CartLine::from_product(product));
    }

    /// Increases a line's quantity by 1.
    pub fn increment(&mut self, product_id: &str) -> CoreResult<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotInCart(product_id.to_string()))?;

        line.quantity = line.quantity.saturating_add(1);
        Ok(())
    }

    /// Decreases a line's quantity by 1, flooring at 1.
    ///
    /// Decrement at quantity 1 is a no-op, NOT a delete; removing the line
    /// is an explicit user action via [`CartSession::remove`].
    pub fn decrement(&mut self, product_id: &str) -> CoreResult<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotInCart(product_id.to_string()))?;

        if line.quantity > 1 {
            line.quantity -= 1;
        }
        Ok(())
    }

    /// Deletes a line unconditionally, regardless of its quantity.
    pub fn remove(&mut self, product_id: &str) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == before {
            Err(CoreError::ProductNotInCart(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Session Transitions
    // =========================================================================

    /// Assigns a cart number to this session.
    ///
    /// Validates the number is in [1, 100] and stores it zero-padded to
    /// 3 digits. Reassigning an already-paid session is rejected; the UI
    /// disables the input once paid, and the state machine backs that up.
    pub fn assign_session(&mut self, number: i64) -> CoreResult<()> {
        if self.paid {
            let id = self.session_id.clone().unwrap_or_default();
            return Err(CoreError::AlreadyPaid(id));
        }

        let formatted = validate_cart_number(number)?;
        self.session_id = Some(formatted);
        Ok(())
    }

    /// Marks the session paid.
    ///
    /// One-way transition, only reachable from assigned-unpaid. Returns
    /// `true` when the transition actually happened and `false` when the
    /// session was already paid, so duplicate confirmation deliveries
    /// collapse to a single transition.
    pub fn mark_paid(&mut self) -> CoreResult<bool> {
        if self.session_id.is_none() {
            return Err(CoreError::CartNotAssigned);
        }

        if self.paid {
            return Ok(false);
        }

        self.paid = true;
        Ok(true)
    }

    /// Clears all lines, the session identifier, and the paid flag.
    ///
    /// Returns the session to unassigned; legal from either assigned state.
    pub fn reset(&mut self) {
        self.lines.clear();
        self.session_id = None;
        self.paid = false;
    }

    // =========================================================================
    // Derived Values
    // =========================================================================

    /// The zero-padded cart number, if assigned.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether the cashier has confirmed payment.
    pub fn is_paid(&self) -> bool {
        self.paid
    }

    /// Current lifecycle phase, derived from session id + paid flag.
    pub fn phase(&self) -> SessionPhase {
        match (&self.session_id, self.paid) {
            (None, _) => SessionPhase::Unassigned,
            (Some(_), false) => SessionPhase::AssignedUnpaid,
            (Some(_), true) => SessionPhase::AssignedPaid,
        }
    }

    /// The cart lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when the cart holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities across all lines. Computed, never stored.
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|l| l.quantity as u64).sum()
    }

    /// Sum of price × quantity across all lines. Computed, never stored.
    pub fn total_price(&self) -> Money {
        self.lines.iter().map(|l| l.line_total()).sum()
    }

    /// Validates a mutation is allowed: unassigned carts can still be
    /// edited (the shopper may scan before saving a number), but a paid
    /// cart is frozen until reset.
    pub fn ensure_unpaid(&self) -> CoreResult<()> {
        if self.paid {
            let id = self.session_id.clone().unwrap_or_default();
            return Err(CoreError::AlreadyPaid(id));
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

    fn test_product(id: &str, price: u64) -> Product {
        Product::new(id, format!("Product {}", id), Money::from_units(price))
    }

    #[test]
    fn test_add_product_repeated_accumulates() {
        let mut cart = CartSession::new();
        let product = test_product("A01", 5_000);

        for _ in 0..4 {
            cart.add_product(&product);
        }

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 4);
    }

    #[test]
    fn test_add_two_products_keeps_order() {
        let mut cart = CartSession::new();
        cart.add_product(&test_product("A01", 5_000));
        cart.add_product(&test_product("B02", 3_000));
        cart.add_product(&test_product("A01", 5_000));

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.lines()[0].product_id, "A01");
        assert_eq!(cart.lines()[1].product_id, "B02");
    }

    #[test]
    fn test_decrement_floors_at_one() {
        let mut cart = CartSession::new();
        cart.add_product(&test_product("A01", 5_000));

        cart.decrement("A01").unwrap();
        assert_eq!(cart.lines()[0].quantity, 1);

        // Still present after repeated decrements
        cart.decrement("A01").unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_increment_and_decrement() {
        let mut cart = CartSession::new();
        cart.add_product(&test_product("A01", 5_000));

        cart.increment("A01").unwrap();
        cart.increment("A01").unwrap();
        assert_eq!(cart.lines()[0].quantity, 3);

        cart.decrement("A01").unwrap();
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_remove_deletes_regardless_of_quantity() {
        let mut cart = CartSession::new();
        let product = test_product("A01", 5_000);
        for _ in 0..5 {
            cart.add_product(&product);
        }

        cart.remove("A01").unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_unknown_product_errors() {
        let mut cart = CartSession::new();
        assert!(matches!(
            cart.increment("NOPE"),
            Err(CoreError::ProductNotInCart(_))
        ));
        assert!(matches!(
            cart.decrement("NOPE"),
            Err(CoreError::ProductNotInCart(_))
        ));
        assert!(matches!(
            cart.remove("NOPE"),
            Err(CoreError::ProductNotInCart(_))
        ));
    }

    #[test]
    fn test_assign_session_validation() {
        let mut cart = CartSession::new();

        assert!(cart.assign_session(0).is_err());
        assert!(cart.assign_session(101).is_err());
        assert!(cart.assign_session(-5).is_err());
        assert_eq!(cart.phase(), SessionPhase::Unassigned);

        cart.assign_session(7).unwrap();
        assert_eq!(cart.session_id(), Some("007"));
        assert_eq!(cart.phase(), SessionPhase::AssignedUnpaid);

        cart.assign_session(100).unwrap();
        assert_eq!(cart.session_id(), Some("100"));
    }

    #[test]
    fn test_mark_paid_requires_assignment() {
        let mut cart = CartSession::new();
        assert!(matches!(cart.mark_paid(), Err(CoreError::CartNotAssigned)));

        cart.assign_session(7).unwrap();
        assert_eq!(cart.mark_paid().unwrap(), true);
        assert_eq!(cart.phase(), SessionPhase::AssignedPaid);
    }

    #[test]
    fn test_mark_paid_is_idempotent() {
        let mut cart = CartSession::new();
        cart.assign_session(7).unwrap();

        assert!(cart.mark_paid().unwrap());
        // Second confirmation delivery: no second transition
        assert!(!cart.mark_paid().unwrap());
        assert!(cart.is_paid());
    }

    #[test]
    fn test_reassign_paid_session_rejected() {
        let mut cart = CartSession::new();
        cart.assign_session(7).unwrap();
        cart.mark_paid().unwrap();

        assert!(matches!(
            cart.assign_session(8),
            Err(CoreError::AlreadyPaid(_))
        ));
        assert_eq!(cart.session_id(), Some("007"));
    }

    #[test]
    fn test_reset_returns_to_unassigned() {
        let mut cart = CartSession::new();
        cart.add_product(&test_product("A01", 5_000));
        cart.assign_session(42).unwrap();
        cart.mark_paid().unwrap();

        cart.reset();

        assert!(cart.is_empty());
        assert_eq!(cart.session_id(), None);
        assert!(!cart.is_paid());
        assert_eq!(cart.phase(), SessionPhase::Unassigned);
    }

    #[test]
    fn test_totals_reflect_lines_exactly() {
        let mut cart = CartSession::new();
        let a = test_product("A01", 10_000);
        let b = test_product("B02", 7_500);

        cart.add_product(&a);
        cart.add_product(&a);
        cart.add_product(&b);
        cart.add_product(&b);
        cart.add_product(&b);

        assert_eq!(cart.total_items(), 5);
        assert_eq!(
            cart.total_price(),
            Money::from_units(2 * 10_000 + 3 * 7_500)
        );
    }

    #[test]
    fn test_totals_empty_cart() {
        let cart = CartSession::new();
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_price(), Money::zero());
    }
}
