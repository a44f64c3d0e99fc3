//! # Error Types
//!
//! Domain-specific error types for troli-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  troli-core errors (this file)                                         │
//! │  ├── CoreError        - Cart/session state machine violations          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  troli-store errors (separate crate)                                   │
//! │  └── StoreError       - Document store operation failures              │
//! │                                                                         │
//! │  troli-sync errors (separate crate)                                    │
//! │  └── SyncError        - Transport/resolution/decode failures           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → host reporting        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, cart number, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent cart state machine violations. They are non-fatal:
/// the cart keeps its previous state and the host reports the message inline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The product is not in the cart.
    ///
    /// ## When This Occurs
    /// - Quantity controls fired for a line that was just removed
    /// - A remove/increment raced a session reset
    #[error("Product not in cart: {0}")]
    ProductNotInCart(String),

    /// An operation required an assigned session.
    ///
    /// ## When This Occurs
    /// - `mark_paid` before an operator saved a cart number
    /// - Persisting a transaction for an unassigned cart
    #[error("No cart number assigned")]
    CartNotAssigned,

    /// The session is already paid and cannot be modified.
    #[error("Cart {0} is already paid")]
    AlreadyPaid(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before the state machine runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., non-numeric cart number input).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
