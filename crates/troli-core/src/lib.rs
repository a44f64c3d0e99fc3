//! # troli-core: Pure Business Logic for Troli POS
//!
//! This crate is the **heart** of the Troli cart engine. It contains all
//! business logic as pure functions and types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Troli POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Tablet / Cashier Hosts                       │   │
//! │  │    Scan events ──► Cart screen ──► Payment confirmation        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    troli-sync (MQTT engine)                     │   │
//! │  │    transport, subscription registry, snapshot publisher         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ troli-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │CartSession│  │   rules   │  │   │
//! │  │   │ScanPayload│  │ id-ID fmt │  │ CartLine  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, ScanPayload, SessionPhase)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - CartLine and the CartSession state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Document store, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are whole currency units (u64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use troli_core::cart::CartSession;
//! use troli_core::money::Money;
//! use troli_core::types::Product;
//!
//! let mut session = CartSession::new();
//! session.assign_session(7).unwrap();
//! assert_eq!(session.session_id(), Some("007"));
//!
//! let soda = Product::new("SKU-001", "Es Teh Manis", Money::from_units(5_000));
//! session.add_product(&soda);
//! session.add_product(&soda);
//!
//! assert_eq!(session.total_items(), 2);
//! assert_eq!(session.total_price(), Money::from_units(10_000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use troli_core::Money` instead of
// `use troli_core::money::Money`

pub use cart::{CartLine, CartSession};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::{product_id_from_value, Product, ScanPayload, SessionPhase};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Lowest cart number an operator can assign.
pub const CART_NUMBER_MIN: i64 = 1;

/// Highest cart number an operator can assign.
///
/// ## Business Reason
/// The store floor has 100 physical carts; the session identifier doubles
/// as the cart's printed label (001-100).
pub const CART_NUMBER_MAX: i64 = 100;

/// Width of the zero-padded session identifier ("007", "042", "100").
pub const CART_NUMBER_WIDTH: usize = 3;
