//! # troli-store: Document Store Layer for Troli POS
//!
//! This crate provides the document-store collaborator for the cart engine.
//! The store is deliberately dumb: collections of JSON bodies addressed by
//! key, with scan-and-filter on the client side. Anything smarter lives in
//! the repositories layered on top.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Troli POS Data Flow                              │
//! │                                                                         │
//! │  Catalog resolver / history screen / login                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     troli-store (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ DocumentStore │    │  Repositories │    │ LocalSession │  │   │
//! │  │   │  (the trait)  │    │ products      │    │ currentUser  │  │   │
//! │  │   │               │◄───│ transactions  │    │ key          │  │   │
//! │  │   │ Sqlite/Memory │    │ users         │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite `documents` table (collection, key, body, created_at)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`document`] - The `DocumentStore` trait and the in-memory implementation
//! - [`sqlite`] - SQLite-backed implementation (pool, WAL, schema)
//! - [`repository`] - Typed repositories (products, transactions, users)
//! - [`local`] - The single persisted local-state key (current user)
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use troli_store::{ProductRepository, SqliteStore, StoreConfig};
//!
//! let store = SqliteStore::open(StoreConfig::new("troli.db")).await?;
//! let products = ProductRepository::new(store.clone());
//!
//! // Missing records are Ok(None); store failures are Err(_)
//! if let Some(product) = products.get_by_id(" a01 ").await? {
//!     println!("{} - {}", product.name, product.price);
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod local;
pub mod repository;
pub mod sqlite;

// =============================================================================
// Re-exports
// =============================================================================

pub use document::{Document, DocumentStore, MemoryStore};
pub use error::{StoreError, StoreResult};
pub use local::{CurrentUser, LocalSession};
pub use repository::product::ProductRepository;
pub use repository::transaction::{TransactionItem, TransactionRecord, TransactionRepository};
pub use repository::user::{AuthenticatedUser, UserRepository};
pub use sqlite::{SqliteStore, StoreConfig};

// =============================================================================
// Collection Names
// =============================================================================

/// Catalog collection: `products/{id}` with `{name, price}` bodies.
pub const PRODUCTS: &str = "products";

/// Completed transaction log: append-only, auto-generated keys.
pub const TRANSACTIONS: &str = "transactions";

/// User records: `users/{username}`.
pub const USERS: &str = "users";

/// Device-local state (current user key). Not synchronized anywhere.
pub const LOCAL: &str = "local";
