//! # troli-sync: Cart Synchronization Engine for Troli POS
//!
//! This crate synchronizes a shopper-facing cart to a cashier terminal over
//! a publish/subscribe broker and receives the asynchronous payment
//! confirmation back.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cart Synchronization Engine                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                       SyncDriver (driver.rs)                     │  │
//! │  │                                                                  │  │
//! │  │  Binds one cart session to its topic namespace and runs the     │  │
//! │  │  1 s snapshot publisher                                          │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ MqttTransport  │  │CatalogResolver │  │ SubscriptionRegistry   │    │
//! │  │                │  │                │  │                        │    │
//! │  │ one broker     │  │ id lookups +   │  │ topic -> handlers with │    │
//! │  │ connection,    │  │ 300 ms         │  │ capability tokens for  │    │
//! │  │ 2 s constant   │  │ debounced      │  │ precise removal        │    │
//! │  │ reconnect      │  │ name search    │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  DATA FLOW                                                             │
//! │  ─────────                                                             │
//! │  scan on {id}/IDProducts → resolver → CartSession.add_product          │
//! │  1 s tick (assigned ∧ non-empty ∧ connected ∧ unpaid)                  │
//! │      → CartSnapshot → {id}/payment                                     │
//! │  {status:"paid"} on {id}/payment-status → mark_paid (exactly once)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`driver`] - `SyncDriver`: session↔topic binding, event loop, publisher
//! - [`transport`] - MQTT client with reconnection; the `PubSub` seam
//! - [`registry`] - topic → handler fan-out with capability tokens
//! - [`catalog`] - catalog resolver and the debounced name search
//! - [`protocol`] - wire payloads and the per-session topic namespace
//! - [`config`] - layered TOML/env configuration
//! - [`error`] - sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use troli_sync::{
//!     CatalogResolver, DriverConfig, MqttTransport, NoOpEmitter, SharedCart,
//!     SyncConfig, SyncDriver,
//! };
//!
//! let config = SyncConfig::load_or_default(None)?;
//!
//! let transport = MqttTransport::new(config.transport_config());
//! transport.connect().await?;           // resolves exactly once
//!
//! let driver = SyncDriver::spawn(
//!     transport.clone(),
//!     SharedCart::new(),
//!     CatalogResolver::new(store),
//!     Arc::new(NoOpEmitter),
//!     DriverConfig::default(),
//! );
//!
//! driver.bind(7)?;                      // cart #007 goes live
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::{CatalogResolver, SearchDebouncer, SearchOutcome};
pub use config::{BrokerSettings, PublisherSettings, SearchSettings, SyncConfig};
pub use driver::{CartEventEmitter, DriverConfig, NoOpEmitter, SharedCart, SyncDriver};
pub use error::{SyncError, SyncResult};
pub use protocol::{CartSnapshot, PaymentStatus, SnapshotItem, TopicSet};
pub use registry::{HandlerToken, MessageHandler, SubscriptionRegistry};
pub use transport::{ConnectionState, MqttTransport, PubSub, TransportConfig};
