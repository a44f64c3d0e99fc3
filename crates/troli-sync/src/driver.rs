//! # Synchronization Driver
//!
//! Binds one cart session to its broker topic namespace and runs the
//! fixed-interval snapshot publisher.
//!
//! ## Driver Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncDriver Architecture                          │
//! │                                                                         │
//! │  bind("007")                                                           │
//! │    ├── unsubscribe OLD session topics (always first)                   │
//! │    ├── subscribe 007/IDProducts      ──┐                               │
//! │    └── subscribe 007/payment-status  ──┤ handlers forward into the     │
//! │                                        │ driver event channel          │
//! │                                        ▼                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      run loop (tokio task)                       │  │
//! │  │                                                                  │  │
//! │  │  Scan event    → normalize → resolve → cart.add_product          │  │
//! │  │  Status event  → "paid" → cart.mark_paid → confirmation (once)   │  │
//! │  │  1 s tick      → snapshot → publish 007/payment                  │  │
//! │  │                                                                  │  │
//! │  │  TICK GATE: session assigned ∧ cart non-empty ∧ connected        │  │
//! │  │             ∧ not yet paid                                       │  │
//! │  │  Snapshots are built from the LIVE cart at tick time, never      │  │
//! │  │  from a cached copy.                                             │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  reset()/rebind: old topics are unsubscribed BEFORE any new session's  │
//! │  topics are subscribed - a message on an old topic must never mutate   │
//! │  the new cart (no cross-talk between cart numbers).                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use troli_core::{product_id_from_value, CartSession, Product};
use troli_store::{DocumentStore, TransactionRecord, TransactionRepository};

use crate::catalog::CatalogResolver;
use crate::error::SyncResult;
use crate::protocol::{CartSnapshot, PaymentStatus, TopicSet};
use crate::registry::{HandlerToken, MessageHandler};
use crate::transport::PubSub;

// =============================================================================
// Shared Cart
// =============================================================================

/// The single authoritative cart, shared between the host UI and the driver.
///
/// ## Thread Safety
/// `Arc<Mutex<CartSession>>` because quantity controls (host side) and
/// message handlers (driver side) mutate the same session. Every access
/// reads the cart at the instant it runs; nothing holds a stale copy.
#[derive(Debug, Clone, Default)]
pub struct SharedCart {
    inner: Arc<Mutex<CartSession>>,
}

impl SharedCart {
    /// Creates a new empty shared cart.
    pub fn new() -> Self {
        SharedCart::default()
    }

    /// Executes a function with read access to the cart.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CartSession) -> R,
    {
        let cart = self.inner.lock().expect("cart mutex poisoned");
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    pub fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CartSession) -> R,
    {
        let mut cart = self.inner.lock().expect("cart mutex poisoned");
        f(&mut cart)
    }
}

// =============================================================================
// Event Emitter
// =============================================================================

/// User-visible reporting surface (implemented by the host UI).
///
/// Every callback is non-fatal information; the driver never blocks on it.
pub trait CartEventEmitter: Send + Sync {
    /// The cashier confirmed payment (fires exactly once per session).
    fn payment_confirmed(&self, method: Option<&str>, total_amount: Option<u64>);

    /// A scanned/searched product landed in the cart.
    fn product_added(&self, product: &Product, quantity: u32);

    /// An inbound identifier matched nothing in the catalog.
    fn resolution_failed(&self, product_id: &str);

    /// The document store failed; the cart is unchanged and the action can
    /// be retried.
    fn store_unavailable(&self, detail: &str);
}

/// No-op event emitter for tests and headless use.
pub struct NoOpEmitter;

impl CartEventEmitter for NoOpEmitter {
    fn payment_confirmed(&self, _method: Option<&str>, _total_amount: Option<u64>) {}
    fn product_added(&self, _product: &Product, _quantity: u32) {}
    fn resolution_failed(&self, _product_id: &str) {}
    fn store_unavailable(&self, _detail: &str) {}
}

// =============================================================================
// Driver Configuration
// =============================================================================

/// Driver settings.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Snapshot publish cadence.
    pub publish_interval: Duration,

    /// Identifier of the paying party carried in every snapshot (the
    /// logged-in operator's username).
    pub payer_id: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            publish_interval: Duration::from_millis(1000),
            payer_id: "unknown".to_string(),
        }
    }
}

// =============================================================================
// Sync Driver
// =============================================================================

/// Events forwarded from topic handlers into the run loop.
enum DriverEvent {
    /// Raw payload from `{id}/IDProducts`.
    Scan(Value),
    /// Raw payload from `{id}/payment-status`.
    Status(Value),
}

/// Topics and removal tokens of the currently bound session.
struct Binding {
    topics: TopicSet,
    scan_token: Option<HandlerToken>,
    status_token: Option<HandlerToken>,
}

/// Binds a cart session to its topic namespace and drives the publisher.
pub struct SyncDriver<P: PubSub> {
    transport: P,
    cart: SharedCart,
    events_tx: mpsc::UnboundedSender<DriverEvent>,
    binding: Mutex<Option<Binding>>,
    shutdown_tx: watch::Sender<bool>,
}

impl<P: PubSub> SyncDriver<P> {
    /// Creates the driver and spawns its run loop.
    pub fn spawn<S: DocumentStore>(
        transport: P,
        cart: SharedCart,
        resolver: CatalogResolver<S>,
        emitter: Arc<dyn CartEventEmitter>,
        config: DriverConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(Self::run(
            transport.clone(),
            cart.clone(),
            resolver,
            emitter,
            config,
            events_rx,
            shutdown_rx,
        ));

        SyncDriver {
            transport,
            cart,
            events_tx,
            binding: Mutex::new(None),
            shutdown_tx,
        }
    }

    /// The shared cart this driver synchronizes.
    pub fn cart(&self) -> &SharedCart {
        &self.cart
    }

    /// Assigns a cart number and binds its topic namespace.
    ///
    /// Validation failures (out-of-range number, paid session) propagate
    /// and leave everything unchanged. On a rebind the previous session's
    /// topics are unsubscribed BEFORE the new ones are subscribed.
    pub fn bind(&self, number: i64) -> SyncResult<String> {
        self.cart.with_mut(|cart| cart.assign_session(number))?;

        let session_id = self
            .cart
            .with(|cart| cart.session_id().map(str::to_string))
            .expect("session id set by assign_session");

        // Stale subscriptions must never persist across a session change.
        self.unbind_topics();

        let topics = TopicSet::for_session(&session_id);
        let (scan_token, status_token) = if self.transport.is_connected() {
            let scans_tx = self.events_tx.clone();
            let scan_handler: MessageHandler = Arc::new(move |value: &Value| {
                let _ = scans_tx.send(DriverEvent::Scan(value.clone()));
            });

            let status_tx = self.events_tx.clone();
            let status_handler: MessageHandler = Arc::new(move |value: &Value| {
                let _ = status_tx.send(DriverEvent::Status(value.clone()));
            });

            (
                self.transport.subscribe(&topics.scans, scan_handler),
                self.transport.subscribe(&topics.status, status_handler),
            )
        } else {
            warn!(session = %session_id, "bind while disconnected, topics not subscribed");
            (None, None)
        };

        info!(session = %session_id, "Cart session bound");

        *self.binding.lock().expect("binding lock poisoned") = Some(Binding {
            topics,
            scan_token,
            status_token,
        });

        Ok(session_id)
    }

    /// Unbinds the session topics and clears the cart back to unassigned.
    pub fn reset(&self) {
        self.unbind_topics();
        self.cart.with_mut(|cart| cart.reset());
        info!("Cart session reset");
    }

    /// Persists the current session to the transaction log, then resets.
    ///
    /// A store failure leaves the cart fully intact so the operator can
    /// retry the save.
    pub async fn complete_transaction<S: DocumentStore>(
        &self,
        transactions: &TransactionRepository<S>,
    ) -> SyncResult<String> {
        let record = self.cart.with(TransactionRecord::from_session)?;
        let key = transactions.record(&record).await?;

        self.reset();
        Ok(key)
    }

    /// Unbinds the session topics and stops the run loop (screen exit).
    pub fn shutdown(&self) {
        self.unbind_topics();
        let _ = self.shutdown_tx.send(true);
        debug!("Sync driver shut down");
    }

    /// Unsubscribes the currently bound session's topics, if any.
    fn unbind_topics(&self) {
        let binding = self.binding.lock().expect("binding lock poisoned").take();

        if let Some(binding) = binding {
            if let Some(token) = binding.scan_token {
                self.transport.unsubscribe(&binding.topics.scans, Some(&token));
            }
            if let Some(token) = binding.status_token {
                self.transport
                    .unsubscribe(&binding.topics.status, Some(&token));
            }
            debug!(session_topics = %binding.topics.scans, "Session topics unbound");
        }
    }

    // =========================================================================
    // Run Loop
    // =========================================================================

    async fn run<S: DocumentStore>(
        transport: P,
        cart: SharedCart,
        resolver: CatalogResolver<S>,
        emitter: Arc<dyn CartEventEmitter>,
        config: DriverConfig,
        mut events_rx: mpsc::UnboundedReceiver<DriverEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(config.publish_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Sender dropped (driver gone) or explicit shutdown: stop.
                _ = shutdown_rx.changed() => break,

                Some(event) = events_rx.recv() => match event {
                    DriverEvent::Scan(value) => {
                        Self::handle_scan(&cart, &resolver, emitter.as_ref(), &value).await;
                    }
                    DriverEvent::Status(value) => {
                        Self::handle_status(&cart, emitter.as_ref(), &value);
                    }
                },

                _ = ticker.tick() => {
                    Self::publish_snapshot(&transport, &cart, &config.payer_id);
                }
            }
        }

        debug!("Driver loop stopped");
    }

    /// Inbound product identifier: normalize, resolve, merge into the cart.
    async fn handle_scan<S: DocumentStore>(
        cart: &SharedCart,
        resolver: &CatalogResolver<S>,
        emitter: &dyn CartEventEmitter,
        value: &Value,
    ) {
        let Some(id) = product_id_from_value(value) else {
            debug!(payload = %value, "Unresolvable scan payload, ignored");
            return;
        };

        if cart.with(|c| c.is_paid()) {
            debug!(id = %id, "Scan after payment, ignored");
            return;
        }

        match resolver.resolve_by_id(&id).await {
            Ok(Some(product)) => {
                let quantity = cart.with_mut(|c| {
                    c.add_product(&product);
                    c.lines()
                        .iter()
                        .find(|l| l.product_id == product.id)
                        .map(|l| l.quantity)
                        .unwrap_or(1)
                });
                debug!(id = %product.id, quantity, "Product added from scan");
                emitter.product_added(&product, quantity);
            }
            Ok(None) => {
                info!(id = %id, "Unknown product id");
                emitter.resolution_failed(&id);
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Catalog lookup failed");
                emitter.store_unavailable(&e.to_string());
            }
        }
    }

    /// Inbound payment confirmation: only `"paid"` acts, and only once.
    fn handle_status(cart: &SharedCart, emitter: &dyn CartEventEmitter, value: &Value) {
        let status: PaymentStatus = match serde_json::from_value(value.clone()) {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Malformed payment status, dropped");
                return;
            }
        };

        if !status.is_paid() {
            debug!(status = %status.status, "Non-paid status, ignored");
            return;
        }

        match cart.with_mut(|c| c.mark_paid()) {
            Ok(true) => {
                info!(
                    method = status.payment_method.as_deref().unwrap_or("-"),
                    "Payment confirmed"
                );
                emitter.payment_confirmed(status.payment_method.as_deref(), status.total_amount);
            }
            Ok(false) => {
                debug!("Duplicate payment confirmation, ignored");
            }
            Err(e) => {
                warn!(error = %e, "Payment status for unassigned session, dropped");
            }
        }
    }

    /// One publisher tick: snapshot the LIVE cart and send it, gated on
    /// assigned ∧ non-empty ∧ connected ∧ unpaid.
    fn publish_snapshot(transport: &P, cart: &SharedCart, payer_id: &str) {
        let prepared = cart.with(|c| {
            let session_id = c.session_id()?;
            if c.is_empty() || c.is_paid() {
                return None;
            }
            Some((
                TopicSet::for_session(session_id).snapshot,
                CartSnapshot::from_session(payer_id, c),
            ))
        });

        let Some((topic, snapshot)) = prepared else {
            return;
        };

        if !transport.is_connected() {
            return;
        }

        match serde_json::to_value(&snapshot) {
            Ok(value) => transport.publish(&topic, &value),
            Err(e) => warn!(error = %e, "Snapshot serialization failed"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SubscriptionRegistry;
    use crate::transport::ConnectionState;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use troli_store::{MemoryStore, PRODUCTS};

    // =========================================================================
    // Test Doubles
    // =========================================================================

    /// Fake transport: records traffic, replays inbound messages through a
    /// real SubscriptionRegistry.
    #[derive(Clone, Default)]
    struct FakeTransport {
        inner: Arc<FakeInner>,
    }

    #[derive(Default)]
    struct FakeInner {
        connected: AtomicBool,
        registry: SubscriptionRegistry,
        published: Mutex<Vec<(String, Value)>>,
        unsubscribed: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn connected() -> Self {
            let fake = FakeTransport::default();
            fake.inner.connected.store(true, Ordering::SeqCst);
            fake
        }

        fn set_connected(&self, connected: bool) {
            self.inner.connected.store(connected, Ordering::SeqCst);
        }

        fn deliver(&self, topic: &str, payload: Value) -> usize {
            self.inner.registry.dispatch(topic, &payload)
        }

        fn published(&self) -> Vec<(String, Value)> {
            self.inner.published.lock().unwrap().clone()
        }

        fn unsubscribed(&self) -> Vec<String> {
            self.inner.unsubscribed.lock().unwrap().clone()
        }
    }

    impl PubSub for FakeTransport {
        fn state(&self) -> ConnectionState {
            if self.inner.connected.load(Ordering::SeqCst) {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            }
        }

        fn subscribe(&self, topic: &str, handler: MessageHandler) -> Option<HandlerToken> {
            if !self.is_connected() {
                return None;
            }
            Some(self.inner.registry.insert(topic, handler).0)
        }

        fn unsubscribe(&self, topic: &str, token: Option<&HandlerToken>) {
            match token {
                Some(token) => {
                    self.inner.registry.remove(token);
                }
                None => {
                    self.inner.registry.remove_topic(topic);
                }
            }
            self.inner.unsubscribed.lock().unwrap().push(topic.to_string());
        }

        fn publish(&self, topic: &str, payload: &Value) {
            self.inner
                .published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.clone()));
        }
    }

    /// Emitter that records every callback.
    #[derive(Default)]
    struct RecordingEmitter {
        confirmed: Mutex<Vec<(Option<String>, Option<u64>)>>,
        added: Mutex<Vec<String>>,
        failed: Mutex<Vec<String>>,
        store_errors: Mutex<Vec<String>>,
    }

    impl CartEventEmitter for RecordingEmitter {
        fn payment_confirmed(&self, method: Option<&str>, total_amount: Option<u64>) {
            self.confirmed
                .lock()
                .unwrap()
                .push((method.map(str::to_string), total_amount));
        }

        fn product_added(&self, product: &Product, _quantity: u32) {
            self.added.lock().unwrap().push(product.id.clone());
        }

        fn resolution_failed(&self, product_id: &str) {
            self.failed.lock().unwrap().push(product_id.to_string());
        }

        fn store_unavailable(&self, detail: &str) {
            self.store_errors.lock().unwrap().push(detail.to_string());
        }
    }

    // =========================================================================
    // Fixture
    // =========================================================================

    struct Fixture {
        transport: FakeTransport,
        driver: SyncDriver<FakeTransport>,
        emitter: Arc<RecordingEmitter>,
        store: MemoryStore,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        store
            .put(PRODUCTS, "A01", &json!({"name": "Teh Botol", "price": 4_000}))
            .await
            .unwrap();
        store
            .put(PRODUCTS, "B01", &json!({"name": "Kopi Susu", "price": 18_000}))
            .await
            .unwrap();

        let transport = FakeTransport::connected();
        let emitter = Arc::new(RecordingEmitter::default());
        let driver = SyncDriver::spawn(
            transport.clone(),
            SharedCart::new(),
            CatalogResolver::new(store.clone()),
            emitter.clone(),
            DriverConfig {
                publish_interval: Duration::from_millis(1000),
                payer_id: "budi".to_string(),
            },
        );

        Fixture {
            transport,
            driver,
            emitter,
            store,
        }
    }

    /// Lets the driver loop drain its event channel (paused-time tests).
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_bind_validates_cart_number() {
        let f = fixture().await;

        assert!(f.driver.bind(0).is_err());
        assert!(f.driver.bind(101).is_err());
        assert!(f.driver.bind(-5).is_err());

        assert_eq!(f.driver.bind(7).unwrap(), "007");
        assert_eq!(f.driver.cart().with(|c| c.session_id().map(str::to_string)), Some("007".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_resolves_and_merges_into_cart() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();

        // Three wire shapes, same product
        f.transport.deliver("007/IDProducts", json!("a01"));
        f.transport.deliver("007/IDProducts", json!({"productId": "A01"}));
        f.transport.deliver("007/IDProducts", json!(" A01 "));
        settle().await;

        f.driver.cart().with(|c| {
            assert_eq!(c.len(), 1);
            assert_eq!(c.lines()[0].quantity, 3);
        });
        assert_eq!(f.emitter.added.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_id_reports_and_leaves_cart_unchanged() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();

        f.transport.deliver("007/IDProducts", json!("Z99"));
        settle().await;

        assert!(f.driver.cart().with(|c| c.is_empty()));
        assert_eq!(f.emitter.failed.lock().unwrap().as_slice(), ["Z99"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolvable_shapes_are_ignored() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();

        f.transport.deliver("007/IDProducts", json!(null));
        f.transport.deliver("007/IDProducts", json!([1, 2]));
        f.transport.deliver("007/IDProducts", json!({"sku": "A01"}));
        settle().await;

        assert!(f.driver.cart().with(|c| c.is_empty()));
        assert!(f.emitter.failed.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_reported_distinctly() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();

        f.store.set_failing(true);
        f.transport.deliver("007/IDProducts", json!("A01"));
        settle().await;

        assert!(f.driver.cart().with(|c| c.is_empty()));
        assert!(f.emitter.failed.lock().unwrap().is_empty());
        assert_eq!(f.emitter.store_errors.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_cart_never_publishes() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();

        // Assigned, connected, empty: three full intervals, zero publishes
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        assert!(f.transport.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publisher_sends_live_snapshot() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();

        f.transport.deliver("007/IDProducts", json!("A01"));
        f.transport.deliver("007/IDProducts", json!("A01"));
        f.transport.deliver("007/IDProducts", json!("B01"));
        settle().await;

        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let published = f.transport.published();
        assert!(!published.is_empty());

        let (topic, payload) = &published[0];
        assert_eq!(topic, "007/payment");
        assert_eq!(payload["id"], "budi");
        assert_eq!(payload["items"][0]["id"], "A01");
        assert_eq!(payload["items"][0]["qty"], 2);
        assert_eq!(payload["items"][1]["id"], "B01");
        // Pricing authority is the cashier: no prices on the wire
        assert!(payload["items"][0].get("price").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publisher_requires_connection() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();
        f.transport.deliver("007/IDProducts", json!("A01"));
        settle().await;

        f.transport.set_connected(false);
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert!(f.transport.published().is_empty());

        f.transport.set_connected(true);
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(!f.transport.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paid_status_transitions_exactly_once() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();
        f.transport.deliver("007/IDProducts", json!("A01"));
        settle().await;

        let confirmation = json!({"status": "paid", "paymentMethod": "cash", "totalAmount": 50_000});
        f.transport.deliver("007/payment-status", confirmation.clone());
        f.transport.deliver("007/payment-status", confirmation);
        settle().await;

        assert!(f.driver.cart().with(|c| c.is_paid()));

        let confirmed = f.emitter.confirmed.lock().unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0], (Some("cash".to_string()), Some(50_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_paid_status_ignored() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();

        f.transport.deliver("007/payment-status", json!({"status": "pending"}));
        f.transport.deliver("007/payment-status", json!({"nonsense": true}));
        settle().await;

        assert!(!f.driver.cart().with(|c| c.is_paid()));
        assert!(f.emitter.confirmed.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publisher_stops_after_payment() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();
        f.transport.deliver("007/IDProducts", json!("A01"));
        settle().await;

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let before = f.transport.published().len();
        assert!(before > 0);

        f.transport
            .deliver("007/payment-status", json!({"status": "paid"}));
        settle().await;

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(f.transport.published().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebind_unsubscribes_old_topics_first() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();

        f.transport.deliver("007/IDProducts", json!("A01"));
        settle().await;
        assert_eq!(f.driver.cart().with(|c| c.total_items()), 1);

        // Reassign to cart 8
        f.driver.bind(8).unwrap();

        let unsubscribed = f.transport.unsubscribed();
        assert!(unsubscribed.contains(&"007/IDProducts".to_string()));
        assert!(unsubscribed.contains(&"007/payment-status".to_string()));

        // A message on the OLD topic reaches no handler and mutates nothing
        assert_eq!(f.transport.deliver("007/IDProducts", json!("B01")), 0);
        settle().await;
        assert_eq!(f.driver.cart().with(|c| c.total_items()), 1);

        // The NEW topic is live
        f.transport.deliver("008/IDProducts", json!("B01"));
        settle().await;
        assert_eq!(f.driver.cart().with(|c| c.total_items()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_unbinds_and_clears() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();
        f.transport.deliver("007/IDProducts", json!("A01"));
        settle().await;

        f.driver.reset();

        assert!(f.driver.cart().with(|c| c.is_empty()));
        assert_eq!(f.driver.cart().with(|c| c.session_id().is_none()), true);
        assert_eq!(f.transport.deliver("007/IDProducts", json!("A01")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_transaction_persists_then_resets() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();
        f.transport.deliver("007/IDProducts", json!("A01"));
        f.transport
            .deliver("007/payment-status", json!({"status": "paid"}));
        settle().await;

        let transactions = TransactionRepository::new(f.store.clone());
        f.driver.complete_transaction(&transactions).await.unwrap();

        let listed = transactions.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].cart_number, "007");
        assert!(f.driver.cart().with(|c| c.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_transaction_failure_preserves_cart() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();
        f.transport.deliver("007/IDProducts", json!("A01"));
        settle().await;

        let transactions = TransactionRepository::new(f.store.clone());
        f.store.set_failing(true);
        assert!(f.driver.complete_transaction(&transactions).await.is_err());

        // Cart intact for retry
        f.driver.cart().with(|c| {
            assert_eq!(c.total_items(), 1);
            assert_eq!(c.session_id(), Some("007"));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_scans_after_payment_are_ignored() {
        let f = fixture().await;
        f.driver.bind(7).unwrap();
        f.transport.deliver("007/IDProducts", json!("A01"));
        f.transport
            .deliver("007/payment-status", json!({"status": "paid"}));
        settle().await;

        f.transport.deliver("007/IDProducts", json!("B01"));
        settle().await;

        assert_eq!(f.driver.cart().with(|c| c.total_items()), 1);
    }
}
