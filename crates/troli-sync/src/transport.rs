//! # MQTT Transport
//!
//! The broker client: one physical connection, automatic reconnection, and
//! handler fan-out through the subscription registry.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Transport Connection States                        │
//! │                                                                         │
//! │  ┌────────────┐    connect()    ┌────────────┐                         │
//! │  │Disconnected│ ──────────────► │ Connecting │                         │
//! │  └────────────┘                 └─────┬──────┘                         │
//! │        ▲                              │                                 │
//! │        │                   ConnAck    │   error / 10 s timeout          │
//! │        │                        ┌─────┴─────┐                          │
//! │        │                        ▼           ▼                           │
//! │        │              ┌────────────┐  ┌────────────┐                   │
//! │        │              │ Connected  │  │ (connect() │                   │
//! │        │              └─────┬──────┘  │  fails)    │                   │
//! │        │                    │         └────────────┘                   │
//! │        │          stream error                                          │
//! │        │                    ▼                                           │
//! │        │              wait 2 s (constant, unbounded retries)            │
//! │        │                    │                                           │
//! │        └── disconnect()     └──► poll again ──► ConnAck ──► Connected  │
//! │                                                  └─ resubscribe all    │
//! │                                                     registry topics    │
//! │                                                                         │
//! │  connect() resolves or fails EXACTLY ONCE; the automatic reconnects    │
//! │  afterwards never re-resolve the original call.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Semantics
//! - connect failure surfaces to the caller as an error
//! - publish/subscribe while disconnected: logged warning, no-op, no error
//! - malformed inbound payloads: logged warning, dropped, never raised

use std::sync::{Arc, Mutex};
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::registry::{HandlerToken, MessageHandler, SubscriptionRegistry};

// =============================================================================
// Connection State
// =============================================================================

/// Connection state, owned solely by the transport. Every other component
/// observes it but never mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// Attempting to connect (initial or automatic reconnect).
    Connecting,
    /// Connected and ready.
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

// =============================================================================
// Transport Configuration
// =============================================================================

/// Configuration for the broker transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Broker URL (ws://, wss://, mqtt://, mqtts://, tcp://).
    pub url: String,

    /// Client-id prefix; a random suffix is appended per connection so two
    /// tablets (or a restart) never collide on the broker.
    pub client_id_prefix: String,

    /// Bound on the initial connection attempt.
    pub connect_timeout: Duration,

    /// Fixed delay between automatic reconnect attempts.
    pub reconnect_delay: Duration,

    /// Request channel capacity of the underlying client.
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            url: String::new(),
            client_id_prefix: "tablet".to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(2),
            channel_capacity: 64,
        }
    }
}

// =============================================================================
// PubSub Seam
// =============================================================================

/// The injectable publish/subscribe surface the engine is written against.
///
/// Production uses [`MqttTransport`]; tests substitute a fake so no test
/// ever needs a live broker or process-wide state.
pub trait PubSub: Clone + Send + Sync + 'static {
    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Convenience for `state() == Connected`.
    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Registers a handler for a topic, issuing a broker-level subscribe
    /// for the first handler. While disconnected this is a logged no-op
    /// returning `None`.
    fn subscribe(&self, topic: &str, handler: MessageHandler) -> Option<HandlerToken>;

    /// Removes one handler (by token) or all handlers (token = `None`) for
    /// a topic; issues the broker-level unsubscribe when the last handler
    /// goes away.
    fn unsubscribe(&self, topic: &str, token: Option<&HandlerToken>);

    /// Best-effort, unacknowledged publish. JSON values are serialized to
    /// text; string values go out as-is. While disconnected this is a
    /// logged no-op.
    fn publish(&self, topic: &str, payload: &Value);
}

// =============================================================================
// MQTT Transport
// =============================================================================

struct TransportInner {
    config: TransportConfig,
    state: Mutex<ConnectionState>,
    registry: SubscriptionRegistry,
    client: Mutex<Option<AsyncClient>>,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
}

/// MQTT client with automatic reconnection.
///
/// ## Usage
/// ```rust,ignore
/// let config = TransportConfig {
///     url: "wss://broker.example:8081/mqtt".into(),
///     ..Default::default()
/// };
///
/// let transport = MqttTransport::new(config);
/// transport.connect().await?;           // resolves once
///
/// let token = transport.subscribe("007/IDProducts", handler);
/// transport.publish("007/payment", &payload);
///
/// transport.disconnect().await;         // idempotent teardown
/// ```
#[derive(Clone)]
pub struct MqttTransport {
    inner: Arc<TransportInner>,
}

impl MqttTransport {
    /// Creates a disconnected transport.
    pub fn new(config: TransportConfig) -> Self {
        MqttTransport {
            inner: Arc::new(TransportInner {
                config,
                state: Mutex::new(ConnectionState::Disconnected),
                registry: SubscriptionRegistry::new(),
                client: Mutex::new(None),
                shutdown_tx: Mutex::new(None),
            }),
        }
    }

    /// Establishes the broker connection.
    ///
    /// Resolves or fails exactly once per call: success means the first
    /// ConnAck arrived within the timeout, after which the background task
    /// owns the connection and reconnects on its own (fixed delay,
    /// unbounded retries) without ever re-resolving this call.
    pub async fn connect(&self) -> SyncResult<()> {
        if self.is_connected() {
            debug!("connect() called while already connected");
            return Ok(());
        }

        self.inner.set_state(ConnectionState::Connecting);

        let options = build_mqtt_options(&self.inner.config)?;
        let (client, mut event_loop) =
            AsyncClient::new(options, self.inner.config.channel_capacity);

        // Wait for the first ConnAck; everything after this is the
        // background task's problem.
        let first_connect = timeout(self.inner.config.connect_timeout, async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => return Err(SyncError::Connection(e.to_string())),
                }
            }
        })
        .await;

        match first_connect {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.inner.set_state(ConnectionState::Disconnected);
                error!(url = %self.inner.config.url, error = %e, "Broker connection failed");
                return Err(e);
            }
            Err(_) => {
                self.inner.set_state(ConnectionState::Disconnected);
                let secs = self.inner.config.connect_timeout.as_secs();
                error!(url = %self.inner.config.url, "Broker connection timed out");
                return Err(SyncError::Timeout(secs));
            }
        }

        info!(url = %self.inner.config.url, "Broker connected");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.inner.client.lock().expect("client lock poisoned") = Some(client);
        *self
            .inner
            .shutdown_tx
            .lock()
            .expect("shutdown lock poisoned") = Some(shutdown_tx);
        self.inner.set_state(ConnectionState::Connected);

        // Topics registered before/through a reconnect window get their
        // broker-level subscribe (re)issued here and on every ConnAck.
        self.inner.resubscribe_all();

        tokio::spawn(Self::run(self.inner.clone(), event_loop, shutdown_rx));
        Ok(())
    }

    /// Background connection loop: dispatches inbound messages and drives
    /// the fixed-delay reconnect policy.
    async fn run(
        inner: Arc<TransportInner>,
        mut event_loop: EventLoop,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut backoff = Constant::new(inner.config.reconnect_delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    debug!("Transport loop received shutdown");
                    break;
                }

                event = event_loop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Broker reconnected");
                        inner.set_state(ConnectionState::Connected);
                        // The broker forgot our session; replay every
                        // registry topic.
                        inner.resubscribe_all();
                    }

                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        inner.dispatch(&publish.topic, &publish.payload);
                    }

                    Ok(_) => {}

                    Err(e) => {
                        warn!(error = %e, "Broker connection lost");
                        inner.set_state(ConnectionState::Disconnected);

                        let delay = backoff
                            .next_backoff()
                            .unwrap_or(inner.config.reconnect_delay);

                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {
                                inner.set_state(ConnectionState::Connecting);
                            }
                            _ = shutdown_rx.changed() => {
                                debug!("Shutdown during reconnect delay");
                                break;
                            }
                        }
                    }
                }
            }
        }

        inner.set_state(ConnectionState::Disconnected);
        debug!("Transport loop stopped");
    }

    /// Tears down the connection and clears all registry state. Idempotent.
    pub async fn disconnect(&self) {
        if let Some(tx) = self
            .inner
            .shutdown_tx
            .lock()
            .expect("shutdown lock poisoned")
            .take()
        {
            let _ = tx.send(true);
        }

        let client = self
            .inner
            .client
            .lock()
            .expect("client lock poisoned")
            .take();
        if let Some(client) = client {
            let _ = client.disconnect().await;
            info!("Broker disconnected");
        }

        self.inner.registry.clear();
        self.inner.set_state(ConnectionState::Disconnected);
    }

    /// Number of handlers registered for a topic (diagnostics/tests).
    pub fn handler_count(&self, topic: &str) -> usize {
        self.inner.registry.handler_count(topic)
    }
}

impl PubSub for MqttTransport {
    fn state(&self) -> ConnectionState {
        *self.inner.state.lock().expect("state lock poisoned")
    }

    fn subscribe(&self, topic: &str, handler: MessageHandler) -> Option<HandlerToken> {
        if !self.is_connected() {
            warn!(topic = %topic, "subscribe while disconnected, ignored");
            return None;
        }

        let (token, first) = self.inner.registry.insert(topic, handler);

        // Broker-level subscribe only for the first handler; later handlers
        // piggyback on the existing broker subscription.
        if first {
            if let Some(client) = self
                .inner
                .client
                .lock()
                .expect("client lock poisoned")
                .as_ref()
            {
                if let Err(e) = client.try_subscribe(topic, QoS::AtMostOnce) {
                    // Registry entry stays; the reconnect resubscribe
                    // sweep will retry the broker-level subscribe.
                    warn!(topic = %topic, error = %e, "Broker subscribe failed");
                } else {
                    debug!(topic = %topic, "Subscribed");
                }
            }
        }

        Some(token)
    }

    fn unsubscribe(&self, topic: &str, token: Option<&HandlerToken>) {
        let now_empty = match token {
            Some(token) => self.inner.registry.remove(token),
            None => self.inner.registry.remove_topic(topic),
        };

        if now_empty {
            if let Some(client) = self
                .inner
                .client
                .lock()
                .expect("client lock poisoned")
                .as_ref()
            {
                if let Err(e) = client.try_unsubscribe(topic) {
                    warn!(topic = %topic, error = %e, "Broker unsubscribe failed");
                } else {
                    debug!(topic = %topic, "Unsubscribed");
                }
            }
        }
    }

    fn publish(&self, topic: &str, payload: &Value) {
        if !self.is_connected() {
            warn!(topic = %topic, "publish while disconnected, dropped");
            return;
        }

        let text = encode_payload(payload);

        if let Some(client) = self
            .inner
            .client
            .lock()
            .expect("client lock poisoned")
            .as_ref()
        {
            // QoS 0, no retain: snapshots are superseded every second.
            if let Err(e) = client.try_publish(topic, QoS::AtMostOnce, false, text) {
                warn!(topic = %topic, error = %e, "Publish failed");
            } else {
                debug!(topic = %topic, "Published");
            }
        }
    }
}

impl TransportInner {
    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().expect("state lock poisoned") = state;
    }

    /// Decodes an inbound payload and fans it out to the topic's handlers.
    /// Decode failures are logged and dropped, never raised.
    fn dispatch(&self, topic: &str, payload: &[u8]) {
        let value: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Malformed payload, dropped");
                return;
            }
        };

        let invoked = self.registry.dispatch(topic, &value);
        debug!(topic = %topic, handlers = invoked, "Dispatched message");
    }

    /// Re-issues broker-level subscribes for every registry topic.
    fn resubscribe_all(&self) {
        let client = self.client.lock().expect("client lock poisoned");
        let Some(client) = client.as_ref() else {
            return;
        };

        for topic in self.registry.topics() {
            if let Err(e) = client.try_subscribe(&topic, QoS::AtMostOnce) {
                warn!(topic = %topic, error = %e, "Resubscribe failed");
            }
        }
    }
}

// =============================================================================
// Endpoint / Payload Helpers
// =============================================================================

/// Builds rumqttc options from the configured endpoint URL.
///
/// Scheme selects the transport: ws/wss use the WebSocket transport (the
/// deployed broker endpoint), mqtt/mqtts/tcp/ssl use plain TCP or TLS.
fn build_mqtt_options(config: &TransportConfig) -> SyncResult<MqttOptions> {
    let endpoint = Url::parse(&config.url)?;
    let scheme = endpoint.scheme();

    let host = endpoint
        .host_str()
        .ok_or_else(|| SyncError::InvalidUrl(format!("missing host in `{}`", config.url)))?;

    let client_id = random_client_id(&config.client_id_prefix);

    let mut options = match scheme {
        // rumqttc's websocket transport takes the FULL URL in the host
        // slot; the port argument is unused on this path.
        "ws" => {
            let mut o = MqttOptions::new(client_id, config.url.clone(), endpoint.port().unwrap_or(80));
            o.set_transport(Transport::Ws);
            o
        }
        "wss" => {
            let mut o =
                MqttOptions::new(client_id, config.url.clone(), endpoint.port().unwrap_or(443));
            o.set_transport(Transport::wss_with_default_config());
            o
        }
        "mqtt" | "tcp" => {
            MqttOptions::new(client_id, host.to_string(), endpoint.port().unwrap_or(1883))
        }
        "mqtts" | "ssl" => {
            let mut o =
                MqttOptions::new(client_id, host.to_string(), endpoint.port().unwrap_or(8883));
            o.set_transport(Transport::tls_with_default_config());
            o
        }
        other => {
            return Err(SyncError::InvalidUrl(format!(
                "unsupported scheme `{}` in `{}`",
                other, config.url
            )));
        }
    };

    options.set_keep_alive(Duration::from_secs(30));
    options.set_clean_session(true);

    Ok(options)
}

/// Client identifier with a random per-connection suffix.
fn random_client_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &suffix[..8])
}

/// Serializes an outbound payload: strings go out raw, everything else as
/// JSON text.
fn encode_payload(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
    }

    #[test]
    fn test_transport_config_default() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.client_id_prefix, "tablet");
    }

    #[test]
    fn test_random_client_id_is_unique_per_connection() {
        let a = random_client_id("tablet");
        let b = random_client_id("tablet");

        assert!(a.starts_with("tablet_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_encode_payload_string_passthrough() {
        // Already-string payloads are NOT double-encoded
        assert_eq!(encode_payload(&json!("A01")), "A01");
        assert_eq!(
            encode_payload(&json!({"id": "budi", "items": []})),
            r#"{"id":"budi","items":[]}"#
        );
    }

    #[test]
    fn test_build_options_schemes() {
        let mut config = TransportConfig {
            url: "wss://broker.example:8081/mqtt".into(),
            ..Default::default()
        };
        assert!(build_mqtt_options(&config).is_ok());

        config.url = "mqtt://broker.example".into();
        assert!(build_mqtt_options(&config).is_ok());

        config.url = "http://broker.example".into();
        assert!(matches!(
            build_mqtt_options(&config),
            Err(SyncError::InvalidUrl(_))
        ));

        config.url = "not a url".into();
        assert!(build_mqtt_options(&config).is_err());
    }

    #[tokio::test]
    async fn test_subscribe_while_disconnected_is_noop() {
        let transport = MqttTransport::new(TransportConfig::default());

        let token = transport.subscribe("007/IDProducts", Arc::new(|_| {}));
        assert!(token.is_none());
        assert_eq!(transport.handler_count("007/IDProducts"), 0);
    }

    #[tokio::test]
    async fn test_publish_while_disconnected_is_noop() {
        let transport = MqttTransport::new(TransportConfig::default());
        // Must not panic or error
        transport.publish("007/payment", &json!({"id": "budi"}));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let transport = MqttTransport::new(TransportConfig::default());
        transport.disconnect().await;
        transport.disconnect().await;
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_unreachable_fails_once() {
        let transport = MqttTransport::new(TransportConfig {
            url: "mqtt://127.0.0.1:1".into(),
            connect_timeout: Duration::from_millis(500),
            ..Default::default()
        });

        assert!(transport.connect().await.is_err());
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }
}
