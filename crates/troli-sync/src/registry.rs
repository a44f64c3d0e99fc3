//! # Subscription Registry
//!
//! Maps topic strings to their registered message handlers.
//!
//! ## Fan-out Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Subscription Registry                                │
//! │                                                                         │
//! │  "007/IDProducts"     ──► [ handler #1, handler #4 ]                   │
//! │  "007/payment-status" ──► [ handler #2 ]                               │
//! │                                                                         │
//! │  insert()  → HandlerToken (capability for precise removal)             │
//! │  dispatch() → every handler for the EXACT topic, at most once each     │
//! │  unknown topic → dropped silently (0 handlers invoked)                 │
//! │                                                                         │
//! │  Broker-level subscribe/unsubscribe happens only at the edges:         │
//! │  first handler in ──► broker subscribe                                 │
//! │  last handler out ──► broker unsubscribe                               │
//! │  (the transport layer acts on the booleans returned here)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Removal is by capability token, not callback identity: two closures are
//! never compared, so registering the same logical handler twice yields two
//! independently removable registrations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;

/// A message handler: invoked with the decoded JSON payload.
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;

// =============================================================================
// Handler Token
// =============================================================================

/// Capability token returned by [`SubscriptionRegistry::insert`].
///
/// Holding the token is the only way to remove exactly that registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerToken {
    topic: String,
    id: u64,
}

impl HandlerToken {
    /// The topic this token's handler is registered under.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

// =============================================================================
// Subscription Registry
// =============================================================================

/// Topic → handler mapping with interior locking.
///
/// Access is sequential with respect to subscribe/unsubscribe/dispatch: the
/// internal mutex guards the map, and dispatch clones the handler list out
/// before invoking so a handler may itself subscribe or unsubscribe without
/// deadlocking.
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<HashMap<String, Vec<(u64, MessageHandler)>>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        SubscriptionRegistry::default()
    }

    /// Registers a handler under a topic.
    ///
    /// Returns the removal token and whether this was the FIRST handler for
    /// the topic (the transport issues the broker-level subscribe then).
    pub fn insert(&self, topic: &str, handler: MessageHandler) -> (HandlerToken, bool) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.inner.lock().expect("registry lock poisoned");

        let handlers = guard.entry(topic.to_string()).or_default();
        let first = handlers.is_empty();
        handlers.push((id, handler));

        (
            HandlerToken {
                topic: topic.to_string(),
                id,
            },
            first,
        )
    }

    /// Removes the registration identified by `token`.
    ///
    /// Returns whether the topic is now empty (the transport issues the
    /// broker-level unsubscribe then). Removing an already-removed token is
    /// a no-op returning false.
    pub fn remove(&self, token: &HandlerToken) -> bool {
        let mut guard = self.inner.lock().expect("registry lock poisoned");

        let Some(handlers) = guard.get_mut(&token.topic) else {
            return false;
        };

        handlers.retain(|(id, _)| *id != token.id);

        if handlers.is_empty() {
            guard.remove(&token.topic);
            true
        } else {
            false
        }
    }

    /// Removes ALL handlers for a topic. Returns whether any existed.
    pub fn remove_topic(&self, topic: &str) -> bool {
        let mut guard = self.inner.lock().expect("registry lock poisoned");
        guard.remove(topic).is_some()
    }

    /// Invokes every handler registered for the exact topic string with the
    /// decoded payload. Returns how many handlers ran; unknown topics are 0.
    pub fn dispatch(&self, topic: &str, payload: &Value) -> usize {
        // Clone the handler list out so handlers can mutate the registry.
        let handlers: Vec<MessageHandler> = {
            let guard = self.inner.lock().expect("registry lock poisoned");
            match guard.get(topic) {
                Some(list) => list.iter().map(|(_, h)| h.clone()).collect(),
                None => {
                    debug!(topic = %topic, "Message on topic with no handlers, dropped");
                    return 0;
                }
            }
        };

        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// All topics with at least one handler (for resubscribe-on-reconnect).
    pub fn topics(&self) -> Vec<String> {
        let guard = self.inner.lock().expect("registry lock poisoned");
        guard.keys().cloned().collect()
    }

    /// Number of handlers currently registered for a topic.
    pub fn handler_count(&self, topic: &str) -> usize {
        let guard = self.inner.lock().expect("registry lock poisoned");
        guard.get(topic).map(Vec::len).unwrap_or(0)
    }

    /// Drops every registration (transport teardown).
    pub fn clear(&self) {
        let mut guard = self.inner.lock().expect("registry lock poisoned");
        guard.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
