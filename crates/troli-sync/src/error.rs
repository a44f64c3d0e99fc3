//! # Sync Error Types
//!
//! Error types for the cart synchronization engine.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Connection    │  │   Validation    │  │       Decode            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Connection     │  │  Core           │  │  Decode                 │ │
//! │  │  Timeout        │  │  (wraps         │  │  (malformed inbound     │ │
//! │  │  NotConnected   │  │   Validation)   │  │   payloads - logged     │ │
//! │  │  InvalidUrl     │  │                 │  │   and dropped)          │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │  Persistence    │  │    Internal     │                              │
//! │  │                 │  │                 │                              │
//! │  │  Store          │  │  Config         │                              │
//! │  │  (document      │  │  Channel        │                              │
//! │  │   store down)   │  │                 │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! │                                                                         │
//! │  NOTHING here is fatal to the process. The worst case is a            │
//! │  disconnected transport that keeps retrying in the background.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use troli_core::CoreError;
use troli_store::StoreError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all cart engine failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Connection Errors
    // =========================================================================
    /// Failed to establish the broker connection.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Connection attempt did not complete in time.
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// An operation needed a live connection.
    ///
    /// Publish/subscribe calls degrade to logged no-ops instead of raising
    /// this; it is reserved for operations that genuinely cannot degrade.
    #[error("Not connected to broker")]
    NotConnected,

    /// The broker endpoint URL could not be parsed or uses an unsupported
    /// scheme.
    #[error("Invalid broker URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Decode Errors
    // =========================================================================
    /// An inbound payload could not be decoded.
    ///
    /// Inside the dispatch path these are logged and dropped; the variant
    /// exists for callers decoding payloads directly.
    #[error("Decode failed: {0}")]
    Decode(String),

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// The document store failed (catalog read, transaction write).
    /// In-memory cart state is preserved so the operation can be retried.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // =========================================================================
    // Validation / State Machine Errors
    // =========================================================================
    /// A cart/session state machine rule was violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Invalid engine configuration.
    #[error("Invalid sync configuration: {0}")]
    Config(String),

    /// An internal channel was closed unexpectedly.
    #[error("Channel error: {0}")]
    Channel(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl From<rumqttc::ClientError> for SyncError {
    fn from(err: rumqttc::ClientError) -> Self {
        SyncError::Connection(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if the operation can simply be retried later.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts (the transport reconnects anyway)
    /// - Store backend hiccups
    ///
    /// ## Non-Retryable Errors
    /// - Validation / state machine violations
    /// - Configuration problems
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Connection(_) | SyncError::Timeout(_) | SyncError::NotConnected => true,
            SyncError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns true for validation failures that should be reported inline
    /// and block only the triggering action.
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Core(_))
    }

    /// Returns true for malformed-payload failures (logged and dropped).
    pub fn is_decode(&self) -> bool {
        matches!(self, SyncError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use troli_core::ValidationError;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::Connection("network error".into()).is_retryable());
        assert!(SyncError::Timeout(10).is_retryable());
        assert!(SyncError::NotConnected.is_retryable());
        assert!(SyncError::Store(StoreError::Backend("io".into())).is_retryable());

        assert!(!SyncError::Config("bad".into()).is_retryable());
        assert!(!SyncError::Decode("bad json".into()).is_retryable());
    }

    #[test]
    fn test_validation_category() {
        let err: SyncError = CoreError::Validation(ValidationError::OutOfRange {
            field: "cart number".into(),
            min: 1,
            max: 100,
        })
        .into();

        assert!(err.is_validation());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Validation error: cart number must be between 1 and 100");
    }

    #[test]
    fn test_store_error_wraps() {
        let err: SyncError = StoreError::InvalidCredentials.into();
        assert!(matches!(err, SyncError::Store(_)));
    }
}
