//! # Store Error Types
//!
//! Error types for document store operations.
//!
//! ## Design Principles
//! - A missing document is NOT an error: reads return `Ok(None)` so the
//!   caller can distinguish "no such product" from "the store is down"
//! - Backend failures carry the underlying message for diagnostics but
//!   are reported to the user as a single non-fatal persistence failure
//! - In-memory cart state is never touched by a store failure; the
//!   triggering operation can simply be retried

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database failed (connection, query, corruption).
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A document body could not be serialized or deserialized.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document that must exist is missing.
    ///
    /// Reads that tolerate absence return `Ok(None)` instead; this variant
    /// is for lookups where the caller asserted existence.
    #[error("Document not found: {collection}/{key}")]
    NotFound { collection: String, key: String },

    /// A document exists but its body doesn't match the expected shape.
    #[error("Invalid document {collection}/{key}: {reason}")]
    InvalidDocument {
        collection: String,
        key: String,
        reason: String,
    },

    /// Username/password pair did not verify.
    ///
    /// Deliberately carries no detail: unknown user and wrong password are
    /// indistinguishable to the caller.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Password hashing failed (malformed stored hash, OS RNG failure).
    #[error("Password hash error: {0}")]
    Hash(String),

    /// Input failed validation before the store was touched.
    #[error("Validation error: {0}")]
    Validation(#[from] troli_core::ValidationError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl StoreError {
    /// Returns true if this error means a specific document was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns true for failures worth retrying (backend hiccups).
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StoreError::NotFound {
            collection: "products".into(),
            key: "A01".into(),
        };
        assert_eq!(err.to_string(), "Document not found: products/A01");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_backend_is_retryable() {
        let err = StoreError::Backend("disk I/O error".into());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invalid_credentials_carries_no_detail() {
        assert_eq!(
            StoreError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
    }
}
