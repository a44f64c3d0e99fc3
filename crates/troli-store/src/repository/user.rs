//! # User Repository
//!
//! User records (`users/{username}`) and credential verification.
//!
//! ## Password Storage
//! The `password` field of a user document holds an argon2 PHC hash, never
//! the plaintext. Verification parses the stored hash and checks the
//! candidate against it; unknown user and wrong password are deliberately
//! indistinguishable to the caller.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use troli_core::validation::{validate_password, validate_username};

use crate::document::DocumentStore;
use crate::error::{StoreError, StoreResult};
use crate::USERS;

// =============================================================================
// Document Shapes
// =============================================================================

/// Body shape of a `users/{username}` document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDoc {
    username: String,
    email_phone: String,
    /// argon2 PHC string, e.g. "$argon2id$v=19$...".
    password: String,
    role: String,
}

/// A successfully authenticated user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub username: String,
    pub email_phone: String,
    pub role: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user records and login verification.
#[derive(Debug, Clone)]
pub struct UserRepository<S> {
    store: S,
}

impl<S: DocumentStore> UserRepository<S> {
    /// Creates a new UserRepository over the given store.
    pub fn new(store: S) -> Self {
        UserRepository { store }
    }

    /// Creates (or replaces) a user record, hashing the password.
    pub async fn create(
        &self,
        username: &str,
        email_phone: &str,
        password: &str,
        role: &str,
    ) -> StoreResult<()> {
        let username = validate_username(username)?;
        validate_password(password)?;

        let doc = UserDoc {
            username: username.clone(),
            email_phone: email_phone.to_string(),
            password: hash_password(password)?,
            role: role.to_string(),
        };

        let body = serde_json::to_value(&doc)?;
        self.store.put(USERS, &username, &body).await
    }

    /// Verifies a username/password pair.
    ///
    /// Returns `InvalidCredentials` for unknown users AND wrong passwords;
    /// store-level failures propagate separately so a broken store never
    /// reads as a rejected login.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> StoreResult<AuthenticatedUser> {
        let username =
            validate_username(username).map_err(|_| StoreError::InvalidCredentials)?;
        validate_password(password).map_err(|_| StoreError::InvalidCredentials)?;

        let Some(body) = self.store.get(USERS, &username).await? else {
            debug!(username = %username, "Login for unknown user");
            return Err(StoreError::InvalidCredentials);
        };

        let doc: UserDoc =
            serde_json::from_value(body).map_err(|e| StoreError::InvalidDocument {
                collection: USERS.to_string(),
                key: username.clone(),
                reason: e.to_string(),
            })?;

        if !verify_password(password, &doc.password) {
            warn!(username = %username, "Password verification failed");
            return Err(StoreError::InvalidCredentials);
        }

        Ok(AuthenticatedUser {
            username: doc.username,
            email_phone: doc.email_phone,
            role: doc.role,
        })
    }
}

// =============================================================================
// Hashing Helpers
// =============================================================================

/// Hashes a password for storage (argon2id, random salt, PHC string).
pub fn hash_password(password: &str) -> StoreResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Hash(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password candidate against a stored PHC hash.
fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryStore;

    #[test]
    fn test_hash_verify_roundtrip() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("rahasia123", &hash));
        assert!(!verify_password("salah", &hash));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_create_and_verify() {
        let repo = UserRepository::new(MemoryStore::new());
        repo.create("budi", "0812-000-111", "rahasia123", "tablet")
            .await
            .unwrap();

        let user = repo
            .verify_credentials("budi", "rahasia123")
            .await
            .unwrap();
        assert_eq!(user.username, "budi");
        assert_eq!(user.role, "tablet");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_alike() {
        let repo = UserRepository::new(MemoryStore::new());
        repo.create("budi", "0812-000-111", "rahasia123", "tablet")
            .await
            .unwrap();

        let wrong = repo.verify_credentials("budi", "salah").await.unwrap_err();
        let unknown = repo
            .verify_credentials("siti", "rahasia123")
            .await
            .unwrap_err();

        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_stored_password_is_not_plaintext() {
        let store = MemoryStore::new();
        let repo = UserRepository::new(store.clone());
        repo.create("budi", "0812-000-111", "rahasia123", "tablet")
            .await
            .unwrap();

        let body = store.get(USERS, "budi").await.unwrap().unwrap();
        let stored = body["password"].as_str().unwrap();
        assert_ne!(stored, "rahasia123");
        assert!(stored.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_invalid_credentials() {
        let store = MemoryStore::new();
        let repo = UserRepository::new(store.clone());

        store.set_failing(true);
        let err = repo
            .verify_credentials("budi", "rahasia123")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
