//! # Local Session State
//!
//! The one persisted device-local key: the currently authenticated user as
//! JSON under `local/currentUser`. Read once at startup, cleared on logout.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::document::DocumentStore;
use crate::error::StoreResult;
use crate::LOCAL;

/// Key of the current-user document within the `local` collection.
const CURRENT_USER_KEY: &str = "currentUser";

/// The persisted identity of the logged-in operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub username: String,
    pub email_phone: String,
}

/// Accessor for the persisted local session.
#[derive(Debug, Clone)]
pub struct LocalSession<S> {
    store: S,
}

impl<S: DocumentStore> LocalSession<S> {
    /// Creates a new LocalSession over the given store.
    pub fn new(store: S) -> Self {
        LocalSession { store }
    }

    /// Persists the current user after a successful login.
    pub async fn save(&self, user: &CurrentUser) -> StoreResult<()> {
        let body: Value = serde_json::to_value(user)?;
        self.store.put(LOCAL, CURRENT_USER_KEY, &body).await
    }

    /// Loads the persisted user at startup. `None` when nobody is logged in
    /// or the stored JSON has rotted (treated as logged out, not an error).
    pub async fn load(&self) -> StoreResult<Option<CurrentUser>> {
        let Some(body) = self.store.get(LOCAL, CURRENT_USER_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_value(body) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                debug!(error = %e, "Discarding malformed current-user document");
                Ok(None)
            }
        }
    }

    /// Clears the persisted user on logout. Idempotent.
    pub async fn clear(&self) -> StoreResult<()> {
        self.store.delete(LOCAL, CURRENT_USER_KEY).await
    }
}
