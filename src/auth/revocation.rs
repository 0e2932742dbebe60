/// Revocation registry.
///
/// TTL-bounded tombstones for credentials taken out of circulation before
/// their natural expiry (logout, rotation, detected reuse). Entries are
/// keyed by fingerprint and live no longer than the credential they revoke,
/// so the registry self-prunes.

use std::sync::Arc;

use crate::auth::jwt::fingerprint;
use crate::error::StoreError;
use crate::store::KeyValueStore;

#[derive(Clone)]
pub struct RevocationRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl RevocationRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(token: &str) -> String {
        format!("revoked:{}", fingerprint(token))
    }

    /// Revoke a credential for the remainder of its validity.
    ///
    /// Idempotent; revoking twice is indistinguishable from once. A
    /// non-positive TTL means the credential has already expired and no
    /// tombstone is written.
    ///
    /// # Errors
    /// Returns error if the backing store write fails
    pub async fn revoke(&self, token: &str, ttl_seconds: i64) -> Result<(), StoreError> {
        if ttl_seconds <= 0 {
            return Ok(());
        }
        self.store.set(&Self::key(token), "1", ttl_seconds).await
    }

    /// Best-effort revocation check.
    ///
    /// Store unavailability degrades to "not revoked" with the failure
    /// logged; the request-authorization path must stay available.
    pub async fn is_revoked(&self, token: &str) -> bool {
        match self.store.exists(&Self::key(token)).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Revocation check degraded, treating credential as not revoked"
                );
                false
            }
        }
    }
}
