/// Session store.
///
/// At most one record per principal: `session:<principal_id>` holds the
/// raw value of the currently valid refresh credential. Records are
/// overwritten, never merged; the conditional swap is what serializes
/// concurrent rotations for one principal without a global lock.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreError;
use crate::store::KeyValueStore;

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(principal_id: &Uuid) -> String {
        format!("session:{}", principal_id)
    }

    /// Unconditionally make `refresh_token` the principal's current
    /// credential (login, signup, federated signin).
    pub async fn set_current(
        &self,
        principal_id: &Uuid,
        refresh_token: &str,
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        self.store
            .set(&Self::key(principal_id), refresh_token, ttl_seconds)
            .await
    }

    pub async fn get_current(&self, principal_id: &Uuid) -> Result<Option<String>, StoreError> {
        self.store.get(&Self::key(principal_id)).await
    }

    /// Advance the current credential only if it still equals `expected`.
    /// Returns whether the swap happened.
    pub async fn swap_current(
        &self,
        principal_id: &Uuid,
        expected: &str,
        new: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StoreError> {
        self.store
            .compare_and_set(&Self::key(principal_id), expected, new, ttl_seconds)
            .await
    }

    /// Remove the record (logout, or reuse detected).
    pub async fn clear(&self, principal_id: &Uuid) -> Result<(), StoreError> {
        self.store.del(&Self::key(principal_id)).await
    }
}
