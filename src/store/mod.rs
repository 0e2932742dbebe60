/// Backing key-value store for session records and revocation tombstones.
///
/// Values are opaque strings compared by exact equality only. Keys are
/// namespaced by the callers (`session:<principal_id>`,
/// `revoked:<fingerprint>`).

use async_trait::async_trait;

use crate::error::StoreError;

mod memory;
mod redis;

pub use memory::InMemoryStore;
pub use redis::RedisStore;

/// Store contract consumed by the session store and revocation registry.
///
/// A `ttl_seconds` at or below zero writes nothing observable: the key reads
/// as absent afterwards, on every backend, and any previous value is gone.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn del(&self, key: &str) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Writes `new` only if the stored value still equals `expected`.
    /// Returns whether the write happened. A missing key never matches.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StoreError>;
}
