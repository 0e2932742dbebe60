/// In-memory store backend.
///
/// Backs the integration tests and local runs without Redis. Expiry is
/// checked lazily on read; conditional updates are atomic under the mutex.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::KeyValueStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Operation("store mutex poisoned".to_string()))
    }

    fn deadline(ttl_seconds: i64) -> Instant {
        Instant::now() + Duration::from_secs(ttl_seconds.max(0) as u64)
    }

    /// Returns the live value for `key`, discarding it first if expired.
    fn live_value(entries: &mut HashMap<String, Entry>, key: &str) -> Option<String> {
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Self::deadline(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock()?;
        Ok(Self::live_value(&mut entries, key))
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.lock()?;
        Ok(Self::live_value(&mut entries, key).is_some())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StoreError> {
        let mut entries = self.lock()?;
        match Self::live_value(&mut entries, key) {
            Some(current) if current == expected => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: new.to_string(),
                        expires_at: Self::deadline(ttl_seconds),
                    },
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let store = InMemoryStore::new();
        store.set("session:a", "r0", 60).await.unwrap();

        assert_eq!(store.get("session:a").await.unwrap(), Some("r0".to_string()));
        assert!(store.exists("session:a").await.unwrap());
    }

    #[tokio::test]
    async fn get_missing_key_returns_none() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("session:missing").await.unwrap(), None);
        assert!(!store.exists("session:missing").await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_entry_is_already_expired() {
        let store = InMemoryStore::new();
        store.set("revoked:x", "1", 0).await.unwrap();

        assert_eq!(store.get("revoked:x").await.unwrap(), None);
        assert!(!store.exists("revoked:x").await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_set_clobbers_a_live_entry() {
        let store = InMemoryStore::new();
        store.set("session:a", "r0", 60).await.unwrap();
        store.set("session:a", "r1", 0).await.unwrap();

        assert_eq!(store.get("session:a").await.unwrap(), None);
        assert!(!store.exists("session:a").await.unwrap());
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let store = InMemoryStore::new();
        store.set("session:a", "r0", 60).await.unwrap();
        store.set("session:a", "r1", 60).await.unwrap();

        assert_eq!(store.get("session:a").await.unwrap(), Some("r1".to_string()));
    }

    #[tokio::test]
    async fn del_removes_entry() {
        let store = InMemoryStore::new();
        store.set("session:a", "r0", 60).await.unwrap();
        store.del("session:a").await.unwrap();

        assert_eq!(store.get("session:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn compare_and_set_succeeds_on_matching_value() {
        let store = InMemoryStore::new();
        store.set("session:a", "r0", 60).await.unwrap();

        let swapped = store.compare_and_set("session:a", "r0", "r1", 60).await.unwrap();

        assert!(swapped);
        assert_eq!(store.get("session:a").await.unwrap(), Some("r1".to_string()));
    }

    #[tokio::test]
    async fn compare_and_set_fails_on_stale_expectation() {
        let store = InMemoryStore::new();
        store.set("session:a", "r1", 60).await.unwrap();

        let swapped = store.compare_and_set("session:a", "r0", "r2", 60).await.unwrap();

        assert!(!swapped);
        // The stored value is untouched by the failed swap.
        assert_eq!(store.get("session:a").await.unwrap(), Some("r1".to_string()));
    }

    #[tokio::test]
    async fn compare_and_set_fails_on_missing_key() {
        let store = InMemoryStore::new();

        let swapped = store.compare_and_set("session:a", "r0", "r1", 60).await.unwrap();

        assert!(!swapped);
        assert_eq!(store.get("session:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn compare_and_set_with_zero_ttl_retires_the_entry() {
        let store = InMemoryStore::new();
        store.set("session:a", "r0", 60).await.unwrap();

        let swapped = store.compare_and_set("session:a", "r0", "r1", 0).await.unwrap();

        // The swap is reported, but the new value is born expired.
        assert!(swapped);
        assert_eq!(store.get("session:a").await.unwrap(), None);
    }
}
