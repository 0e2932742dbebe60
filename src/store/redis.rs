/// Redis store backend.
///
/// Session records and revocation tombstones live under TTL'd keys; the
/// conditional update runs as a single Lua unit so two concurrent rotations
/// cannot both observe the old value and both write.

use lazy_static::lazy_static;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::KeyValueStore;

lazy_static! {
    static ref COMPARE_AND_SET: redis::Script = redis::Script::new(
        r#"
        if redis.call('GET', KEYS[1]) ~= ARGV[1] then
            return 0
        end
        if tonumber(ARGV[3]) > 0 then
            redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
        else
            redis.call('DEL', KEYS[1])
        end
        return 1
        "#
    );
}

pub struct RedisStore {
    conn: Arc<RwLock<ConnectionManager>>,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(StoreError::from)?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(StoreError::from)?;

        Ok(RedisStore {
            conn: Arc::new(RwLock::new(conn)),
        })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), StoreError> {
        // Redis rejects EX 0; an entry that expires immediately is a delete.
        if ttl_seconds <= 0 {
            return self.del(key).await;
        }
        let mut conn = self.conn.write().await;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds as u64)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.write().await;
        let value: Option<String> = conn.get(key).await.map_err(StoreError::from)?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.write().await;
        conn.del::<_, ()>(key).await.map_err(StoreError::from)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.write().await;
        let found: bool = conn.exists(key).await.map_err(StoreError::from)?;
        Ok(found)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.write().await;
        let swapped: i64 = COMPARE_AND_SET
            .key(key)
            .arg(expected)
            .arg(new)
            .arg(ttl_seconds)
            .invoke_async(&mut *conn)
            .await
            .map_err(StoreError::from)?;
        Ok(swapped == 1)
    }
}
