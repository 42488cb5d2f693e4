//! Redis-backed [`CacheStorage`] adapter, grounded on the teacher's
//! `RedisStorage` (multiplexed connection, TTL via `SET EX`).

use std::time::Duration;

use async_trait::async_trait;
use beacon_types::ports::CacheStorage;
use beacon_types::{BeaconError, Result};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

pub struct RedisCacheStorage {
    conn: MultiplexedConnection,
}

impl RedisCacheStorage {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| BeaconError::Configuration(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| BeaconError::TransientNetwork(format!("redis connect failed: {e}")))?;
        Ok(Self { conn })
    }

    fn convert_error(err: redis::RedisError) -> BeaconError {
        BeaconError::TransientNetwork(format!("redis error: {err}"))
    }
}

#[async_trait]
impl CacheStorage for RedisCacheStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(Self::convert_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        if ttl.is_zero() {
            let _: () = conn.set(key, value).await.map_err(Self::convert_error)?;
        } else {
            let _: () = conn
                .set_ex(key, value, ttl.as_secs().max(1))
                .await
                .map_err(Self::convert_error)?;
        }
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(Self::convert_error)?;
        Ok(())
    }
}
