//! In-memory TTL cache implementing [`CacheStorage`], backed by `dashmap`
//! for lock-free concurrent reads across FRPEI provider fan-out.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use beacon_types::ports::CacheStorage;
use beacon_types::Result;
use dashmap::DashMap;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_expired(entry: &Entry) -> bool {
        entry.expires_at.map(|at| Instant::now() >= at).unwrap_or(false)
    }
}

#[async_trait]
impl CacheStorage for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.entries.get(key) {
            if Self::is_expired(&entry) {
                drop(entry);
                self.entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let expires_at = if ttl.is_zero() { None } else { Some(Instant::now() + ttl) };
        self.entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v".to_vec(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v".to_vec(), Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v".to_vec(), Duration::from_secs(60)).await.unwrap();
        cache.invalidate("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
