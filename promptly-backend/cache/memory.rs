use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Cache, CachePayload};

struct Entry {
    raw: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process cache with per-entry expiry. Values go through the same
/// encode/decode path as the Redis backend. Expired entries are dropped on
/// read and swept on every write, so keys that are never read again do not
/// accumulate.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn contains(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<CachePayload> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_live(now) => {
                    return Some(CachePayload::decode(&entry.raw));
                }
                Some(_) => {}
            }
        }
        // Expired.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: CachePayload, ttl: Duration) {
        let now = Instant::now();
        let expires_at = (!ttl.is_zero()).then(|| now + ttl);
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                raw: value.encode(),
                expires_at,
            },
        );
    }

    async fn delete(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}
