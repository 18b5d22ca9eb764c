use crate::layer::CacheLayer;
use async_trait::async_trait;
use chrono::Utc;
use core_types::CacheEntry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct L1Config {
    pub max_items: usize,
    pub max_mb: usize,
    pub default_ttl: Duration,
}

impl Default for L1Config {
    fn default() -> Self {
        Self {
            max_items: 10_000,
            max_mb: 256,
            default_ttl: Duration::from_secs(600),
        }
    }
}

/// In-process L1 cache: `dashmap`-backed entries plus insertion-recency LRU
/// order (spec §4.3). TTL is per-entry; the default comes from config but
/// every `set` call may override it (time-sensitive callers pass a shorter
/// or hour-bucketed key instead of a shorter TTL — see `fingerprint`).
pub struct L1Cache {
    entries: DashMap<String, CacheEntry<Vec<u8>>>,
    order: StdMutex<VecDeque<String>>,
    config: L1Config,
    approx_bytes: AtomicUsize,
}

impl L1Cache {
    pub fn new(config: L1Config) -> Self {
        Self {
            entries: DashMap::new(),
            order: StdMutex::new(VecDeque::new()),
            config,
            approx_bytes: AtomicUsize::new(0),
        }
    }

    fn touch(&self, key: &str) {
        let mut order = self.order.lock().unwrap();
        order.retain(|k| k != key);
        order.push_back(key.to_string());
    }

    fn evict_if_needed(&self) {
        let max_bytes = self.config.max_mb * 1024 * 1024;
        loop {
            let over_items = self.entries.len() > self.config.max_items;
            let over_bytes = self.approx_bytes.load(Ordering::Relaxed) > max_bytes;
            if !over_items && !over_bytes {
                break;
            }
            let victim = {
                let mut order = self.order.lock().unwrap();
                order.pop_front()
            };
            match victim {
                Some(key) => {
                    if let Some((_, entry)) = self.entries.remove(&key) {
                        self.approx_bytes
                            .fetch_sub(entry.value.len(), Ordering::Relaxed);
                    }
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheLayer for L1Cache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entry = self.entries.get_mut(key)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        entry.hits += 1;
        let value = entry.value.clone();
        drop(entry);
        self.touch(key);
        Some(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let ttl = if ttl.is_zero() { self.config.default_ttl } else { ttl };
        let size = value.len();
        if let Some(old) = self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: Utc::now(),
                ttl,
                hits: 0,
            },
        ) {
            self.approx_bytes.fetch_sub(old.value.len(), Ordering::Relaxed);
        }
        self.approx_bytes.fetch_add(size, Ordering::Relaxed);
        self.touch(key);
        self.evict_if_needed();
    }

    async fn invalidate(&self, key: &str) {
        if let Some((_, entry)) = self.entries.remove(key) {
            self.approx_bytes.fetch_sub(entry.value.len(), Ordering::Relaxed);
        }
        self.order.lock().unwrap().retain(|k| k != key);
    }

    async fn invalidate_prefix(&self, prefix: &str) {
        let keys: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| k.starts_with(prefix))
            .collect();
        for key in keys {
            self.invalidate(&key).await;
        }
    }

    async fn flush(&self) {
        self.entries.clear();
        self.order.lock().unwrap().clear();
        self.approx_bytes.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_within_ttl() {
        let cache = L1Cache::new(L1Config::default());
        cache.set("k", b"v".to_vec(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn expired_entry_is_evicted_on_read() {
        let cache = L1Cache::new(L1Config::default());
        cache.set("k", b"v".to_vec(), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn evicts_lru_when_over_capacity() {
        let cache = L1Cache::new(L1Config {
            max_items: 2,
            max_mb: 256,
            default_ttl: Duration::from_secs(60),
        });
        cache.set("a", b"1".to_vec(), Duration::from_secs(60)).await;
        cache.set("b", b"2".to_vec(), Duration::from_secs(60)).await;
        cache.get("a").await; // refresh recency of "a"
        cache.set("c", b"3".to_vec(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("b").await, None); // least-recently-used
        assert!(cache.get("a").await.is_some());
        assert!(cache.get("c").await.is_some());
    }
}
