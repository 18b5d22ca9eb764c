use crate::layer::{CacheLayer, NoopLayer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

bitflags::bitflags! {
    /// Which layers a write should fan out to (spec §4.3: "writes fan out to
    /// the requested set of layers").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Layers: u8 {
        const L1 = 0b001;
        const L2 = 0b010;
        const L3 = 0b100;
        const ALL = Self::L1.bits() | Self::L2.bits() | Self::L3.bits();
    }
}

/// The three-layer cache (spec §4.3). Reads check L1 → L2 → L3; a hit at a
/// lower layer is promoted upward at most once per read (write-through up).
/// L2/L3 default to `NoopLayer` when not configured, so callers never branch
/// on whether they are "really" present.
pub struct MultiLevelCache {
    l1: Arc<dyn CacheLayer>,
    l2: Arc<dyn CacheLayer>,
    l3: Arc<dyn CacheLayer>,
}

impl MultiLevelCache {
    pub fn new(l1: Arc<dyn CacheLayer>, l2: Option<Arc<dyn CacheLayer>>, l3: Option<Arc<dyn CacheLayer>>) -> Self {
        Self {
            l1,
            l2: l2.unwrap_or_else(|| Arc::new(NoopLayer)),
            l3: l3.unwrap_or_else(|| Arc::new(NoopLayer)),
        }
    }

    /// Raw byte-level get with upward promotion. Returns which layer served
    /// the hit (for metrics / invariant tests), or `None` on a full miss.
    pub async fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(v) = self.l1.get(key).await {
            metrics::counter!("cache_hit_total", "layer" => "l1").increment(1);
            return Some(v);
        }
        if let Some(v) = self.l2.get(key).await {
            metrics::counter!("cache_hit_total", "layer" => "l2").increment(1);
            self.l1.set(key, v.clone(), Duration::from_secs(300)).await;
            return Some(v);
        }
        if let Some(v) = self.l3.get(key).await {
            metrics::counter!("cache_hit_total", "layer" => "l3").increment(1);
            self.l1.set(key, v.clone(), Duration::from_secs(300)).await;
            self.l2.set(key, v.clone(), Duration::from_secs(1800)).await;
            return Some(v);
        }
        metrics::counter!("cache_miss_total").increment(1);
        None
    }

    pub async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration, layers: Layers) {
        if layers.contains(Layers::L1) {
            self.l1.set(key, value.clone(), ttl).await;
        }
        if layers.contains(Layers::L2) {
            self.l2.set(key, value.clone(), ttl).await;
        }
        if layers.contains(Layers::L3) {
            self.l3.set(key, value, ttl).await;
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key).await?;
        serde_json::from_slice(&raw).ok()
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration, layers: Layers) {
        if let Ok(raw) = serde_json::to_vec(value) {
            self.set_raw(key, raw, ttl, layers).await;
        }
    }

    pub async fn invalidate(&self, key: &str) {
        self.l1.invalidate(key).await;
        self.l2.invalidate(key).await;
        self.l3.invalidate(key).await;
    }

    pub async fn invalidate_prefix(&self, prefix: &str) {
        self.l1.invalidate_prefix(prefix).await;
        self.l2.invalidate_prefix(prefix).await;
        self.l3.invalidate_prefix(prefix).await;
    }

    pub async fn flush_layer(&self, layers: Layers) {
        if layers.contains(Layers::L1) {
            self.l1.flush().await;
        }
        if layers.contains(Layers::L2) {
            self.l2.flush().await;
        }
        if layers.contains(Layers::L3) {
            self.l3.flush().await;
        }
    }

    pub async fn flush_all(&self) {
        self.flush_layer(Layers::ALL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::l1::{L1Cache, L1Config};

    #[tokio::test]
    async fn l2_hit_promotes_to_l1() {
        #[derive(Clone)]
        struct FakeL2(Arc<tokio::sync::Mutex<Option<Vec<u8>>>>);

        #[async_trait::async_trait]
        impl CacheLayer for FakeL2 {
            async fn get(&self, _key: &str) -> Option<Vec<u8>> {
                self.0.lock().await.clone()
            }
            async fn set(&self, _key: &str, value: Vec<u8>, _ttl: Duration) {
                *self.0.lock().await = Some(value);
            }
            async fn invalidate(&self, _key: &str) {
                *self.0.lock().await = None;
            }
            async fn invalidate_prefix(&self, _prefix: &str) {}
            async fn flush(&self) {
                *self.0.lock().await = None;
            }
        }

        let l1 = Arc::new(L1Cache::new(L1Config::default()));
        let l2 = Arc::new(FakeL2(Arc::new(tokio::sync::Mutex::new(Some(b"hello".to_vec())))));
        let cache = MultiLevelCache::new(l1.clone(), Some(l2), None);

        let value = cache.get_raw("k").await;
        assert_eq!(value, Some(b"hello".to_vec()));
        // Promoted to L1: a direct L1 read now hits without going through L2.
        assert_eq!(l1.get("k").await, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn set_and_get_typed_value() {
        #[derive(Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Payload {
            n: u32,
        }
        let l1 = Arc::new(L1Cache::new(L1Config::default()));
        let cache = MultiLevelCache::new(l1, None, None);
        cache
            .set("p", &Payload { n: 7 }, Duration::from_secs(60), Layers::ALL)
            .await;
        let got: Option<Payload> = cache.get("p").await;
        assert_eq!(got, Some(Payload { n: 7 }));
    }
}
