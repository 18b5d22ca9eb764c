use async_trait::async_trait;
use std::time::Duration;

/// A single cache tier (spec §4.3). Implementations selected at construction
/// based on config; callers (`MultiLevelCache`) never branch on whether an
/// optional layer is actually backed by Redis/disk or is a no-op.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);
    async fn invalidate(&self, key: &str);
    async fn invalidate_prefix(&self, prefix: &str);
    async fn flush(&self);
}

/// No-op implementation selected when an optional layer (L2/L3) is disabled
/// in config (spec §9: "optional dependencies ... wrap in capability
/// interfaces with no-op implementations selected at init").
pub struct NoopLayer;

#[async_trait]
impl CacheLayer for NoopLayer {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) {}

    async fn invalidate(&self, _key: &str) {}

    async fn invalidate_prefix(&self, _prefix: &str) {}

    async fn flush(&self) {}
}
