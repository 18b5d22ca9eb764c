use crate::layer::CacheLayer;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Optional distributed KV layer (spec §4.3). TTL range 30min-2h per spec;
/// enforced by the caller via the `ttl` argument to `set`.
pub struct L2Redis {
    conn: ConnectionManager,
    prefix: String,
}

impl L2Redis {
    pub async fn connect(url: &str, prefix: impl Into<String>) -> redis::RedisResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheLayer for L2Redis {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<Vec<u8>>>(self.full_key(key))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "L2 redis get failed, degrading to miss");
                None
            })
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let mut conn = self.conn.clone();
        let secs = ttl.as_secs().max(1);
        if let Err(e) = conn
            .set_ex::<_, _, ()>(self.full_key(key), value, secs)
            .await
        {
            tracing::warn!(error = %e, "L2 redis set failed");
        }
    }

    async fn invalidate(&self, key: &str) {
        let mut conn = self.conn.clone();
        let _: Result<(), _> = conn.del(self.full_key(key)).await;
    }

    async fn invalidate_prefix(&self, prefix: &str) {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", self.full_key(prefix));
        let keys: Vec<String> = conn.keys(pattern).await.unwrap_or_default();
        if !keys.is_empty() {
            let _: Result<(), _> = conn.del(keys).await;
        }
    }

    async fn flush(&self) {
        let mut conn = self.conn.clone();
        let pattern = format!("{}:*", self.prefix);
        let keys: Vec<String> = conn.keys(pattern).await.unwrap_or_default();
        if !keys.is_empty() {
            let _: Result<(), _> = conn.del(keys).await;
        }
    }
}
