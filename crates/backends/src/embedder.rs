use crate::http_util::{parse_json, send_json};
use async_trait::async_trait;
use core_types::{CallContext, CoreResult, EmbedderBackend};
use std::time::Duration;

/// HTTP adapter over the embedding model (spec §4.1). `dimension` is fixed at
/// construction time rather than queried per-call, matching how the cache
/// fingerprinting and semantic-filter phase need a stable vector length
/// up front.
#[derive(Clone)]
pub struct HttpEmbedderBackend {
    base_url: String,
    client: reqwest::Client,
    dimension: usize,
}

impl HttpEmbedderBackend {
    pub fn new(base_url: impl Into<String>, dimension: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            client,
            dimension,
        }
    }
}

#[async_trait]
impl EmbedderBackend for HttpEmbedderBackend {
    async fn embed(&self, ctx: &CallContext, text: &str) -> CoreResult<Vec<f32>> {
        let url = format!("{}/embed", self.base_url);
        let builder = self.client.post(&url).json(&serde_json::json!({ "text": text }));
        let response = send_json(ctx, &self.client, builder).await?;
        parse_json(response).await
    }

    async fn embed_batch(&self, ctx: &CallContext, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        let url = format!("{}/embed/batch", self.base_url);
        let builder = self.client.post(&url).json(&serde_json::json!({ "texts": texts }));
        let response = send_json(ctx, &self.client, builder).await?;
        parse_json(response).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
