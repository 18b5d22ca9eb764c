use crate::http_util::{parse_json, send_json};
use async_trait::async_trait;
use core_types::{CallContext, CoreResult, NewsHit, SearchBackend, SearchFilters};
use std::time::Duration;

/// HTTP adapter over the hybrid lexical+vector news index (spec §4.1).
/// Re-ranking (`bm25 * α + cosine * β + recency_bonus`) happens inside the
/// index itself; this adapter only shapes the request and parses the hits.
#[derive(Clone)]
pub struct HttpSearchBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSearchBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn hybrid(
        &self,
        ctx: &CallContext,
        query: &str,
        filters: &SearchFilters,
        size: usize,
    ) -> CoreResult<Vec<NewsHit>> {
        let url = format!("{}/search/hybrid", self.base_url);
        let body = serde_json::json!({
            "query": query,
            "lookback_days": filters.lookback_days,
            "domain": filters.domain,
            "size": size,
        });
        let builder = self.client.post(&url).json(&body);
        let response = send_json(ctx, &self.client, builder).await?;
        parse_json(response).await
    }
}
