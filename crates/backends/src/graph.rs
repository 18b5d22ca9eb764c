use crate::http_util::{parse_json, send_json};
use async_trait::async_trait;
use core_types::{CallContext, CoreResult, GraphBackend, GraphRow};
use serde::Deserialize;
use std::time::Duration;

/// HTTP adapter over a graph query service (spec §4.1, §6). The graph
/// database itself is out of scope (spec §1); this only speaks whatever
/// JSON-over-HTTP query endpoint fronts it.
#[derive(Clone)]
pub struct HttpGraphBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGraphBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    rows: Vec<GraphRow>,
}

#[async_trait]
impl GraphBackend for HttpGraphBackend {
    async fn search(
        &self,
        ctx: &CallContext,
        cypher: &str,
        params: serde_json::Value,
    ) -> CoreResult<Vec<GraphRow>> {
        let url = format!("{}/query", self.base_url);
        let body = serde_json::json!({ "statement": cypher, "parameters": params });
        let builder = self.client.post(&url).json(&body);
        let response = send_json(ctx, &self.client, builder).await?;
        let parsed: QueryResponse = parse_json(response).await?;
        Ok(parsed.rows)
    }
}
