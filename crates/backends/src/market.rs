use crate::http_util::{parse_json, send_json};
use async_trait::async_trait;
use core_types::{CallContext, CoreResult, MarketBackend, StockSnapshot, SymbolMatch};
use std::time::Duration;

/// HTTP adapter over the market-data feed (spec §4.1).
#[derive(Clone)]
pub struct HttpMarketBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpMarketBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl MarketBackend for HttpMarketBackend {
    async fn quote(&self, ctx: &CallContext, symbol: &str) -> CoreResult<StockSnapshot> {
        let url = format!("{}/quote/{}", self.base_url, symbol);
        let builder = self.client.get(&url);
        let response = send_json(ctx, &self.client, builder).await?;
        parse_json(response).await
    }

    async fn search_symbols(
        &self,
        ctx: &CallContext,
        query: &str,
        limit: usize,
    ) -> CoreResult<Vec<SymbolMatch>> {
        let url = format!("{}/symbols", self.base_url);
        let builder = self.client.get(&url).query(&[("q", query), ("limit", &limit.to_string())]);
        let response = send_json(ctx, &self.client, builder).await?;
        parse_json(response).await
    }
}
