use crate::error::CoreResult;
use crate::types::{GraphRow, NewsHit, StockSnapshot};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Every backend call carries a cancellation token and an effective deadline
/// (spec §4.1). The adapter is responsible for honoring both: it must stop
/// waiting at `deadline` and must abort promptly if `cancel` fires first.
#[derive(Clone)]
pub struct CallContext {
    pub cancel: CancellationToken,
    pub deadline: tokio::time::Instant,
}

impl CallContext {
    pub fn new(timeout: std::time::Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: tokio::time::Instant::now() + timeout,
        }
    }

    pub fn child(&self, timeout: std::time::Duration) -> Self {
        let candidate = tokio::time::Instant::now() + timeout;
        Self {
            cancel: self.cancel.child_token(),
            deadline: candidate.min(self.deadline),
        }
    }

    pub fn remaining(&self) -> std::time::Duration {
        self.deadline.saturating_duration_since(tokio::time::Instant::now())
    }
}

/// Uniform async access to the graph database (spec §4.1, §6).
#[async_trait]
pub trait GraphBackend: Send + Sync {
    async fn search(
        &self,
        ctx: &CallContext,
        cypher: &str,
        params: serde_json::Value,
    ) -> CoreResult<Vec<GraphRow>>;
}

/// Filters accepted by the hybrid search backend (spec §4.1, §6).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SearchFilters {
    pub lookback_days: Option<u32>,
    pub domain: Option<String>,
}

/// Uniform async access to the hybrid lexical+vector news index (spec §4.1).
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn hybrid(
        &self,
        ctx: &CallContext,
        query: &str,
        filters: &SearchFilters,
        size: usize,
    ) -> CoreResult<Vec<NewsHit>>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
}

/// Uniform async access to the market-data feed (spec §4.1).
#[async_trait]
pub trait MarketBackend: Send + Sync {
    async fn quote(&self, ctx: &CallContext, symbol: &str) -> CoreResult<StockSnapshot>;

    async fn search_symbols(
        &self,
        ctx: &CallContext,
        query: &str,
        limit: usize,
    ) -> CoreResult<Vec<SymbolMatch>>;
}

#[derive(Debug, Clone)]
pub struct LmOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: std::time::Duration,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 2048,
            timeout: std::time::Duration::from_secs(45),
        }
    }
}

/// Uniform async access to the language-model runtime (spec §4.1).
///
/// Callers MUST NOT request `options.timeout` greater than `ctx.remaining()`;
/// adapters enforce this by clamping and logging when a caller violates it.
#[async_trait]
pub trait LmBackend: Send + Sync {
    async fn generate(
        &self,
        ctx: &CallContext,
        prompt: &str,
        options: LmOptions,
    ) -> CoreResult<String>;
}

/// Uniform async access to the embedding model (spec §4.1).
#[async_trait]
pub trait EmbedderBackend: Send + Sync {
    async fn embed(&self, ctx: &CallContext, text: &str) -> CoreResult<Vec<f32>>;

    async fn embed_batch(&self, ctx: &CallContext, texts: &[String]) -> CoreResult<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;
}
