use core_types::{
    CallContext, CoreResult, GraphBackend, GraphRow, MarketBackend, NewsHit, SearchBackend,
    SearchFilters, StockSnapshot,
};
use resilience::CircuitBreaker;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one branch: its result plus how long it took, for the
/// per-stage timing tree (spec §4.9, §4.13).
pub struct BranchOutcome<T> {
    pub result: CoreResult<T>,
    pub elapsed: Duration,
}

/// Aggregate result of one fan-out round (spec §4.9). Each branch is
/// `None` when that backend was not requested for this intent (e.g. the
/// stock handler does not query the graph).
#[derive(Default)]
pub struct FetchResult {
    pub graph: Option<BranchOutcome<Vec<GraphRow>>>,
    pub search: Option<BranchOutcome<Vec<NewsHit>>>,
    pub market: Option<BranchOutcome<StockSnapshot>>,
}

impl FetchResult {
    /// True when at least one requested branch returned usable data — the
    /// condition under which the Parallel Fetcher reports aggregate success
    /// with a `partial` flag rather than a hard failure (spec §7).
    pub fn any_success(&self) -> bool {
        self.graph.as_ref().map(|b| b.result.is_ok()).unwrap_or(false)
            || self.search.as_ref().map(|b| b.result.is_ok()).unwrap_or(false)
            || self.market.as_ref().map(|b| b.result.is_ok()).unwrap_or(false)
    }

    /// True when any *requested* branch failed — callers should mark the
    /// composed response `partial=true` (spec §6, §7).
    pub fn is_partial(&self) -> bool {
        fn failed<T>(o: &Option<BranchOutcome<T>>) -> bool {
            o.as_ref().map(|b| b.result.is_err()).unwrap_or(false)
        }
        failed(&self.graph) || failed(&self.search) || failed(&self.market)
    }
}

pub struct GraphRequest<'a> {
    pub backend: &'a Arc<dyn GraphBackend>,
    pub breaker: &'a Arc<CircuitBreaker>,
    pub cypher: &'a str,
    pub params: serde_json::Value,
}

pub struct SearchRequest<'a> {
    pub backend: &'a Arc<dyn SearchBackend>,
    pub breaker: &'a Arc<CircuitBreaker>,
    pub query: &'a str,
    pub filters: SearchFilters,
    pub size: usize,
}

pub struct MarketRequest<'a> {
    pub backend: &'a Arc<dyn MarketBackend>,
    pub breaker: &'a Arc<CircuitBreaker>,
    pub symbol: &'a str,
}

/// Fan out across a static set of backends concurrently (spec §4.9, §5).
///
/// Each branch is independently guarded by its own breaker and races against
/// `ctx`'s deadline; total wall time is bounded by that deadline regardless
/// of how long any single slow branch would otherwise take, because the
/// branch future itself is raced via `tokio::time::timeout` at the call site
/// inside `CircuitBreaker::call`. Results are merged deterministically in
/// the fixed order graph, then search, then market so downstream rerank tie
/// breaks are reproducible (spec §5).
pub async fn fetch_all(
    ctx: &CallContext,
    graph: Option<GraphRequest<'_>>,
    search: Option<SearchRequest<'_>>,
    market: Option<MarketRequest<'_>>,
) -> FetchResult {
    let graph_fut = async {
        match graph {
            Some(req) => {
                let start = Instant::now();
                let result = req
                    .breaker
                    .call(req.backend.search(ctx, req.cypher, req.params.clone()))
                    .await;
                Some(BranchOutcome {
                    result,
                    elapsed: start.elapsed(),
                })
            }
            None => None,
        }
    };

    let search_fut = async {
        match search {
            Some(req) => {
                let start = Instant::now();
                let result = req
                    .breaker
                    .call(req.backend.hybrid(ctx, req.query, &req.filters, req.size))
                    .await;
                Some(BranchOutcome {
                    result,
                    elapsed: start.elapsed(),
                })
            }
            None => None,
        }
    };

    let market_fut = async {
        match market {
            Some(req) => {
                let start = Instant::now();
                let result = req.breaker.call(req.backend.quote(ctx, req.symbol)).await;
                Some(BranchOutcome {
                    result,
                    elapsed: start.elapsed(),
                })
            }
            None => None,
        }
    };

    let (graph, search, market) = tokio::join!(graph_fut, search_fut, market_fut);
    FetchResult { graph, search, market }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use core_types::{CoreError, SymbolMatch};
    use resilience::BreakerConfig;

    struct OkGraph;
    #[async_trait]
    impl GraphBackend for OkGraph {
        async fn search(&self, _ctx: &CallContext, _cypher: &str, _params: serde_json::Value) -> CoreResult<Vec<GraphRow>> {
            Ok(vec![])
        }
    }

    struct FailSearch;
    #[async_trait]
    impl SearchBackend for FailSearch {
        async fn hybrid(&self, _ctx: &CallContext, _q: &str, _f: &SearchFilters, _size: usize) -> CoreResult<Vec<NewsHit>> {
            Err(CoreError::BackendUnavailable("down".into()))
        }
    }

    struct DummyMarket;
    #[async_trait]
    impl MarketBackend for DummyMarket {
        async fn quote(&self, _ctx: &CallContext, _symbol: &str) -> CoreResult<StockSnapshot> {
            unreachable!()
        }
        async fn search_symbols(&self, _ctx: &CallContext, _q: &str, _limit: usize) -> CoreResult<Vec<SymbolMatch>> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn partial_failure_still_reports_success_when_one_branch_ok() {
        let ctx = CallContext::new(Duration::from_secs(1));
        let graph_backend: Arc<dyn GraphBackend> = Arc::new(OkGraph);
        let search_backend: Arc<dyn SearchBackend> = Arc::new(FailSearch);
        let graph_breaker = Arc::new(CircuitBreaker::new("graph", BreakerConfig::default()));
        let search_breaker = Arc::new(CircuitBreaker::new("search", BreakerConfig::default()));

        let result = fetch_all(
            &ctx,
            Some(GraphRequest {
                backend: &graph_backend,
                breaker: &graph_breaker,
                cypher: "RETURN 1",
                params: serde_json::json!({}),
            }),
            Some(SearchRequest {
                backend: &search_backend,
                breaker: &search_breaker,
                query: "q",
                filters: SearchFilters::default(),
                size: 5,
            }),
            None,
        )
        .await;

        assert!(result.any_success());
        assert!(result.graph.unwrap().result.is_ok());
        assert!(result.search.unwrap().result.is_err());
        assert!(result.market.is_none());
    }
}
