use crate::convert::{graph_row_to_context_item, news_hit_to_context_item, stock_snapshot_to_context_item};
use crate::formatter::format_report;
use crate::keywords::refine_keywords;
use context_engine::config::ContextEngineConfig;
use core_types::{
    CallContext, ContextItem, GraphBackend, GraphRow, LmBackend, MarketBackend, Query, Report,
    ResponseMeta, SearchBackend, SearchFilters,
};
use resilience::BreakerRegistry;
use retrieval::cypher_builder::{build_cypher, LabelKeyMap};
use retrieval::parallel_fetcher::{fetch_all, GraphRequest, MarketRequest, SearchRequest};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const CITATIONS_N: usize = 5;
const GRAPH_SAMPLES_K: usize = 5;
const SOFT_BUDGET: Duration = Duration::from_millis(1500);
const GRAPH_QUERY_LIMIT: usize = 20;
const SEARCH_QUERY_SIZE: usize = 20;

/// Which data sources a given intent should fan out to (spec §4.7 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    News,
    Stock,
    General,
}

impl HandlerKind {
    fn wants_graph(&self) -> bool {
        matches!(self, HandlerKind::News | HandlerKind::General)
    }
    fn wants_search(&self) -> bool {
        matches!(self, HandlerKind::News | HandlerKind::Stock | HandlerKind::General)
    }
    fn wants_market(&self) -> bool {
        matches!(self, HandlerKind::Stock | HandlerKind::General)
    }

    fn heading(&self) -> &'static str {
        match self {
            HandlerKind::News => "관련 뉴스",
            HandlerKind::Stock => "시세 정보",
            HandlerKind::General => "종합 답변",
        }
    }
}

/// Shared pooled connections a Fast Handler dispatches over (spec §4.7, §5.
/// "Connection pools ... are created once at init and reused").
pub struct HandlerDeps {
    pub graph: Arc<dyn GraphBackend>,
    pub search: Arc<dyn SearchBackend>,
    pub market: Arc<dyn MarketBackend>,
    pub lm: Option<Arc<dyn LmBackend>>,
    pub breakers: Arc<BreakerRegistry>,
    pub key_map: LabelKeyMap,
}

/// Run one Fast Handler end to end (spec §4.7): refine keywords, build
/// graph/search queries, fan out, apply lightweight Context Engineering
/// (filter + rerank only, no sequencing), and format the answer.
pub async fn run_fast_handler(
    kind: HandlerKind,
    query: &Query,
    symbol: Option<&str>,
    deps: &HandlerDeps,
) -> Report {
    let start = Instant::now();
    let ctx = CallContext::new(SOFT_BUDGET);

    let keywords = refine_keywords(query, deps.lm.as_deref(), &ctx).await;
    let primary_keyword = keywords.first().cloned().unwrap_or_else(|| query.text.clone());

    let (cypher, params) = build_cypher(&keywords, GRAPH_QUERY_LIMIT, Some(180), None, &deps.key_map);

    let graph_breaker = deps.breakers.get("graph");
    let search_breaker = deps.breakers.get("search");
    let market_breaker = deps.breakers.get("market");

    let graph_req = kind.wants_graph().then(|| GraphRequest {
        backend: &deps.graph,
        breaker: &graph_breaker,
        cypher: cypher.as_str(),
        params: params.clone(),
    });

    let search_req = kind.wants_search().then(|| SearchRequest {
        backend: &deps.search,
        breaker: &search_breaker,
        query: primary_keyword.as_str(),
        filters: SearchFilters::default(),
        size: SEARCH_QUERY_SIZE,
    });

    let symbol_owned = symbol.map(str::to_string).unwrap_or_else(|| primary_keyword.clone());
    let market_req = kind.wants_market().then(|| MarketRequest {
        backend: &deps.market,
        breaker: &market_breaker,
        symbol: symbol_owned.as_str(),
    });

    let fetched = fetch_all(&ctx, graph_req, search_req, market_req).await;
    let partial = fetched.is_partial();

    let graph_samples: Vec<GraphRow> = fetched
        .graph
        .as_ref()
        .and_then(|b| b.result.as_ref().ok())
        .cloned()
        .unwrap_or_default();

    let mut items: Vec<ContextItem> = Vec::new();
    if let Some(outcome) = &fetched.graph {
        if let Ok(rows) = &outcome.result {
            items.extend(rows.iter().cloned().map(graph_row_to_context_item));
        }
    }
    if let Some(outcome) = &fetched.search {
        if let Ok(hits) = &outcome.result {
            items.extend(hits.iter().cloned().map(news_hit_to_context_item));
        }
    }
    if let Some(outcome) = &fetched.market {
        if let Ok(snapshot) = &outcome.result {
            items.push(stock_snapshot_to_context_item(snapshot.clone()));
        }
    }

    // Lightweight Context Engineering: filter + rerank only, no sequencing
    // (spec §4.7 step 4) — done by running the full pipeline and then
    // restoring pre-sequencing relevance order is unnecessary; Phases 1-4
    // alone give us filter+rerank, so we call the phase functions directly
    // rather than the full `engineer()` entrypoint.
    let config = ContextEngineConfig::default();
    let scored = context_engine::phases::phase1_relevance_cascade(items, &config);
    let scored = context_engine::phases::phase2_semantic_filter(scored, None, HashMap::new(), &config);
    let scored = context_engine::phases::phase3_deduplicate(scored, &config);
    let scored = context_engine::phases::phase4_rerank(scored, None, &config);
    let mut items: Vec<ContextItem> = scored.into_iter().map(|s| s.item).collect();
    items.truncate(CITATIONS_N.max(GRAPH_SAMPLES_K));

    let meta = ResponseMeta {
        processing_time_ms: start.elapsed().as_millis() as u64,
        intent: Some(query.intent),
        confidence: Some(query.confidence),
        complexity_score: None,
        analysis_depth: None,
        processing_method: Some(format!("fast_handler:{kind:?}")),
        quality_score: None,
        partial: Some(partial),
        graph_samples_shown: Some(graph_samples.len().min(GRAPH_SAMPLES_K)),
        fallback: Some(false),
    };

    format_report(
        match kind {
            HandlerKind::News => "news",
            HandlerKind::Stock => "stock",
            HandlerKind::General => "general",
        },
        kind.heading(),
        &items,
        graph_samples,
        meta,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use core_types::{CoreError, CoreResult, NewsHit, StockSnapshot, SymbolMatch};
    use resilience::BreakerConfig;

    struct EmptyGraph;
    #[async_trait]
    impl GraphBackend for EmptyGraph {
        async fn search(&self, _ctx: &CallContext, _cypher: &str, _params: serde_json::Value) -> CoreResult<Vec<GraphRow>> {
            Ok(vec![])
        }
    }

    struct FailingSearch;
    #[async_trait]
    impl core_types::SearchBackend for FailingSearch {
        async fn hybrid(
            &self,
            _ctx: &CallContext,
            _query: &str,
            _filters: &SearchFilters,
            _size: usize,
        ) -> CoreResult<Vec<NewsHit>> {
            Err(CoreError::BackendUnavailable("search down".into()))
        }
    }

    struct DummyMarket;
    #[async_trait]
    impl MarketBackend for DummyMarket {
        async fn quote(&self, _ctx: &CallContext, _symbol: &str) -> CoreResult<StockSnapshot> {
            Err(CoreError::BackendUnavailable("unused".into()))
        }
        async fn search_symbols(&self, _ctx: &CallContext, _q: &str, _limit: usize) -> CoreResult<Vec<SymbolMatch>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn news_handler_marks_partial_when_search_fails() {
        let deps = HandlerDeps {
            graph: Arc::new(EmptyGraph),
            search: Arc::new(FailingSearch),
            market: Arc::new(DummyMarket),
            lm: None,
            breakers: Arc::new(BreakerRegistry::new(BreakerConfig::default())),
            key_map: LabelKeyMap::default(),
        };
        let query = Query::new("삼성전자 뉴스");
        let report = run_fast_handler(HandlerKind::News, &query, None, &deps).await;
        assert_eq!(report.meta.partial, Some(true));
        assert_eq!(report.response_type, "news");
    }
}
