use cache::MultiLevelCache;
use core_types::{EmbedderBackend, GraphBackend, LmBackend, MarketBackend, SearchBackend};
use context_engine::config::ContextEngineConfig;
use resilience::BreakerRegistry;
use retrieval::LabelKeyMap;
use std::sync::Arc;

/// Pooled connections and shared infrastructure the ten-node DAG runs over
/// (spec §4.11, §4.14). One instance lives for the process lifetime.
pub struct WorkflowDeps {
    pub graph: Arc<dyn GraphBackend>,
    pub search: Arc<dyn SearchBackend>,
    pub market: Arc<dyn MarketBackend>,
    pub lm: Arc<dyn LmBackend>,
    pub embedder: Arc<dyn EmbedderBackend>,
    pub breakers: Arc<BreakerRegistry>,
    pub cache: Arc<MultiLevelCache>,
    pub key_map: LabelKeyMap,
    pub context_config: ContextEngineConfig,
}
