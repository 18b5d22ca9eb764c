use crate::config::Config;
use backends::{HttpEmbedderBackend, HttpGraphBackend, HttpLmBackend, HttpMarketBackend, HttpSearchBackend};
use cache::l1::{L1Cache, L1Config};
use cache::{l2_redis::L2Redis, l3_disk::L3Disk, MultiLevelCache};
use context_engine::config::ContextEngineConfig;
use deep_workflow::WorkflowDeps;
use fast_handlers::HandlerDeps;
use observability::TracingSink;
use resilience::{BreakerConfig, BreakerRegistry};
use retrieval::LabelKeyMap;
use std::sync::Arc;
use std::time::Duration;

/// Shared, process-lifetime state handed to every route via axum's
/// `State<AppState>` extractor (spec §5: "Connection pools ... are created
/// once at init and reused").
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub breakers: Arc<BreakerRegistry>,
    pub cache: Arc<MultiLevelCache>,
    pub handler_deps: Arc<HandlerDeps>,
    pub workflow_deps: Arc<WorkflowDeps>,
    pub sink: Arc<dyn TracingSink>,
}

impl AppState {
    /// Lifecycle `init()` (spec §4.14): opens pooled connections, builds the
    /// breaker registry and cache stack, preloads nothing eagerly beyond
    /// what the HTTP clients themselves do lazily on first call.
    pub async fn init(config: Config) -> anyhow::Result<Self> {
        let graph: Arc<dyn core_types::GraphBackend> = Arc::new(HttpGraphBackend::new(config.graph.url.clone()));
        let search: Arc<dyn core_types::SearchBackend> = Arc::new(HttpSearchBackend::new(config.search.url.clone()));
        let market: Arc<dyn core_types::MarketBackend> = Arc::new(HttpMarketBackend::new(config.market.url.clone()));
        let lm: Arc<dyn core_types::LmBackend> = Arc::new(HttpLmBackend::new(config.lm_base_url.clone()));
        let embedder: Arc<dyn core_types::EmbedderBackend> =
            Arc::new(HttpEmbedderBackend::new(config.embedder_base_url.clone(), config.embedder_dim));

        let breaker_defaults = BreakerConfig {
            failure_threshold: config.breaker.failure_threshold,
            recovery_timeout: Duration::from_secs(config.breaker.recovery_s),
            half_open_success_threshold: 2,
            call_timeout: Duration::from_secs(config.breaker.call_timeout_s),
            half_open_probes: config.breaker.half_open_probes,
        };
        let breakers = Arc::new(BreakerRegistry::new(breaker_defaults));

        let l1 = Arc::new(L1Cache::new(L1Config {
            max_items: config.cache.l1_max_items,
            max_mb: config.cache.l1_max_mb,
            default_ttl: config.cache.l1_default_ttl,
        }));

        let l2: Option<Arc<dyn cache::CacheLayer>> = if config.cache.l2_enabled {
            let redis = L2Redis::connect(&config.cache.l2_url, config.cache.l2_prefix.clone()).await?;
            Some(Arc::new(redis))
        } else {
            None
        };

        let l3: Option<Arc<dyn cache::CacheLayer>> = if config.cache.l3_enabled {
            Some(Arc::new(L3Disk::open(&config.cache.l3_dir)?))
        } else {
            None
        };

        let cache = Arc::new(MultiLevelCache::new(l1, l2, l3));
        let key_map = LabelKeyMap::default();
        let context_config = ContextEngineConfig::default();

        let handler_deps = Arc::new(HandlerDeps {
            graph: graph.clone(),
            search: search.clone(),
            market: market.clone(),
            lm: Some(lm.clone()),
            breakers: breakers.clone(),
            key_map: key_map.clone(),
        });

        let workflow_deps = Arc::new(WorkflowDeps {
            graph,
            search,
            market,
            lm,
            embedder,
            breakers: breakers.clone(),
            cache: cache.clone(),
            key_map,
            context_config,
        });

        let sink: Arc<dyn TracingSink> = Arc::from(observability::build_sink(
            config.tracing_enabled,
            config.tracing_host.as_deref(),
            config.tracing_secret.as_deref(),
        ));

        Ok(Self {
            config: Arc::new(config),
            breakers,
            cache,
            handler_deps,
            workflow_deps,
            sink,
        })
    }

    /// Lifecycle `shutdown()` (spec §4.14): flush L3 so whatever survived the
    /// process lifetime is available to the next instance. Connection pools
    /// close on drop; in-flight drain is handled by the caller (`main.rs`)
    /// via axum's graceful-shutdown signal before this runs.
    pub async fn shutdown(&self) {
        self.cache.flush_layer(cache::Layers::L3).await;
    }
}
