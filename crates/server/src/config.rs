use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Process-wide configuration (spec §4.14), assembled from environment
/// variables the same way the teacher's `AgentConfig::from_env` does:
/// every option has a documented default except credentials, which are
/// required.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub metrics_addr: String,

    pub graph: BackendConfig,
    pub search: BackendConfig,
    pub market: BackendConfig,

    pub lm_base_url: String,
    pub lm_timeout_ms: u64,
    pub embedder_base_url: String,
    pub embedder_dim: usize,

    pub cache: CacheConfig,
    pub router: RouterConfig,
    pub breaker: BreakerTuning,
    pub context_lookback_days: u32,

    pub tracing_enabled: bool,
    pub tracing_host: Option<String>,
    pub tracing_secret: Option<String>,
    pub json_logs: bool,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub l1_max_items: usize,
    pub l1_max_mb: usize,
    pub l1_default_ttl: Duration,
    pub l2_enabled: bool,
    pub l2_url: String,
    pub l2_prefix: String,
    pub l3_enabled: bool,
    pub l3_dir: String,
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub deep_threshold: f64,
    pub depth_timeouts_s: [u64; 4],
}

#[derive(Debug, Clone)]
pub struct BreakerTuning {
    pub failure_threshold: u32,
    pub recovery_s: u64,
    pub call_timeout_s: u64,
    pub half_open_probes: u32,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v.parse::<T>().map_err(|e| anyhow::anyhow!("{key}: {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
            metrics_addr: env_or("METRICS_ADDR", "0.0.0.0:9090"),

            graph: BackendConfig {
                url: env::var("GRAPH_URL").context("GRAPH_URL not set")?,
                timeout_ms: parse_env_or("GRAPH_TIMEOUT_MS", 3_000)?,
            },
            search: BackendConfig {
                url: env::var("SEARCH_URL").context("SEARCH_URL not set")?,
                timeout_ms: parse_env_or("SEARCH_TIMEOUT_MS", 2_000)?,
            },
            market: BackendConfig {
                url: env::var("MARKET_URL").context("MARKET_URL not set")?,
                timeout_ms: parse_env_or("MARKET_TIMEOUT_MS", 1_500)?,
            },

            lm_base_url: env::var("LM_BASE_URL").context("LM_BASE_URL not set")?,
            lm_timeout_ms: parse_env_or("LM_TIMEOUT_MS", 45_000)?,
            embedder_base_url: env::var("EMBEDDER_URL").context("EMBEDDER_URL not set")?,
            embedder_dim: parse_env_or("EMBEDDER_DIM", 768)?,

            cache: CacheConfig {
                l1_max_items: parse_env_or("CACHE_L1_MAX_ITEMS", 10_000)?,
                l1_max_mb: parse_env_or("CACHE_L1_MAX_MB", 256)?,
                l1_default_ttl: Duration::from_secs(parse_env_or("CACHE_L1_TTL_S", 300)?),
                l2_enabled: parse_env_or("CACHE_L2_ENABLED", false)?,
                l2_url: env_or("CACHE_L2_URL", "redis://127.0.0.1:6379"),
                l2_prefix: env_or("CACHE_L2_PREFIX", "ontology-chat"),
                l3_enabled: parse_env_or("CACHE_L3_ENABLED", false)?,
                l3_dir: env_or("CACHE_L3_DIR", "./data/l3-cache"),
            },

            router: RouterConfig {
                deep_threshold: parse_env_or("ROUTER_DEEP_THRESHOLD", 0.85)?,
                depth_timeouts_s: [
                    parse_env_or("ROUTER_TIMEOUT_SHALLOW_S", 60)?,
                    parse_env_or("ROUTER_TIMEOUT_STANDARD_S", 90)?,
                    parse_env_or("ROUTER_TIMEOUT_DEEP_S", 120)?,
                    parse_env_or("ROUTER_TIMEOUT_COMPREHENSIVE_S", 180)?,
                ],
            },

            breaker: BreakerTuning {
                failure_threshold: parse_env_or("BREAKER_FAILURE_THRESHOLD", 5)?,
                recovery_s: parse_env_or("BREAKER_RECOVERY_S", 60)?,
                call_timeout_s: parse_env_or("BREAKER_CALL_TIMEOUT_S", 2)?,
                half_open_probes: parse_env_or("BREAKER_HALF_OPEN_PROBES", 2)?,
            },

            context_lookback_days: parse_env_or("CONTEXT_LOOKBACK_DAYS", 180)?,

            tracing_enabled: parse_env_or("TRACING_ENABLED", false)?,
            tracing_host: env::var("TRACING_HOST").ok(),
            tracing_secret: env::var("TRACING_SECRET").ok(),
            json_logs: parse_env_or("JSON_LOGS", false)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Config::from_env reads process-wide env vars, so tests that mutate
    // them must not run concurrently with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn required_vars() -> [(&'static str, &'static str); 5] {
        [
            ("GRAPH_URL", "http://graph.local"),
            ("SEARCH_URL", "http://search.local"),
            ("MARKET_URL", "http://market.local"),
            ("LM_BASE_URL", "http://lm.local"),
            ("EMBEDDER_URL", "http://embedder.local"),
        ]
    }

    #[test]
    fn from_env_fails_without_required_backend_urls() {
        let _guard = ENV_LOCK.lock().unwrap();
        for (key, _) in required_vars() {
            env::remove_var(key);
        }
        env::remove_var("ROUTER_DEEP_THRESHOLD");

        assert!(Config::from_env().is_err());
    }

    #[test]
    fn from_env_applies_documented_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        for (key, value) in required_vars() {
            env::set_var(key, value);
        }
        env::remove_var("ROUTER_DEEP_THRESHOLD");
        env::remove_var("CACHE_L2_ENABLED");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.router.deep_threshold, 0.85);
        assert_eq!(config.router.depth_timeouts_s, [60, 90, 120, 180]);
        assert!(!config.cache.l2_enabled);

        for (key, _) in required_vars() {
            env::remove_var(key);
        }
    }

    #[test]
    fn from_env_rejects_unparseable_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        for (key, value) in required_vars() {
            env::set_var(key, value);
        }
        env::set_var("ROUTER_DEEP_THRESHOLD", "not-a-float");

        assert!(Config::from_env().is_err());

        for (key, _) in required_vars() {
            env::remove_var(key);
        }
        env::remove_var("ROUTER_DEEP_THRESHOLD");
    }
}
