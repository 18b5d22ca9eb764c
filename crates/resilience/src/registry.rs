use crate::breaker::{BreakerConfig, CircuitBreaker};
use core_types::{BreakerState, DegradationLevel};
use dashmap::DashMap;
use std::sync::Arc;

/// Process-wide collection of named circuit breakers (spec §4.2, §5).
///
/// One instance lives for the process lifetime; adapters look up their
/// breaker by name rather than owning one directly, so the degradation level
/// (spec §5) can be computed centrally from the full set.
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_config: BreakerConfig,
}

impl BreakerRegistry {
    pub fn new(default_config: BreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            default_config,
        }
    }

    /// Fetch or lazily create the named breaker with the registry's default config.
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        self.get_with(name, self.default_config)
    }

    pub fn get_with(&self, name: &str, config: BreakerConfig) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, config)))
            .clone()
    }

    pub async fn all_states(&self) -> Vec<BreakerState> {
        let mut states = Vec::with_capacity(self.breakers.len());
        for entry in self.breakers.iter() {
            states.push(entry.value().state().await);
        }
        states
    }

    /// Degradation level derived from how many of `names` currently have an
    /// open breaker (spec §5). Backends never registered are treated as healthy.
    pub async fn degradation_level(&self, names: &[&str]) -> DegradationLevel {
        let mut open = 0usize;
        for name in names {
            if let Some(entry) = self.breakers.get(*name) {
                if entry.value().is_open().await {
                    open += 1;
                }
            }
        }
        DegradationLevel::from_open_count(open, names.len())
    }
}
