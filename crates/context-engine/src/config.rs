/// Tunable weights and thresholds for the six-phase pipeline (spec §4.10,
/// §9: "tunable configuration — tests should assert invariants ... rather
/// than absolute outputs").
#[derive(Debug, Clone, Copy)]
pub struct ContextEngineConfig {
    pub confidence_floor: f64,
    pub recency_half_life_days: f64,
    pub diversity_tau: f64,
    pub semantic_top_m: usize,
    pub dedup_window: usize,
    pub dedup_threshold: f64,
    pub final_prune_top_n: usize,
}

impl Default for ContextEngineConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.3,
            recency_half_life_days: 60.0,
            diversity_tau: 0.15,
            semantic_top_m: 50,
            dedup_window: 5,
            dedup_threshold: 0.85,
            final_prune_top_n: 30,
        }
    }
}
