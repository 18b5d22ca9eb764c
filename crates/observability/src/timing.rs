use std::time::{Duration, Instant};

/// Per-request timing tree keyed by component/node name (spec §4.13). Each
/// entry also emits a `stage_seconds` histogram sample so per-node latency is
/// visible in aggregate across requests, not just in the single response.
#[derive(Debug, Default)]
pub struct TimingTree {
    entries: Vec<(String, Duration)>,
}

impl TimingTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `node` took `elapsed`, emitting the matching histogram sample.
    pub fn record(&mut self, node: &str, elapsed: Duration) {
        metrics::histogram!("stage_seconds", "stage" => node.to_string()).record(elapsed.as_secs_f64());
        self.entries.push((node.to_string(), elapsed));
    }

    /// Time `f` and record it under `node` in one call.
    pub fn time<T>(&mut self, node: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(node, start.elapsed());
        out
    }

    pub fn total(&self) -> Duration {
        self.entries.iter().map(|(_, d)| *d).sum()
    }

    pub fn entries(&self) -> &[(String, Duration)] {
        &self.entries
    }

    /// Fold `core_types::NodeTiming`s (already recorded inside a `WorkflowState`)
    /// into this tree, emitting the same `stage_seconds` histogram sample
    /// `record` would for each one.
    pub fn extend_from_node_timings(&mut self, timings: &[core_types::NodeTiming]) {
        for t in timings {
            self.record(&t.node, Duration::from_millis(t.millis));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_all_recorded_entries() {
        let mut tree = TimingTree::new();
        tree.record("a", Duration::from_millis(10));
        tree.record("b", Duration::from_millis(20));
        assert_eq!(tree.total(), Duration::from_millis(30));
    }

    #[test]
    fn extend_from_node_timings_folds_entries_in_order() {
        let mut tree = TimingTree::new();
        let timings = vec![
            core_types::NodeTiming { node: "analyze_query".to_string(), millis: 5 },
            core_types::NodeTiming { node: "plan_analysis".to_string(), millis: 15 },
        ];
        tree.extend_from_node_timings(&timings);
        assert_eq!(tree.total(), Duration::from_millis(20));
        assert_eq!(tree.entries()[0].0, "analyze_query");
    }
}
