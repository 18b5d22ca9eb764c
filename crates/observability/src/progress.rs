/// Fixed node → cumulative-fraction mapping for the streaming response
/// variant (spec §6: "total progress is derived from a fixed mapping of node
/// name → cumulative fraction"). Deep Workflow nodes dominate the table since
/// that is the only path long enough to warrant incremental progress; the
/// Fast Path reports `0.0 -> 1.0` directly around its single `fast_handler`
/// step.
const NODE_PROGRESS: &[(&str, f64)] = &[
    ("analyze_query", 0.10),
    ("plan_analysis", 0.20),
    ("collect_parallel_data", 0.35),
    ("apply_context_engineering", 0.45),
    ("cross_validate_contexts", 0.50),
    ("generate_insights", 0.65),
    ("analyze_relationships", 0.75),
    ("deep_reasoning", 0.85),
    ("synthesize_report", 0.95),
    ("quality_check", 0.98),
    ("enhance_report", 0.99),
    ("fast_handler", 1.0),
];

/// Cumulative progress fraction for `node`, or `None` if it is not part of
/// the fixed table (callers should simply not emit a `progress` event for an
/// unrecognized node rather than guess a fraction).
pub fn cumulative_fraction(node: &str) -> Option<f64> {
    NODE_PROGRESS.iter().find(|(n, _)| *n == node).map(|(_, f)| *f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_are_monotonically_increasing_in_workflow_order() {
        let fractions: Vec<f64> = NODE_PROGRESS.iter().map(|(_, f)| *f).collect();
        for pair in fractions.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn unknown_node_returns_none() {
        assert_eq!(cumulative_fraction("not_a_real_node"), None);
    }
}
