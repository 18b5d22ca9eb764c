use std::time::Duration;

/// Thin wrappers around the `metrics` crate macros for the gauges/counters/
/// histograms spec §4.13 names explicitly (`queries_total{intent,status}`,
/// `response_seconds`, `stage_seconds`, `active_requests`,
/// `breaker_state{name}`, `cache_hit_rate`). `stage_seconds` is emitted by
/// `TimingTree` directly; the rest live here.
pub fn record_query(intent: &str, status: &str) {
    metrics::counter!("queries_total", "intent" => intent.to_string(), "status" => status.to_string())
        .increment(1);
}

pub fn observe_response_seconds(elapsed: Duration) {
    metrics::histogram!("response_seconds").record(elapsed.as_secs_f64());
}

pub fn set_active_requests(n: i64) {
    metrics::gauge!("active_requests").set(n as f64);
}

pub fn inc_active_requests() {
    metrics::gauge!("active_requests").increment(1.0);
}

pub fn dec_active_requests() {
    metrics::gauge!("active_requests").decrement(1.0);
}

/// Breaker phase encoded as 0=closed, 1=half_open, 2=open, matching the
/// `BreakerPhase` ordering (spec §4.2, §4.13).
pub fn set_breaker_state(name: &str, phase: core_types::BreakerPhase) {
    let value = match phase {
        core_types::BreakerPhase::Closed => 0.0,
        core_types::BreakerPhase::HalfOpen => 1.0,
        core_types::BreakerPhase::Open => 2.0,
    };
    metrics::gauge!("breaker_state", "name" => name.to_string()).set(value);
}

pub fn set_cache_hit_rate(rate: f64) {
    metrics::gauge!("cache_hit_rate").set(rate.clamp(0.0, 1.0));
}

/// Guard returned by [`request_guard`] — decrements `active_requests` on drop
/// so a panicking or early-returning handler never leaves the gauge stuck.
pub struct RequestGuard;

impl Drop for RequestGuard {
    fn drop(&mut self) {
        dec_active_requests();
    }
}

pub fn request_guard() -> RequestGuard {
    inc_active_requests();
    RequestGuard
}

/// Push every breaker's current phase into the `breaker_state` gauge (spec
/// §4.13). Intended to run on a short interval from the server's lifecycle.
pub async fn publish_breaker_states(registry: &resilience::BreakerRegistry) {
    for state in registry.all_states().await {
        set_breaker_state(&state.name, state.phase);
    }
}
