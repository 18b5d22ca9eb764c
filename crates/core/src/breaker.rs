use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The observable state of a per-backend circuit breaker (spec §3, §4.2).
///
/// This is the data shape only; the state machine transitions live in
/// `crates/resilience` since they require synchronization primitives this
/// crate intentionally stays free of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerPhase {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerState {
    pub name: String,
    pub phase: BreakerPhase,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub next_probe_at: Option<DateTime<Utc>>,
}

impl BreakerState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: BreakerPhase::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            next_probe_at: None,
        }
    }
}
