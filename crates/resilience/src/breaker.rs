use core_types::{BreakerPhase, BreakerState, CoreError, CoreResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Configuration for one named backend's breaker (spec §4.2, §4.14).
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_success_threshold: u32,
    pub call_timeout: Duration,
    /// Bound on concurrent probes admitted while HALF_OPEN.
    pub half_open_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_success_threshold: 2,
            call_timeout: Duration::from_secs(2),
            half_open_probes: 1,
        }
    }
}

struct Inner {
    phase: BreakerPhase,
    consecutive_failures: u32,
    half_open_successes: u32,
    half_open_inflight: u32,
    next_probe_at: Option<Instant>,
    last_failure_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per-backend circuit breaker (spec §4.2).
///
/// `CLOSED` → `OPEN` after `failure_threshold` consecutive failures.
/// `OPEN` fails fast with `CircuitOpen` until `recovery_timeout` elapses, then
/// admits a bounded number of `HALF_OPEN` probes. `half_open_success_threshold`
/// consecutive probe successes closes the breaker again; any probe failure
/// reopens it and resets `next_probe_at`.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Arc<Mutex<Inner>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Arc::new(Mutex::new(Inner {
                phase: BreakerPhase::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                half_open_inflight: 0,
                next_probe_at: None,
                last_failure_at: None,
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current observable state, for `/health/ready` and metrics.
    pub async fn state(&self) -> BreakerState {
        let inner = self.inner.lock().await;
        BreakerState {
            name: self.name.clone(),
            phase: inner.phase,
            consecutive_failures: inner.consecutive_failures,
            last_failure_at: inner.last_failure_at,
            next_probe_at: None,
        }
    }

    pub async fn is_open(&self) -> bool {
        let mut inner = self.inner.lock().await;
        self.transition_if_due(&mut inner);
        inner.phase == BreakerPhase::Open
    }

    /// Move OPEN → HALF_OPEN once the probe window has elapsed. Call sites
    /// hold the lock already, this never contends externally.
    fn transition_if_due(&self, inner: &mut Inner) {
        if inner.phase == BreakerPhase::Open {
            if let Some(next) = inner.next_probe_at {
                if Instant::now() >= next {
                    inner.phase = BreakerPhase::HalfOpen;
                    inner.half_open_successes = 0;
                    inner.half_open_inflight = 0;
                    tracing::info!(backend = %self.name, "breaker transitioning OPEN -> HALF_OPEN");
                }
            }
        }
    }

    /// Admission check: acquires a probe slot if HALF_OPEN, or fails fast if OPEN.
    /// Returns `Ok(())` when the caller may proceed.
    async fn admit(&self) -> CoreResult<()> {
        let mut inner = self.inner.lock().await;
        self.transition_if_due(&mut inner);

        match inner.phase {
            BreakerPhase::Closed => Ok(()),
            BreakerPhase::Open => Err(CoreError::CircuitOpen(self.name.clone())),
            BreakerPhase::HalfOpen => {
                if inner.half_open_inflight >= self.config.half_open_probes {
                    return Err(CoreError::CircuitOpen(self.name.clone()));
                }
                inner.half_open_inflight += 1;
                Ok(())
            }
        }
    }

    async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        match inner.phase {
            BreakerPhase::Closed => {
                inner.consecutive_failures = 0;
            }
            BreakerPhase::HalfOpen => {
                inner.half_open_inflight = inner.half_open_inflight.saturating_sub(1);
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.half_open_success_threshold {
                    inner.phase = BreakerPhase::Closed;
                    inner.consecutive_failures = 0;
                    tracing::info!(backend = %self.name, "breaker transitioning HALF_OPEN -> CLOSED");
                }
            }
            BreakerPhase::Open => {}
        }
    }

    async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.last_failure_at = Some(chrono::Utc::now());
        match inner.phase {
            BreakerPhase::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.phase = BreakerPhase::Open;
                    inner.next_probe_at = Some(Instant::now() + self.config.recovery_timeout);
                    tracing::warn!(backend = %self.name, failures = inner.consecutive_failures, "breaker transitioning CLOSED -> OPEN");
                }
            }
            BreakerPhase::HalfOpen => {
                inner.half_open_inflight = inner.half_open_inflight.saturating_sub(1);
                inner.phase = BreakerPhase::Open;
                inner.half_open_successes = 0;
                inner.next_probe_at = Some(Instant::now() + self.config.recovery_timeout);
                tracing::warn!(backend = %self.name, "breaker transitioning HALF_OPEN -> OPEN (probe failed)");
            }
            BreakerPhase::Open => {}
        }
    }

    /// Execute `fut` under this breaker's admission control and the
    /// configured `call_timeout`. A single timed-out call increments the
    /// failure counter by exactly one, matching the boundary behavior in
    /// spec §8 ("a backend timing out at 200ms ... MUST NOT open the breaker
    /// on a single call").
    pub async fn call<F, T>(&self, fut: F) -> CoreResult<T>
    where
        F: Future<Output = CoreResult<T>>,
    {
        self.admit().await?;

        let result = tokio::time::timeout(self.config.call_timeout, fut).await;

        match result {
            Ok(Ok(value)) => {
                self.record_success().await;
                Ok(value)
            }
            Ok(Err(err)) => {
                self.record_failure().await;
                Err(err)
            }
            Err(_elapsed) => {
                self.record_failure().await;
                Err(CoreError::Timeout(self.config.call_timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(50),
            half_open_success_threshold: 2,
            call_timeout: Duration::from_millis(100),
            half_open_probes: 1,
        }
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new("graph", fast_config());
        for _ in 0..3 {
            let res: CoreResult<()> = breaker
                .call(async { Err(CoreError::BackendUnavailable("down".into())) })
                .await;
            assert!(res.is_err());
        }
        assert!(breaker.is_open().await);

        let res: CoreResult<()> = breaker.call(async { Ok(()) }).await;
        assert!(matches!(res, Err(CoreError::CircuitOpen(_))));
    }

    #[tokio::test]
    async fn single_timeout_increments_by_one_not_opens() {
        let breaker = CircuitBreaker::new("search", fast_config());
        let res: CoreResult<()> = breaker
            .call(async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(CoreError::Timeout(_))));
        assert_eq!(breaker.state().await.consecutive_failures, 1);
        assert!(!breaker.is_open().await);
    }

    #[tokio::test]
    async fn half_open_requires_exact_success_threshold() {
        let breaker = CircuitBreaker::new("market", fast_config());
        for _ in 0..3 {
            let _: CoreResult<()> = breaker
                .call(async { Err(CoreError::BackendUnavailable("down".into())) })
                .await;
        }
        assert!(breaker.is_open().await);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!breaker.is_open().await); // transitions to HALF_OPEN

        let counter = AtomicU32::new(0);
        let res: CoreResult<()> = breaker
            .call(async {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(res.is_ok());
        // Still half-open: one success short of threshold (2).
        assert_eq!(breaker.state().await.phase, BreakerPhase::HalfOpen);

        let res: CoreResult<()> = breaker.call(async { Ok(()) }).await;
        assert!(res.is_ok());
        assert_eq!(breaker.state().await.phase, BreakerPhase::Closed);
    }
}
