use core_types::{CoreError, CoreResult};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Backoff strategies between retry attempts (spec §4.2).
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    Fixed,
    Linear,
    Exponential,
    ExponentialJitter,
}

/// Retry policy applied around a circuit breaker (spec §4.2).
///
/// Retries never extend the caller's deadline: callers are expected to race
/// the retried future against their own timeout/deadline, as the Parallel
/// Fetcher (C9) and backend adapters do.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            strategy: BackoffStrategy::ExponentialJitter,
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = match self.strategy {
            BackoffStrategy::Fixed => self.initial_delay,
            BackoffStrategy::Linear => self.initial_delay * attempt.max(1),
            BackoffStrategy::Exponential | BackoffStrategy::ExponentialJitter => {
                self.initial_delay.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            }
        };
        let base = base.min(self.max_delay);
        if matches!(self.strategy, BackoffStrategy::ExponentialJitter) {
            let jitter_ms = rand::thread_rng().gen_range(0..=base.as_millis().max(1) as u64 / 2);
            base + Duration::from_millis(jitter_ms)
        } else {
            base
        }
    }

    /// Run `make_attempt` up to `max_attempts` times, retrying only errors
    /// classified as retryable (`Timeout`, transient `BackendUnavailable`).
    /// `QueryError`, `CircuitOpen`, and `ValidationError` are never retried.
    pub async fn run<F, Fut, T>(&self, mut make_attempt: F) -> CoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let mut last_err = CoreError::Cancelled;
        for attempt in 1..=self.max_attempts {
            match make_attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    tracing::debug!(attempt, error = %err, "retrying after retryable error");
                    tokio::time::sleep(self.delay_for(attempt)).await;
                    last_err = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_timeout_up_to_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            strategy: BackoffStrategy::Fixed,
        };
        let calls = AtomicU32::new(0);
        let result: CoreResult<()> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::Timeout(Duration::from_millis(1)))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let result: CoreResult<()> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::ValidationError("bad".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
