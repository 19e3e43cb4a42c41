//! Bounded retry with linear backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;

// == Retry Policy ==
/// How many times a data operation is attempted and how long to wait
/// between attempts.
///
/// After failed attempt `n` (1-based) the wait is `base_delay * n`, so the
/// default policy waits 1s, then 2s. There is no wait after the last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts; 0 behaves like 1
    pub attempts: u32,
    /// Backoff unit
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry_count, config.retry_delay())
    }

    /// Attempts actually made; an operation always runs at least once.
    pub fn effective_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

// == Retry ==
/// Runs `op` until it succeeds or the policy's attempts are used up.
///
/// Returns the first success or the last error. Not cancellable once started.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.effective_attempts();
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("Operation succeeded on attempt {}/{}", attempt, attempts);
                }
                return Ok(value);
            }
            Err(e) if attempt < attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "Attempt {}/{} failed: {}, retrying in {}ms",
                    attempt,
                    attempts,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("Attempt {}/{} failed: {}, giving up", attempt, attempts, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn failing_then_ok(
        failures: u32,
        calls: Arc<AtomicU32>,
    ) -> impl FnMut() -> std::future::Ready<Result<&'static str, String>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= failures {
                std::future::ready(Err(format!("attempt {} failed", n)))
            } else {
                std::future::ready(Ok("ok"))
            }
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_attempts_runs_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).effective_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_linear_backoff_timing() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result = retry_with_backoff(&RetryPolicy::default(), failing_then_ok(2, calls.clone())).await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_last_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result = retry_with_backoff(&RetryPolicy::default(), failing_then_ok(10, calls.clone())).await;

        assert_eq!(result, Err("attempt 3 failed".to_string()));
        // 1s + 2s, nothing after the third failure
        assert_eq!(started.elapsed().as_millis() / 100, 30);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        // An operation failing N times then succeeding is called N+1 times
        // whenever the policy allows at least N+1 attempts.
        #[test]
        fn prop_retry_invocation_count(failures in 0u32..6, extra in 1u32..4) {
            let calls = Arc::new(AtomicU32::new(0));
            let policy = RetryPolicy::new(failures + extra, Duration::ZERO);

            let result = tokio_test::block_on(retry_with_backoff(&policy, failing_then_ok(failures, calls.clone())));

            prop_assert_eq!(result, Ok("ok"));
            prop_assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
        }

        // An operation that always fails is called exactly K times.
        #[test]
        fn prop_retry_exhaustion(attempts in 1u32..8) {
            let calls = Arc::new(AtomicU32::new(0));
            let policy = RetryPolicy::new(attempts, Duration::ZERO);

            let result = tokio_test::block_on(retry_with_backoff(&policy, failing_then_ok(u32::MAX, calls.clone())));

            prop_assert!(result.is_err());
            prop_assert_eq!(calls.load(Ordering::SeqCst), attempts);
        }
    }
}
