//! Timeout and bounded retry with exponential backoff for external calls.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Errors that can tell whether a retry has a chance of succeeding.
pub trait Transient: Sized {
    /// Network failures, rate limits and server errors are transient.
    /// Authentication failures and malformed input never are.
    fn is_transient(&self) -> bool;

    /// Build the error reported when an attempt exceeds its timeout.
    fn timed_out(after: Duration) -> Self;
}

/// Retry configuration shared by the synthesis and upload steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (>= 1)
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled for each further attempt
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Per-attempt timeout
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(2u32.pow(exponent))
            .min(self.max_delay)
    }
}

/// Run `call` under `policy`.
///
/// Each attempt is bounded by `policy.timeout`. Transient failures are retried
/// after an exponentially growing delay until `policy.max_attempts` is reached;
/// anything else is returned immediately.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, call: F) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_if(policy, operation, E::is_transient, call).await
}

/// Like [`with_retry`], but only failures accepted by `retryable` are retried.
///
/// For calls that are not idempotent, where a timeout or a dropped
/// connection leaves it unknown whether the remote side applied the call.
pub async fn with_retry_if<T, E, P, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    retryable: P,
    mut call: F,
) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    P: Fn(&E) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(E::timed_out(policy.timeout)),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) if retryable(&err) && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Flaky,
        Fatal,
        TimedOut,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Flaky | TestError::TimedOut)
        }

        fn timed_out(_after: Duration) -> Self {
            TestError::TimedOut
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            ..Default::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(350));
        assert_eq!(policy.delay_after(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_transient_failures_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, TestError> = with_retry(&fast_policy(3), "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TestError::Flaky)
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = with_retry(&fast_policy(2), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Flaky)
        })
        .await;

        assert!(matches!(result, Err(TestError::Flaky)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = with_retry(&fast_policy(5), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Fatal)
        })
        .await;

        assert!(matches!(result, Err(TestError::Fatal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_becomes_error() {
        let policy = RetryPolicy {
            timeout: Duration::from_millis(10),
            ..fast_policy(1)
        };
        let result: Result<(), TestError> = with_retry(&policy, "test", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(TestError::TimedOut)));
    }

    #[tokio::test]
    async fn test_predicate_limits_what_is_retried() {
        let policy = RetryPolicy {
            timeout: Duration::from_millis(10),
            ..fast_policy(3)
        };
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = with_retry_if(
            &policy,
            "test",
            |err| matches!(err, TestError::Flaky),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;

        assert!(matches!(result, Err(TestError::TimedOut)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
