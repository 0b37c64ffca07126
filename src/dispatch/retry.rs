use crate::config::RetryConfig;
use crate::error::PlatformError;
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff for one platform request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier.max(1),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// No retries and no waiting.
    pub fn immediate() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based). A `Retry-After` hint
    /// replaces the computed backoff; both are capped at `max_delay`.
    pub fn delay_for(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let backoff = self
            .base_delay
            .saturating_mul(self.multiplier.saturating_pow(retry.saturating_sub(1)));
        hint.unwrap_or(backoff).min(self.max_delay)
    }
}

/// Run `call` until it succeeds, fails permanently, or the policy's attempts
/// are used up. `on_retry` sees the retry number, the delay about to be slept
/// and the error that caused it.
pub async fn execute_with_retry<T, F, Fut, R>(
    policy: &RetryPolicy,
    mut call: F,
    mut on_retry: R,
) -> Result<T, PlatformError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlatformError>>,
    R: FnMut(u32, Duration, &PlatformError),
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Platform request recovered after retries");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt, err.retry_after);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    class = %err.class,
                    "Platform request failed, retrying"
                );
                on_retry(attempt, delay, &err);
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
    use crate::error::PlatformErrorClass;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2,
            max_delay: Duration::from_secs(10),
        }
    }

    #[test]
    fn delays_grow_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            ..policy()
        };
        assert_eq!(policy.delay_for(1, None), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2, None), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3, None), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(8, None), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40, None), Duration::from_secs(10));
    }

    #[test]
    fn retry_after_hint_is_capped() {
        let policy = policy();
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(120))),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn config_zero_attempts_still_tries_once() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        });
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let mut retries = Vec::new();
        let result = execute_with_retry(
            &policy(),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(PlatformError::from_status(502, "bad gateway", false, None))
                    } else {
                        Ok(n)
                    }
                }
            },
            |retry, delay, _| retries.push((retry, delay)),
        )
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            retries,
            vec![
                (1, Duration::from_millis(500)),
                (2, Duration::from_millis(1000))
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = execute_with_retry(
            &policy(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PlatformError::from_status(429, "slow down", false, None)) }
            },
            |_, _, _| {},
        )
        .await;
        assert_eq!(result.unwrap_err().class, PlatformErrorClass::RateLimited);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = execute_with_retry(
            &policy(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PlatformError::from_status(422, "invalid", false, None)) }
            },
            |_, _, _| panic!("no retry expected"),
        )
        .await;
        assert_eq!(
            result.unwrap_err().class,
            PlatformErrorClass::ValidationRejected
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
