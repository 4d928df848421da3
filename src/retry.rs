//! Bounded retry with exponential backoff for forge requests.
//!
//! Every attempt runs under a timeout; a timeout counts as a transient
//! failure. Rate limits wait exactly as long as the forge asks, unless that
//! is longer than `max_rate_limit_wait`, in which case the error surfaces.

use std::future::Future;
use std::time::Duration;

use rand::thread_rng;
use rand::Rng;
use tracing::warn;

use crate::error::{Error, ForgeError};

/// Configuration for automatic retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Wait before the first retry
    pub initial_backoff: Duration,
    /// Multiplier applied per attempt
    pub backoff_factor: f64,
    /// Upper bound on a computed (non rate-limit) wait
    pub max_backoff: Duration,
    /// Jitter factor (0.1 = ±10%)
    pub jitter: f64,
    /// Whether to honor the wait signalled by a rate limit
    pub respect_retry_after: bool,
    /// Longest signalled rate-limit wait we are willing to sleep through
    pub max_rate_limit_wait: Duration,
    /// Timeout for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_backoff: Duration::from_secs(60),
            jitter: 0.1,
            respect_retry_after: true,
            max_rate_limit_wait: Duration::from_secs(15 * 60),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Calculate the wait before retry number `attempt + 1`.
    ///
    /// Uses exponential backoff with jitter, or the signalled rate-limit
    /// wait when there is one and `respect_retry_after` is set.
    #[must_use]
    pub fn backoff_time(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        if let Some(ra) = retry_after {
            if self.respect_retry_after {
                return Duration::from_secs(ra);
            }
        }

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_wait = self.initial_backoff.as_secs_f64() * self.backoff_factor.powi(exponent);

        let wait_time = if self.jitter > 0.0 && base_wait > 0.0 {
            let jitter_range = base_wait * self.jitter;
            let jitter = thread_rng().gen_range(-jitter_range..jitter_range);
            base_wait + jitter
        } else {
            base_wait
        };

        let capped = wait_time.clamp(0.0, self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Whether a failure on attempt `attempt` (0-based) may be retried.
    #[must_use]
    pub fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or runs out
/// of attempts.
///
/// `label` names the request in log lines.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// non-retryable error.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, label: &str, mut op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(config.attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Forge(ForgeError::Transient {
                message: format!(
                    "{label} timed out after {}ms",
                    config.attempt_timeout.as_millis()
                ),
            })),
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !config.should_retry(&error, attempt) {
            return Err(error);
        }

        let wait = config.backoff_time(attempt, error.retry_after());
        if error.retry_after().is_some() && wait > config.max_rate_limit_wait {
            warn!(
                request = label,
                wait_secs = wait.as_secs(),
                "rate limit reset is beyond the allowed wait, giving up"
            );
            return Err(error);
        }

        warn!(
            request = label,
            attempt = attempt + 1,
            max_retries = config.max_retries,
            wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "retrying after failure"
        );
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            jitter: 0.0,
            attempt_timeout: Duration::from_millis(200),
            ..Default::default()
        }
    }

    fn transient() -> Error {
        Error::Forge(ForgeError::Transient {
            message: "connection reset".to_string(),
        })
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.max_retries, 3);
        assert!((config.backoff_factor - 2.0).abs() < f64::EPSILON);
        assert!(config.respect_retry_after);
        assert_eq!(config.attempt_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_time_exponential() {
        let config = RetryConfig {
            jitter: 0.0,
            ..Default::default()
        };

        assert_eq!(config.backoff_time(0, None), Duration::from_secs(1));
        assert_eq!(config.backoff_time(1, None), Duration::from_secs(2));
        assert_eq!(config.backoff_time(2, None), Duration::from_secs(4));
        assert_eq!(config.backoff_time(3, None), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_time_respects_retry_after() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_time(0, Some(30)), Duration::from_secs(30));

        let ignoring = RetryConfig {
            respect_retry_after: false,
            jitter: 0.0,
            ..Default::default()
        };
        assert_eq!(ignoring.backoff_time(0, Some(30)), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_time_capped_at_max() {
        let config = RetryConfig {
            backoff_factor: 10.0,
            jitter: 0.0,
            max_backoff: Duration::from_secs(30),
            ..Default::default()
        };

        assert_eq!(config.backoff_time(3, None), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_time_with_jitter_stays_in_band() {
        let config = RetryConfig::default();
        for _ in 0..50 {
            let wait = config.backoff_time(2, None).as_secs_f64();
            assert!((3.6..=4.4).contains(&wait), "wait {wait} outside ±10% of 4s");
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_config(3), "page 1", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(transient())
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.expect("third attempt succeeds"), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Error> = with_retry(&fast_config(2), "page 1", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;

        assert!(matches!(result, Err(Error::Forge(ForgeError::Transient { .. }))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_authentication_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Error> = with_retry(&fast_config(3), "page 1", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Forge(ForgeError::Authentication {
                status: 401,
                message: "Bad credentials".to_string(),
            }))
        })
        .await;

        assert!(matches!(
            result,
            Err(Error::Forge(ForgeError::Authentication { .. }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transient() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            attempt_timeout: Duration::from_millis(10),
            ..fast_config(1)
        };
        let result: Result<(), Error> = with_retry(&config, "page 1", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(Error::Forge(ForgeError::Transient { .. }))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_beyond_allowed_wait_fails_fast() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_rate_limit_wait: Duration::from_secs(10),
            ..fast_config(3)
        };
        let result: Result<(), Error> = with_retry(&config, "page 1", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Forge(ForgeError::RateLimited {
                message: "API rate limit exceeded".to_string(),
                retry_after: 3600,
            }))
        })
        .await;

        assert!(matches!(result, Err(Error::Forge(ForgeError::RateLimited { .. }))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_with_zero_wait_is_retried() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_config(3), "page 1", || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::Forge(ForgeError::RateLimited {
                    message: "secondary rate limit".to_string(),
                    retry_after: 0,
                }))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.expect("retry succeeds"), 7);
    }
}
