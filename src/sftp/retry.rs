//! Retry logic for remote file operations
//!
//! Re-drives a whole connect-and-operate unit with a constant delay between
//! attempts. Errors that retrying cannot fix short-circuit the loop.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::RemoteFileError;

/// Retries used when the caller leaves them unset
pub const DEFAULT_RETRY_COUNT: u32 = 10;

/// Delay between attempts used when the caller leaves it unset
pub const DEFAULT_RETRY_INTERVAL: &str = "10s";

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Fixed delay between attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_RETRY_COUNT,
            interval: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    /// Upper bound on time spent sleeping between attempts
    pub fn total_delay(&self) -> Duration {
        self.interval.saturating_mul(self.max_retries)
    }
}

/// Check if an error is worth another attempt
///
/// Transport and I/O failures are retried. A missing file is retried too,
/// matching long-standing behavior even though it rarely reappears.
pub fn is_retryable_error(error: &RemoteFileError) -> bool {
    !error.is_permanent()
}

/// Execute `unit` until it succeeds, fails permanently, or runs out of attempts
///
/// # Arguments
/// * `policy` - Retry count and constant delay
/// * `cancel` - Optional token that aborts the wait between attempts
/// * `unit` - One full attempt; called again for every retry
///
/// # Returns
/// * The first successful result
/// * The error of the last attempt when retries are exhausted
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    cancel: Option<&CancellationToken>,
    mut unit: F,
) -> Result<T, RemoteFileError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteFileError>>,
{
    let mut attempt: u32 = 0;

    loop {
        let err = match unit().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !is_retryable_error(&err) {
            warn!("Attempt {} failed with non-retryable error: {}", attempt + 1, err);
            return Err(err);
        }

        if attempt >= policy.max_retries {
            warn!("Giving up after {} attempts: {}", attempt + 1, err);
            return Err(err);
        }

        if err.is_not_found() {
            info!("Remote file is absent; retrying anyway as configured");
        }

        info!(
            "Attempt {}/{} failed, retrying in {:?}: {}",
            attempt + 1,
            policy.max_retries + 1,
            policy.interval,
            err
        );

        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep(policy.interval) => {}
                    _ = token.cancelled() => {
                        info!("Cancelled during retry backoff");
                        return Err(RemoteFileError::Cancelled);
                    }
                }
            }
            None => tokio::time::sleep(policy.interval).await,
        }

        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn transient(n: usize) -> RemoteFileError {
        RemoteFileError::transport("dial failed", format!("connection refused #{}", n))
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 10);
        assert_eq!(policy.interval, Duration::from_secs(10));
        assert_eq!(policy.total_delay(), Duration::from_secs(100));
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error(&transient(0)));
        assert!(is_retryable_error(&RemoteFileError::io(
            "read failed",
            "/x",
            std::io::Error::other("reset")
        )));
        assert!(is_retryable_error(&RemoteFileError::NotFound {
            path: "/x".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        }));

        assert!(!is_retryable_error(&RemoteFileError::config(
            "invalid permissions",
            "abc"
        )));
        assert!(!is_retryable_error(&RemoteFileError::Cancelled));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let result = with_retry(RetryPolicy::new(3, Duration::from_secs(30)), None, || {
            let call_count = call_count.clone();
            async move {
                call_count.fetch_add(1, Ordering::SeqCst);
                Ok::<_, RemoteFileError>(1024)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1024);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once_without_sleeping() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let result: Result<(), _> =
            with_retry(RetryPolicy::new(0, Duration::from_secs(30)), None, || {
                let call_count = call_count.clone();
                async move {
                    let n = call_count.fetch_add(1, Ordering::SeqCst);
                    Err(transient(n))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_success_after_retries() {
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let interval = Duration::from_millis(20);
        let start = Instant::now();

        let result = with_retry(RetryPolicy::new(5, interval), None, || {
            let attempt_count = attempt_count.clone();
            async move {
                let count = attempt_count.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    // Fail first 2 attempts
                    Err(transient(count))
                } else {
                    Ok(2048)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2048);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3); // 2 failures + 1 success
        assert!(start.elapsed() >= interval * 2);
    }

    #[tokio::test]
    async fn test_exhausted_returns_last_error() {
        let attempt_count = Arc::new(AtomicUsize::new(0));

        let result: Result<(), _> =
            with_retry(RetryPolicy::new(3, Duration::from_millis(1)), None, || {
                let attempt_count = attempt_count.clone();
                async move {
                    let n = attempt_count.fetch_add(1, Ordering::SeqCst);
                    Err(transient(n))
                }
            })
            .await;

        assert_eq!(attempt_count.load(Ordering::SeqCst), 4);
        assert_eq!(
            result.unwrap_err().to_string(),
            "dial failed: connection refused #3"
        );
    }

    #[tokio::test]
    async fn test_config_error_short_circuits() {
        let attempt_count = Arc::new(AtomicUsize::new(0));

        let result: Result<(), _> =
            with_retry(RetryPolicy::new(5, Duration::from_secs(30)), None, || {
                let attempt_count = attempt_count.clone();
                async move {
                    attempt_count.fetch_add(1, Ordering::SeqCst);
                    Err(RemoteFileError::config("invalid permissions", "\"abc\""))
                }
            })
            .await;

        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), RemoteFileError::Config { .. }));
    }

    #[tokio::test]
    async fn test_cancel_during_backoff() {
        let token = CancellationToken::new();
        let attempt_count = Arc::new(AtomicUsize::new(0));

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                token.cancel();
            })
        };

        let start = Instant::now();
        let result: Result<(), _> = with_retry(
            RetryPolicy::new(5, Duration::from_secs(60)),
            Some(&token),
            || {
                let attempt_count = attempt_count.clone();
                async move {
                    let n = attempt_count.fetch_add(1, Ordering::SeqCst);
                    Err(transient(n))
                }
            },
        )
        .await;

        canceller.await.unwrap();
        assert!(matches!(result.unwrap_err(), RemoteFileError::Cancelled));
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(60));
    }
}
