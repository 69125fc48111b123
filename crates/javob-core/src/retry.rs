//! Bounded retry with exponential backoff.
//!
//! Wraps every outbound HTTP call in the system. The policy mirrors the
//! classification in [`BotError::is_retryable`]: transport failures,
//! 5xx, and 429 are retried; other 4xx fail on the first attempt.

use crate::error::BotError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry budget for one logical call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt.
    pub retries: u32,
    /// Backoff before retry k is `base_delay * 2^(k-1)`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(retries: u32, base_delay_ms: u64) -> Self {
        Self {
            retries,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, 700)
    }
}

/// Run `op`, retrying per `policy`. Returns the first success, or the
/// last error once the budget is exhausted or the error is not
/// retryable.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, BotError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BotError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt > policy.retries || !err.is_retryable() {
                    return Err(err);
                }
                let wait = policy.base_delay * 2u32.pow(attempt - 1);
                warn!("retry #{attempt} after error: {err}; waiting {wait:?}");
                tokio::time::sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(retries: u32) -> RetryPolicy {
        RetryPolicy::new(retries, 1)
    }

    #[tokio::test]
    async fn succeeds_within_budget() {
        let calls = AtomicU32::new(0);
        let result = retry(quick(2), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(BotError::http_status(500, "flaky"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_error_fails_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(quick(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BotError::http_status(404, "missing")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rate_limit_is_retried() {
        let calls = AtomicU32::new(0);
        let result = retry(quick(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(BotError::http_status(429, "slow down"))
                } else {
                    Ok(())
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_between_attempts() {
        let start = tokio::time::Instant::now();
        let offsets = std::sync::Mutex::new(Vec::new());
        let result: Result<(), _> = retry(RetryPolicy::new(3, 100), || {
            offsets.lock().unwrap().push(start.elapsed());
            async { Err(BotError::http_transport("refused")) }
        })
        .await;
        assert!(result.is_err());
        // Attempts at 0ms, then after 100ms, 200ms, 400ms waits.
        assert_eq!(
            *offsets.lock().unwrap(),
            vec![
                Duration::from_millis(0),
                Duration::from_millis(100),
                Duration::from_millis(300),
                Duration::from_millis(700),
            ]
        );
    }

    #[tokio::test]
    async fn exhausted_budget_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(quick(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BotError::http_transport("refused")) }
        })
        .await;
        match result {
            Err(BotError::Http { status: None, .. }) => {}
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
