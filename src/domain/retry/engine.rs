//! Bounded retry loop with classified, cancellable backoff.

use std::future::Future;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::classifier::{backoff_for, classify, RetryableError};

/// Attempts made before giving up.
pub const MAX_ATTEMPTS: u32 = 3;

/// Why a retried operation did not produce a value.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed; `last` is the final cause.
    #[error("all retry attempts failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },

    /// The operation failed in a way another attempt cannot fix.
    #[error("non-retryable failure: {0}")]
    NotRetryable(E),

    /// The cancellation token fired during an attempt or a backoff wait.
    #[error("operation cancelled")]
    Cancelled,
}

/// Runs a fallible async operation up to [`MAX_ATTEMPTS`] times.
///
/// Between attempts it sleeps for [`backoff_for`] the failure's class.
/// Failures that report themselves as not retryable end the loop at once.
/// Both the attempt and the sleep race the cancellation token, so a
/// cancelled caller never waits out a backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryEngine {
    max_attempts: u32,
    backoff_scale: f64,
}

impl Default for RetryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryEngine {
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff_scale: 1.0,
        }
    }

    /// Multiplies every backoff delay by `scale`; `0.0` retries immediately.
    pub fn with_backoff_scale(mut self, scale: f64) -> Self {
        self.backoff_scale = scale.max(0.0);
        self
    }

    /// Executes `operation`, passing it the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: RetryableError,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                result = operation(attempt) => result,
            };

            let err = match result {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                tracing::debug!(attempt, error = %err, "failure is not retryable");
                return Err(RetryError::NotRetryable(err));
            }

            if attempt >= self.max_attempts {
                tracing::error!(attempts = attempt, error = %err, "all retry attempts failed");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let class = classify(&err);
            let delay = backoff_for(class, attempt).mul_f64(self.backoff_scale);
            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                error_class = %class,
                delay_secs = delay.as_secs_f64(),
                error = %err,
                "attempt failed, backing off"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct FakeError(&'static str);

    impl RetryableError for FakeError {}

    /// Operation that fails `failures` times with `message`, then succeeds.
    fn flaky(
        calls: Arc<AtomicU32>,
        failures: u32,
        message: &'static str,
    ) -> impl FnMut(u32) -> std::pin::Pin<Box<dyn Future<Output = Result<u32, FakeError>> + Send>>
    {
        move |attempt| {
            let calls = calls.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= failures {
                    Err(FakeError(message))
                } else {
                    Ok(attempt)
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_returns_without_sleeping() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = RetryEngine::new()
            .run(&CancellationToken::new(), flaky(calls.clone(), 0, "boom"))
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn generic_failures_back_off_exponentially() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = RetryEngine::new()
            .run(&CancellationToken::new(), flaky(calls.clone(), 2, "connection reset"))
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2 + 4));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limits_back_off_by_the_minute() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = RetryEngine::new()
            .run(&CancellationToken::new(), flaky(calls.clone(), 2, "429 Too Many Requests"))
            .await;

        assert!(result.is_ok());
        assert_eq!(start.elapsed(), Duration::from_secs(60 + 120));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_wraps_the_last_error() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = RetryEngine::new()
            .run(&CancellationToken::new(), flaky(calls.clone(), u32::MAX, "still down"))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("all retry attempts failed"));
        match err {
            RetryError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.0, "still down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });
        let start = Instant::now();

        let result = RetryEngine::new()
            .run(&cancel, flaky(calls.clone(), u32::MAX, "rate limit"))
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("malformed payload")]
    struct PermanentError;

    impl RetryableError for PermanentError {
        fn is_retryable(&self) -> bool {
            false
        }
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_failure_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let start = Instant::now();

        let result: Result<(), _> = RetryEngine::new()
            .run(&CancellationToken::new(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(PermanentError) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::NotRetryable(PermanentError))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_scale_shortens_delays() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = RetryEngine::new()
            .with_backoff_scale(0.5)
            .run(&CancellationToken::new(), flaky(calls.clone(), 2, "connection reset"))
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(1 + 2));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_backoff_scale_retries_without_waiting() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = RetryEngine::new()
            .with_backoff_scale(0.0)
            .run(&CancellationToken::new(), flaky(calls.clone(), u32::MAX, "429"))
            .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_operation() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = RetryEngine::new()
            .run(&cancel, flaky(calls.clone(), 0, "unused"))
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
