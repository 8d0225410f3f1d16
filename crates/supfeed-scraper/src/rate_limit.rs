//! Retry utilities for supplier catalog downloads.
//!
//! Transient failures (429, network errors, 5xx) are retried with exponential
//! backoff. Everything else is propagated on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`ScraperError::RateLimited`]: HTTP 429.
/// - [`ScraperError::Http`]: connection reset, timeout, TLS hiccup.
/// - [`ScraperError::UnexpectedStatus`] with a 5xx status.
///
/// A 404, a 4xx, a missing credential or unparsable XML will not change on
/// the next attempt and are returned immediately.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// On a retriable error the function sleeps for `backoff_base_secs * 2^attempt`
/// seconds and tries again, up to `max_retries` additional attempts after the
/// first try. If all retries are exhausted the last error is returned.
///
/// # Backoff schedule (example with `backoff_base_secs = 5`)
///
/// | Attempt | Sleep before next attempt |
/// |---------|--------------------------|
/// | 0 (initial) | none |
/// | 1 (first retry) | 5 × 2^0 = 5 s |
/// | 2 (second retry) | 5 × 2^1 = 10 s |
/// | 3 (third retry) | 5 × 2^2 = 20 s |
///
/// With `max_retries = 3` the operation is attempted at most 4 times total.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut last_err;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                last_err = err;
            }
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %last_err,
            "transient fetch error; retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn rate_limited(retry_after_secs: u64) -> ScraperError {
        ScraperError::RateLimited {
            domain: "supplier.example.kz".to_owned(),
            retry_after_secs,
        }
    }

    /// Runs the retry loop with an operation failing with `make_err(call)`
    /// until it returns `None`.
    async fn count_calls(
        max_retries: u32,
        make_err: fn(u32) -> Option<ScraperError>,
    ) -> (Result<u32, ScraperError>, u32) {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(max_retries, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                match make_err(n) {
                    Some(err) => Err(err),
                    None => Ok(n),
                }
            }
        })
        .await;
        (result, call_count.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let (result, calls) = count_calls(3, |_| None).await;
        assert_eq!(result.unwrap(), 0);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retries_on_rate_limited_then_succeeds() {
        let (result, calls) = count_calls(3, |n| (n < 2).then(|| rate_limited(0))).await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let (result, calls) = count_calls(3, |n| {
            (n == 0).then(|| ScraperError::UnexpectedStatus {
                status: 503,
                url: "https://supplier.example.kz/catalog.xml".to_owned(),
            })
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn propagates_last_error_after_exhausting_retries() {
        let (result, calls) = count_calls(2, |_| Some(rate_limited(0))).await;
        // max_retries=2 → 3 total attempts
        assert_eq!(calls, 3);
        assert!(matches!(result, Err(ScraperError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let (result, calls) = count_calls(3, |_| {
            Some(ScraperError::NotFound {
                url: "https://supplier.example.kz/catalog.xml".to_owned(),
            })
        })
        .await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(ScraperError::NotFound { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let (result, calls) = count_calls(3, |_| {
            Some(ScraperError::UnexpectedStatus {
                status: 401,
                url: "https://supplier.example.kz/catalog.xml".to_owned(),
            })
        })
        .await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(ScraperError::UnexpectedStatus { status: 401, .. })));
    }
}
