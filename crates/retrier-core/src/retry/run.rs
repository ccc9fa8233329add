//! Retry loop: run a closure until success, a non-retryable error, an empty
//! attempt budget or a cancel.

use super::error::RetryError;
use super::policy::{RetryDecision, RetryOptions};
use crate::cancel::CancelToken;

/// Runs `op` until it succeeds or the options say to stop.
///
/// On a retryable failure the observer is notified and the calling thread
/// sleeps for the backoff delay before the next attempt. No sleep follows
/// the last permitted attempt.
pub fn run_with_retry<T, E, F>(options: &RetryOptions<E>, mut op: F) -> Result<T, RetryError<E>>
where
    E: 'static,
    F: FnMut() -> Result<T, E>,
{
    let mut attempt = 0u32;
    loop {
        tracing::trace!(attempt, "invoking operation");
        let err = match op() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        match options.decide(attempt, &err) {
            RetryDecision::NoRetry => return Err(RetryError::NonRetryable(err)),
            RetryDecision::Exhausted => {
                tracing::debug!(attempts = attempt + 1, "retry attempts exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt + 1,
                    last: err,
                });
            }
            RetryDecision::RetryAfter(delay) => {
                options.notify_retry(attempt + 1, &err);
                tracing::debug!(retry = attempt + 1, ?delay, "operation failed, retrying");
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// Like [`run_with_retry`], but every attempt and every backoff wait races
/// against `token`.
///
/// The token is checked before each attempt, including the first, so an
/// already fired token means the operation is never invoked. A cancel during
/// the backoff wait ends the wait at once. An operation already running is
/// not interrupted; it receives the token so it can stop on its own.
pub fn run_with_retry_cancellable<T, E, F>(
    token: &CancelToken,
    options: &RetryOptions<E>,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: 'static,
    F: FnMut(&CancelToken) -> Result<T, E>,
{
    let mut last: Option<E> = None;
    let mut attempt = 0u32;
    loop {
        if let Some(reason) = token.reason() {
            tracing::debug!(attempt, %reason, "retry loop stopped before attempt");
            return Err(RetryError::from_cancel(reason, last));
        }

        tracing::trace!(attempt, "invoking operation");
        let err = match op(token) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        match options.decide(attempt, &err) {
            RetryDecision::NoRetry => return Err(RetryError::NonRetryable(err)),
            RetryDecision::Exhausted => {
                tracing::debug!(attempts = attempt + 1, "retry attempts exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt + 1,
                    last: err,
                });
            }
            RetryDecision::RetryAfter(delay) => {
                options.notify_retry(attempt + 1, &err);
                tracing::debug!(retry = attempt + 1, ?delay, "operation failed, retrying");
                if let Some(reason) = token.wait_timeout(delay) {
                    tracing::debug!(attempt, %reason, "backoff wait interrupted");
                    return Err(RetryError::from_cancel(reason, Some(err)));
                }
                last = Some(err);
                attempt += 1;
            }
        }
    }
}
