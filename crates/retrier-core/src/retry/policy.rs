use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::{self, Backoff};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
type Observer<E> = Arc<dyn Fn(u32, &E) + Send + Sync>;

/// Decision taken after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The predicate rejected the error; return it as-is.
    NoRetry,
    /// The error is retryable but no attempts are left.
    Exhausted,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// How a retry loop behaves: attempt budget, backoff, retryability and an
/// observer notified before each retry.
///
/// Options are built before the loop starts and only borrowed by it. Clones
/// share the backoff, predicate and observer.
pub struct RetryOptions<E> {
    max_attempts: u32,
    backoff: Arc<dyn Backoff>,
    is_retryable: Predicate<E>,
    on_retry: Observer<E>,
}

impl<E> Clone for RetryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: Arc::clone(&self.backoff),
            is_retryable: Arc::clone(&self.is_retryable),
            on_retry: Arc::clone(&self.on_retry),
        }
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// 3 attempts, 1s constant backoff, every error retryable, silent observer.
impl<E: 'static> Default for RetryOptions<E> {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Arc::new(backoff::constant(DEFAULT_INTERVAL)),
            is_retryable: Arc::new(|_: &E| true),
            on_retry: Arc::new(|_: u32, _: &E| {}),
        }
    }
}

impl<E: 'static> RetryOptions<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of invocations, including the first. Zero is ignored.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        if attempts > 0 {
            self.max_attempts = attempts;
        }
        self
    }

    pub fn with_backoff<B>(mut self, backoff: B) -> Self
    where
        B: Backoff + 'static,
    {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Use an already shared backoff policy.
    pub fn with_shared_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Only errors for which `predicate` returns true are retried.
    pub fn with_retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.is_retryable = Arc::new(predicate);
        self
    }

    /// Called with the upcoming retry number (1-based) and the error that
    /// triggered it, before the backoff wait.
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &E) + Send + Sync + 'static,
    {
        self.on_retry = Arc::new(observer);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &dyn Backoff {
        self.backoff.as_ref()
    }

    pub fn is_retryable(&self, err: &E) -> bool {
        (self.is_retryable)(err)
    }

    pub(crate) fn notify_retry(&self, attempt: u32, err: &E) {
        (self.on_retry)(attempt, err)
    }

    /// Decide what to do after `attempt` (0-based) failed with `err`.
    ///
    /// The predicate is consulted first, so a non-retryable error is reported
    /// as such even on the last attempt.
    pub fn decide(&self, attempt: u32, err: &E) -> RetryDecision {
        if !self.is_retryable(err) {
            return RetryDecision::NoRetry;
        }
        if attempt.saturating_add(1) >= self.max_attempts {
            return RetryDecision::Exhausted;
        }
        RetryDecision::RetryAfter(self.backoff.delay(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn defaults() {
        let opts = RetryOptions::<String>::default();
        assert_eq!(opts.max_attempts(), 3);
        assert_eq!(opts.backoff().delay(0), Duration::from_secs(1));
        assert_eq!(opts.backoff().delay(5), Duration::from_secs(1));
        assert!(opts.is_retryable(&"anything".to_string()));
    }

    #[test]
    fn zero_max_attempts_is_ignored() {
        let opts = RetryOptions::<String>::new()
            .with_max_attempts(7)
            .with_max_attempts(0);
        assert_eq!(opts.max_attempts(), 7);
    }

    #[test]
    fn last_option_wins() {
        let opts = RetryOptions::<u8>::new()
            .with_backoff(backoff::constant(Duration::from_millis(5)))
            .with_backoff(backoff::linear(Duration::from_millis(10), Duration::from_secs(1)))
            .with_retry_if(|_| false)
            .with_retry_if(|code: &u8| *code > 1);
        assert_eq!(opts.backoff().delay(1), Duration::from_millis(20));
        assert!(opts.is_retryable(&2));
        assert!(!opts.is_retryable(&1));
    }

    #[test]
    fn decide_respects_predicate_then_budget() {
        let opts = RetryOptions::<u8>::new()
            .with_max_attempts(3)
            .with_backoff(backoff::exponential(Duration::from_millis(100), Duration::from_secs(1)))
            .with_retry_if(|code| *code != 0);

        assert_eq!(opts.decide(0, &0), RetryDecision::NoRetry);
        assert_eq!(opts.decide(2, &0), RetryDecision::NoRetry);
        assert_eq!(
            opts.decide(0, &1),
            RetryDecision::RetryAfter(Duration::from_millis(100))
        );
        assert_eq!(
            opts.decide(1, &1),
            RetryDecision::RetryAfter(Duration::from_millis(200))
        );
        assert_eq!(opts.decide(2, &1), RetryDecision::Exhausted);
    }

    #[test]
    fn clones_share_observer() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let opts = RetryOptions::<()>::new().on_retry(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let copy = opts.clone();
        opts.notify_retry(1, &());
        copy.notify_retry(2, &());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
