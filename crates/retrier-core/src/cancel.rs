//! Cancellation tokens shared between a retry loop and the operation it drives.
//!
//! A token is triggered either explicitly (`cancel`, `cancel_with`) or by a
//! deadline fixed at construction. Waiters block on a condition variable, so
//! a cancel wakes a sleeping retry loop immediately instead of on the next
//! poll. Deadlines are evaluated against `Instant::now()` by whoever looks at
//! the token, so no timer thread is needed.

use std::error::Error;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Why a token fired.
#[derive(Debug, Clone)]
pub enum CancelReason {
    /// `cancel()` was called.
    Cancelled,
    /// The token's deadline passed.
    DeadlineExceeded,
    /// `cancel_with()` was called with a caller-supplied cause.
    Other(Arc<dyn Error + Send + Sync>),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => write!(f, "canceled"),
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
            CancelReason::Other(cause) => write!(f, "{}", cause),
        }
    }
}

#[derive(Debug)]
struct Inner {
    /// First reason recorded wins; never reset.
    reason: Mutex<Option<CancelReason>>,
    signal: Condvar,
    deadline: Option<Instant>,
}

/// Cloneable handle to a shared cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// A token that only fires when cancelled explicitly.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A token that fires on its own once `deadline` is reached.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline))
    }

    /// A token that fires on its own after `timeout`. A timeout too large to
    /// represent as an `Instant` means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Instant::now().checked_add(timeout))
    }

    fn build(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                reason: Mutex::new(None),
                signal: Condvar::new(),
                deadline,
            }),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Fire the token. Has no effect if it already fired.
    pub fn cancel(&self) {
        self.trigger(CancelReason::Cancelled);
    }

    /// Fire the token with a custom cause, reported verbatim by the retry loop.
    pub fn cancel_with<E>(&self, cause: E)
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        self.trigger(CancelReason::Other(Arc::from(cause.into())));
    }

    fn trigger(&self, reason: CancelReason) {
        let mut state = self.lock();
        if self.latch(&mut state).is_none() {
            *state = Some(reason);
        }
        drop(state);
        self.inner.signal.notify_all();
    }

    /// The reason the token fired, or `None` while it is still live.
    pub fn reason(&self) -> Option<CancelReason> {
        let mut state = self.lock();
        self.latch(&mut state)
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Block for up to `timeout`, returning early if the token fires.
    ///
    /// Returns `None` when the full timeout elapsed with the token still live.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<CancelReason> {
        let until = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        loop {
            if let Some(reason) = self.latch(&mut state) {
                return Some(reason);
            }
            let now = Instant::now();
            if until.is_some_and(|until| now >= until) {
                return None;
            }
            let wake = [until, self.inner.deadline].into_iter().flatten().min();
            state = match wake {
                Some(wake) => {
                    self.inner
                        .signal
                        .wait_timeout(state, wake.saturating_duration_since(now))
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .inner
                    .signal
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// Record an expired deadline so later explicit cancels cannot override it.
    fn latch(&self, state: &mut Option<CancelReason>) -> Option<CancelReason> {
        if state.is_none() && self.inner.deadline.is_some_and(|d| Instant::now() >= d) {
            *state = Some(CancelReason::DeadlineExceeded);
        }
        state.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<CancelReason>> {
        // The guarded value is a plain Option, so a poisoned lock is still usable.
        self.inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
