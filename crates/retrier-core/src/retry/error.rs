//! Terminal errors of a retry loop.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::cancel::CancelReason;

/// Which way a retry loop ended without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The predicate declined to retry the operation's error.
    NonRetryable,
    /// Every permitted attempt failed with a retryable error.
    Exhausted,
    /// The token was cancelled.
    Cancelled,
    /// The token's deadline passed.
    DeadlineExceeded,
    /// The token was cancelled with a custom cause.
    Interrupted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FailureKind::NonRetryable => "non-retryable error",
            FailureKind::Exhausted => "maximum retry attempts reached",
            FailureKind::Cancelled => "retry canceled",
            FailureKind::DeadlineExceeded => "deadline exceeded",
            FailureKind::Interrupted => "retry interrupted",
        };
        f.write_str(msg)
    }
}

/// Error returned by the retry loops.
///
/// Aggregated variants keep the most recent operation error next to the
/// reason the loop stopped. `NonRetryable` carries the operation's error
/// untouched and displays exactly like it.
#[derive(Debug)]
pub enum RetryError<E> {
    NonRetryable(E),
    Exhausted { attempts: u32, last: E },
    /// `last` is `None` when no attempt completed before the cancel.
    Cancelled { last: Option<E> },
    DeadlineExceeded { last: Option<E> },
    /// Custom cancel cause, reported verbatim without the last error.
    Interrupted(Arc<dyn Error + Send + Sync>),
}

impl<E> RetryError<E> {
    /// The error a loop reports when `reason` stopped it after `last` failed.
    pub fn from_cancel(reason: CancelReason, last: Option<E>) -> Self {
        match reason {
            CancelReason::Cancelled => RetryError::Cancelled { last },
            CancelReason::DeadlineExceeded => RetryError::DeadlineExceeded { last },
            CancelReason::Other(cause) => RetryError::Interrupted(cause),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            RetryError::NonRetryable(_) => FailureKind::NonRetryable,
            RetryError::Exhausted { .. } => FailureKind::Exhausted,
            RetryError::Cancelled { .. } => FailureKind::Cancelled,
            RetryError::DeadlineExceeded { .. } => FailureKind::DeadlineExceeded,
            RetryError::Interrupted(_) => FailureKind::Interrupted,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.kind() == FailureKind::Exhausted
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == FailureKind::Cancelled
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        self.kind() == FailureKind::DeadlineExceeded
    }

    /// The most recent error returned by the operation, if any.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::NonRetryable(e) | RetryError::Exhausted { last: e, .. } => Some(e),
            RetryError::Cancelled { last } | RetryError::DeadlineExceeded { last } => {
                last.as_ref()
            }
            RetryError::Interrupted(_) => None,
        }
    }

    /// The operation's own error when the predicate declined to retry it;
    /// any aggregated failure is handed back unchanged as `Err`.
    pub fn into_inner(self) -> Result<E, Self> {
        match self {
            RetryError::NonRetryable(e) => Ok(e),
            other => Err(other),
        }
    }

    pub fn into_last_error(self) -> Option<E> {
        match self {
            RetryError::NonRetryable(e) | RetryError::Exhausted { last: e, .. } => Some(e),
            RetryError::Cancelled { last } | RetryError::DeadlineExceeded { last } => last,
            RetryError::Interrupted(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::NonRetryable(e) => write!(f, "{}", e),
            RetryError::Exhausted { attempts, last } => {
                write!(f, "{} ({} attempts): {}", self.kind(), attempts, last)
            }
            RetryError::Cancelled { last: Some(e) }
            | RetryError::DeadlineExceeded { last: Some(e) } => {
                write!(f, "{}: {}", self.kind(), e)
            }
            RetryError::Cancelled { last: None } | RetryError::DeadlineExceeded { last: None } => {
                write!(f, "{}", self.kind())
            }
            RetryError::Interrupted(cause) => write!(f, "{}", cause),
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::NonRetryable(e) => e.source(),
            RetryError::Interrupted(cause) => cause.source(),
            _ => self.last_error().map(|e| e as &(dyn Error + 'static)),
        }
    }
}
