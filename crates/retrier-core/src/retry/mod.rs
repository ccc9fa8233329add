//! Retry loop, its options and the errors it reports.
//!
//! The loop alternates between invoking the operation, asking the
//! retryability predicate about a failure and sleeping for the backoff
//! delay. The cancellable variant races that sleep against a
//! [`CancelToken`](crate::cancel::CancelToken).

mod error;
mod policy;
mod run;

pub use error::{FailureKind, RetryError};
pub use policy::{RetryDecision, RetryOptions, DEFAULT_MAX_ATTEMPTS};
pub use run::{run_with_retry, run_with_retry_cancellable};
