//! Policy-driven retries for fallible operations.
//!
//! [`retry::run_with_retry`] drives an operation through attempts, backoff
//! waits and retryability checks on the calling thread;
//! [`retry::run_with_retry_cancellable`] does the same while honoring a
//! [`cancel::CancelToken`].

pub mod backoff;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod logging;
pub mod retry;

pub use backoff::Backoff;
pub use cancel::{CancelReason, CancelToken};
pub use classify::HttpError;
pub use retry::{run_with_retry, run_with_retry_cancellable, FailureKind, RetryError, RetryOptions};
