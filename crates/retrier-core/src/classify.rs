//! Classify HTTP statuses and I/O failures into retryability kinds.
//!
//! The retry loop itself never looks inside errors; these helpers exist so
//! callers can build retryability predicates for common transports.

use std::error::Error;
use std::io;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read, or HTTP 408).
    Timeout,
    /// Server asked us to slow down (429).
    Throttled,
    /// Network-level failure (connection reset, refused, ...).
    Connection,
    /// Server-side HTTP failure (5xx).
    Http5xx(u16),
    /// Anything else; not worth retrying.
    Other,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        !matches!(self, ErrorKind::Other)
    }
}

/// An HTTP response that carried a failure status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    pub status_code: u16,
    pub message: String,
}

impl HttpError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        classify_http_status(self.status_code)
    }
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        408 => ErrorKind::Timeout,
        429 => ErrorKind::Throttled,
        500..=u16::MAX => ErrorKind::Http5xx(code),
        _ => ErrorKind::Other,
    }
}

/// 5xx, 429 Too Many Requests and 408 Request Timeout are retryable.
pub fn is_http_retryable(code: u16) -> bool {
    classify_http_status(code).is_transient()
}

/// Classify an I/O error by its kind.
pub fn classify_io_error(e: &io::Error) -> ErrorKind {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe => ErrorKind::Connection,
        _ => ErrorKind::Other,
    }
}

/// Iterate over an error and its chain of sources.
fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

/// True when the error, or any of its sources, is a transient network failure.
pub fn is_network_error(err: &(dyn Error + 'static)) -> bool {
    chain(err)
        .filter_map(|e| e.downcast_ref::<io::Error>())
        .any(|io_err| classify_io_error(io_err).is_transient())
}

/// True for transient network failures and for [`HttpError`]s whose status
/// is retryable.
pub fn is_retryable_http_error(err: &(dyn Error + 'static)) -> bool {
    if is_network_error(err) {
        return true;
    }
    chain(err)
        .filter_map(|e| e.downcast_ref::<HttpError>())
        .any(|http| is_http_retryable(http.status_code))
}
