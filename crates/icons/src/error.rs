//! Icon Error Types
//!
//! Every variant here describes why an icon could not be produced. None of
//! them is fatal: the cache reports them as a miss and a later lookup tries
//! again.

use crate::validate::Rejection;
use derive_more::{Display, Error};
use std::time::Duration;

/// An icon error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for icon operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The HTTP client could not be constructed.
    #[display("failed to build HTTP client")]
    Client,
    /// Connecting to, or reading from, the icon host failed.
    #[display("network error fetching {_0}")]
    Network(#[error(not(source))] String),
    /// The icon host answered with something other than 200.
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// The fetch didn't finish in time.
    #[display("timed out after {}s", _0.as_secs())]
    Timeout(#[error(not(source))] Duration),
    /// The payload doesn't look like an image.
    #[display("rejected payload: {_0}")]
    Rejected(#[error(not(source))] Rejection),
    /// Reading or writing the disk tier failed.
    #[display("icon storage error")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::Storage => true,
            // 404 today may be a 200 once someone uploads the icon.
            Self::Status(status) => *status == 404 || *status == 429 || *status >= 500,
            Self::Client | Self::Rejected(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Status(404).to_string(), "unexpected HTTP status 404");
        assert_eq!(ErrorKind::Timeout(Duration::from_secs(12)).to_string(), "timed out after 12s");
        assert_eq!(
            ErrorKind::Rejected(Rejection::TooSmall(100)).to_string(),
            "rejected payload: too small (100 bytes)"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(ErrorKind::Status(503).is_retryable());
        assert!(!ErrorKind::Status(403).is_retryable());
        assert!(!ErrorKind::Rejected(Rejection::Html).is_retryable());
    }
}
