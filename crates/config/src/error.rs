//! Config Error Types

use derive_more::{Display, Error};

/// A config error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A config source couldn't be parsed or has the wrong types.
    #[display("invalid configuration")]
    Invalid,
    /// A value parsed fine but isn't acceptable.
    #[display("invalid configuration value for `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        reason: &'static str,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Needs a human to edit the config first.
        false
    }
}
