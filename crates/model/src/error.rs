//! Model Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A model error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A user-supplied identifier is not exactly `width` hex digits.
    #[display("{kind} must be {width} hex characters, found: {value:?}")]
    Validation {
        /// Human name of the identifier ("TitleID", "ContentID", ...).
        kind: &'static str,
        /// Required number of hex digits.
        width: usize,
        /// The rejected input.
        value: String,
    },
    /// The edit would overwrite an existing entry.
    #[display("{kind} already exists: {value}")]
    Conflict {
        kind: &'static str,
        value: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Same input, same answer.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        let err = ErrorKind::Validation {
            kind: "TitleID",
            width: 8,
            value: "xyz".to_string(),
        };
        assert_eq!(err.to_string(), "TitleID must be 8 hex characters, found: \"xyz\"");
        let err = ErrorKind::Conflict {
            kind: "SHA1",
            value: "00".to_string(),
        };
        assert_eq!(err.to_string(), "SHA1 already exists: 00");
        assert!(!err.is_retryable());
    }
}
