//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;
use titledb_model::TitleId;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The file isn't JSON, or has no top-level `Titles` object. Nothing was
    /// loaded.
    #[display("not a valid id database (missing top-level 'Titles' object)")]
    Format,
    /// Reading or writing the database file failed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// Copying the previous file aside before a save failed.
    #[display("backup failed: {}", _0.display())]
    Backup(#[error(not(source))] PathBuf),
    /// Save was requested but no path was given and none is known.
    #[display("no path to save to")]
    NoPath,
    /// The database could not be serialized.
    #[display("failed to serialize database")]
    Serialize,
    /// A title id with no hex digits in it.
    #[display("TitleID must be 8 hex characters, found: {_0:?}")]
    InvalidTitleId(#[error(not(source))] String),
    /// The title id is already taken.
    #[display("TitleID already exists: {_0}")]
    TitleExists(#[error(not(source))] TitleId),
    /// No title with that id.
    #[display("TitleID not found: {_0}")]
    TitleNotFound(#[error(not(source))] TitleId),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Backup(_))
    }

    /// Returns `true` for rejected user input (the ValidationError family).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidTitleId(_) | Self::TitleExists(_) | Self::TitleNotFound(_))
    }
}
