//! CLI Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command execution.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("no database file: pass --db, set `database` in the config, or run next to id_database.json")]
    NoDatabase,
    #[display("failed to load configuration")]
    Config,
    #[display("database error")]
    Database,
    #[display("invalid edit")]
    Edit,
    #[display("icon cache error")]
    Icons,
    #[display("{kind} not found: {value}")]
    NotFound {
        kind: &'static str,
        value: String,
    },
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
