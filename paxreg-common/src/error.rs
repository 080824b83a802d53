//! Common error types for the passenger registry

use thiserror::Error;

/// Common result type for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds shared by every registry phase
///
/// Only `MalformedRecord` is recoverable: the consolidator counts it and
/// moves on to the next record. Every other variant aborts the run.
#[derive(Error, Debug)]
pub enum Error {
    /// Registry store cannot be opened or a transaction cannot be committed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A source record lacks the fields needed to derive an identity key
    #[error("Malformed {source_kind} record: {reason}")]
    MalformedRecord {
        source_kind: String,
        reason: String,
    },

    /// Rows of a cluster disappeared or changed while being merged
    #[error("Inconsistent merge input: {0}")]
    InconsistentMergeInput(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Build a `MalformedRecord` for the given source
    pub fn malformed(source_kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            source_kind: source_kind.into(),
            reason: reason.into(),
        }
    }

    /// True for error kinds that skip one record instead of aborting the run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedRecord { .. })
    }
}
