//! Error types for the herald-ledger crate.

use std::io;

use thiserror::Error;

/// Top-level ledger error type.
///
/// Any of these reaching the dispatcher means the outcome could not be made
/// durable *yet*; the [`crate::Recorder`] keeps it and retries.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// I/O operation failed (file read/write/rename).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The log file could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store configuration was rejected.
    #[error("Ledger validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Internal error (injected faults, poisoned state).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Ledger configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Ledger path cannot contain '..' components: {0}")]
    ParentDirectory(String),

    #[error("Ledger path cannot be in system directory {prefix}: {path}")]
    SystemDirectory { prefix: &'static str, path: String },

    #[error("Ledger path is a directory, expected a file: {0}")]
    NotAFile(String),

    #[error("Retention must keep at least one outcome")]
    ZeroRetention,
}

/// Specialized `Result` type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
