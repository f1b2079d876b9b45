//! Error types for the attribute-value store

use doctrack_fields::ValidationError;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage failures. The store never retries; the caller decides.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite rejected a statement or could not open the database
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A previous holder of the connection panicked
    #[error("database connection lock poisoned")]
    LockPoisoned,

    /// The blocking task running a query was cancelled or panicked
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Outcome of the validate-then-persist save flow.
#[derive(Debug, Error)]
pub enum SaveError {
    /// One or more visible fields failed validation; nothing was written
    #[error("{} field(s) failed validation", .0.len())]
    Validation(Vec<ValidationError>),

    /// Validation passed but the write failed
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl SaveError {
    /// Per-field messages when the save was rejected by validation.
    pub fn validation_errors(&self) -> Option<&[ValidationError]> {
        match self {
            SaveError::Validation(errors) => Some(errors),
            SaveError::Persistence(_) => None,
        }
    }
}
