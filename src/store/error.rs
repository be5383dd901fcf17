//! Saved query store errors

use thiserror::Error;

/// Errors raised by the saved query store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Saved query {0} not found")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    Lock,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
