//! Execution errors

use serde::Serialize;
use thiserror::Error;

/// Broad cause of an execution failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    /// The query ran past its time limit and was interrupted
    Timeout,
    /// The database could not be opened or was locked
    Unavailable,
    /// The engine refused the statement
    Rejected,
    /// Anything else (worker panic, unexpected engine state)
    Internal,
}

impl ExecutionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::Rejected => "rejected",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed execution
///
/// `message` is safe to show to clients; engine text is only logged.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,
    pub message: String,
}

impl ExecutionError {
    pub fn timeout(limit_ms: u128) -> Self {
        Self {
            kind: ExecutionErrorKind::Timeout,
            message: format!("Query exceeded the {} ms time limit", limit_ms),
        }
    }

    /// The time limit passed before the worker reached the statement
    pub fn cancelled() -> Self {
        Self {
            kind: ExecutionErrorKind::Timeout,
            message: "Query was cancelled after its time limit".to_string(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            kind: ExecutionErrorKind::Unavailable,
            message: "The database is unavailable".to_string(),
        }
    }

    pub fn rejected() -> Self {
        Self {
            kind: ExecutionErrorKind::Rejected,
            message: "The database could not run this query".to_string(),
        }
    }

    pub fn internal() -> Self {
        Self {
            kind: ExecutionErrorKind::Internal,
            message: "Query execution failed".to_string(),
        }
    }

    /// Classify an engine error, logging its raw text
    ///
    /// Prepare-time failures (unknown column, bad syntax) arrive as
    /// `SqlInputError` and carry their code on the inner error.
    pub fn from_sqlite(err: &rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        tracing::warn!(error = %err, "SQLite error during query execution");

        let code = match err {
            rusqlite::Error::SqliteFailure(e, _) => Some(e.code),
            rusqlite::Error::SqlInputError { error, .. } => Some(error.code),
            _ => None,
        };

        match code {
            Some(ErrorCode::OperationInterrupted) => Self {
                kind: ExecutionErrorKind::Timeout,
                message: "Query was interrupted".to_string(),
            },
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
                | ErrorCode::OutOfMemory,
            ) => Self::unavailable(),
            Some(_) => Self::rejected(),
            None => match err {
                rusqlite::Error::InvalidParameterCount(..) => Self::rejected(),
                _ => Self::internal(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn prepare_error(sql: &str) -> rusqlite::Error {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        conn.prepare(sql).map(|_| ()).unwrap_err()
    }

    #[test]
    fn test_prepare_failures_are_rejected() {
        for sql in ["SELECT secret_column FROM users", "SELEC oops", "SELECT * FROM nowhere"] {
            let err = ExecutionError::from_sqlite(&prepare_error(sql));
            assert_eq!(err.kind, ExecutionErrorKind::Rejected, "{}", sql);
            assert_eq!(err.message, ExecutionError::rejected().message);
        }
    }

    #[test]
    fn test_runtime_codes() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert_eq!(ExecutionError::from_sqlite(&busy).kind, ExecutionErrorKind::Unavailable);

        let interrupted = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
            None,
        );
        assert_eq!(ExecutionError::from_sqlite(&interrupted).kind, ExecutionErrorKind::Timeout);

        let other = rusqlite::Error::InvalidColumnIndex(3);
        assert_eq!(ExecutionError::from_sqlite(&other).kind, ExecutionErrorKind::Internal);
    }
}
