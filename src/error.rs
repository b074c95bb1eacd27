use std::fmt;

use thiserror::Error;

/// The error triple reported by the database driver: numeric code,
/// five-character SQLSTATE and the server's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFailure {
    pub code: u16,
    pub sql_state: String,
    pub message: String,
}

impl SqlFailure {
    pub fn new(code: u16, sql_state: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            sql_state: sql_state.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SqlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (error code: {}, SQLSTATE: {})",
            self.message, self.code, self.sql_state
        )
    }
}

/// Error type for sqlsess operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// An operation was invoked before the step that must precede it.
    /// Always a usage fault; never retried.
    #[error("{operation} failed: {missing}")]
    Precondition {
        operation: &'static str,
        missing: &'static str,
    },

    #[error("Connection failed: {0}")]
    Connection(SqlFailure),

    #[error("Query failed: {0}")]
    Query(SqlFailure),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

impl SessionError {
    pub(crate) fn precondition(operation: &'static str, missing: &'static str) -> Self {
        SessionError::Precondition { operation, missing }
    }

    /// Returns the driver-reported failure carried by this error, if any.
    pub fn sql_failure(&self) -> Option<&SqlFailure> {
        match self {
            SessionError::Connection(failure) | SessionError::Query(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Result type alias for sqlsess operations
pub type Result<T> = std::result::Result<T, SessionError>;
