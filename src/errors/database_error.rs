use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

use rusqlite::Error as WrappedError;
use rusqlite::ErrorCode as SQLiteError;

/// An error raised and described by SQLite.
#[derive(PartialEq, Eq)]
pub struct DatabaseError {
    error: SQLiteError,
    message: Option<String>,
}

impl DatabaseError {
    /// Message returned if SQLite does not specify an error.
    pub const MISSING_MESSAGE: &'static str = "<Unknown SQLite error>";

    /// The error code reported by SQLite.
    pub fn code(&self) -> SQLiteError {
        self.error
    }
}

impl super::Error for DatabaseError {}

impl Debug for DatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.message {
            Some(message) => write!(f, "'{}' ({:?})", message, self.error),
            None => write!(f, "'{}' ({:?})", DatabaseError::MISSING_MESSAGE, self.error),
        }
    }
}

impl Display for DatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.message {
            Some(message) => f.write_str(message),
            None => f.write_str(DatabaseError::MISSING_MESSAGE),
        }
    }
}

impl From<WrappedError> for DatabaseError {
    fn from(value: WrappedError) -> Self {
        match value {
            WrappedError::SqliteFailure(error, message) => Self {
                error: error.code,
                message,
            },
            // Errors raised by rusqlite itself (type conversions, misuse) carry no SQLite code.
            other => Self {
                error: SQLiteError::Unknown,
                message: Some(other.to_string()),
            },
        }
    }
}
