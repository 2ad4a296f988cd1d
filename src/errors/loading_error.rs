use std::fmt::{Display, Formatter, Result as FmtResult};

use rusqlite::Error as WrappedError;

use super::DatabaseError;

/// An error occurring while loading the storage layout from a SQLite database.
#[derive(Debug, PartialEq)]
pub enum LoadingError {
    /// The database neither contains a storage layout nor should one be created.
    NoFileSystem,
    /// One of the underlying SQL statements is invalid. Should not occur in the wild.
    InvalidBaseCommand(&'static str, DatabaseError),
    /// The storage layout has a version not supported by this version of the library.
    UnsupportedVersion(u32),
    /// A general database error from SQLite.
    DatabaseError(DatabaseError),
}

impl super::Error for LoadingError {}

impl From<WrappedError> for LoadingError {
    fn from(error: WrappedError) -> Self {
        LoadingError::DatabaseError(error.into())
    }
}

impl Display for LoadingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Error during loading of storage from database: ")?;
        match self {
            LoadingError::NoFileSystem => {
                write!(f, "No storage layout exists neither should it be created")
            }
            LoadingError::InvalidBaseCommand(sql, _) => {
                write!(f, "Preparing a base SQL command '{}' failed", sql)
            }
            LoadingError::UnsupportedVersion(version) => write!(
                f,
                "The storage layout version '{}' is not compatible with the current library version",
                version
            ),
            LoadingError::DatabaseError(error) => {
                write!(f, "The underlying database failed ('{}')", error)
            }
        }
    }
}
