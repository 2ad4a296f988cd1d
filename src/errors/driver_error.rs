use std::fmt::{Display, Formatter, Result as FmtResult};

use rusqlite::Error as WrappedError;

use super::DatabaseError;
use crate::util::{Descriptor, StoragePath};

/// An error signalled by one of the storage drivers.
#[derive(Debug, PartialEq)]
pub enum DriverError {
    /// The descriptor does not refer to an open file.
    BadDescriptor(Descriptor),
    /// Every slot of the descriptor table is in use.
    TooManyOpenFiles,
    /// The seek would move the cursor before the start of the file.
    InvalidSeek,
    /// The position or size exceeds what the storage can address.
    FileSystemLimits,
    /// The path names a directory, not a file.
    IsDirectory(StoragePath),
    /// A general database error from SQLite.
    DatabaseError(DatabaseError),
}

impl super::Error for DriverError {}

impl From<WrappedError> for DriverError {
    fn from(error: WrappedError) -> Self {
        DriverError::DatabaseError(error.into())
    }
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Error in storage driver: ")?;
        match self {
            DriverError::BadDescriptor(descriptor) => {
                write!(f, "The descriptor {} does not refer to an open file", descriptor)
            }
            DriverError::TooManyOpenFiles => write!(f, "Too many files are open"),
            DriverError::InvalidSeek => {
                write!(f, "The seek would move before the start of the file")
            }
            DriverError::FileSystemLimits => {
                write!(f, "The storage does not allow files of such size")
            }
            DriverError::IsDirectory(path) => write!(f, "'{}' is a directory", path),
            DriverError::DatabaseError(error) => {
                write!(f, "The underlying database failed ('{}')", error)
            }
        }
    }
}
