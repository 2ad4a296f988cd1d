use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::io::{Error as IoError, ErrorKind};

use super::FileError;

/// An error occurring in one of the single-shot convenience functions.
#[derive(Debug, PartialEq)]
pub enum FilesError<E> {
    /// Operating on the file failed.
    File(FileError<E>),
    /// The data destination raised an error.
    SinkError(ErrorKind),
}

impl<E: PartialEq + Debug + Display> super::Error for FilesError<E> {}

impl<E> From<FileError<E>> for FilesError<E> {
    fn from(error: FileError<E>) -> Self {
        FilesError::File(error)
    }
}

impl<E> From<IoError> for FilesError<E> {
    fn from(error: IoError) -> Self {
        FilesError::SinkError(error.kind())
    }
}

impl<E: Display> Display for FilesError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FilesError::File(error) => Display::fmt(error, f),
            FilesError::SinkError(error) => {
                write!(f, "The data destination failed ('{:?}')", error)
            }
        }
    }
}
