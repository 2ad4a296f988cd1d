use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// An error occurring while operating on a file handle.
#[derive(Debug, PartialEq)]
pub enum FileError<E> {
    /// The handle is not open, so there is no descriptor to operate on.
    Closed,
    /// The storage driver failed; its error is passed on unchanged.
    Driver(E),
}

impl<E: PartialEq + Debug + Display> super::Error for FileError<E> {}

impl<E> From<E> for FileError<E> {
    fn from(error: E) -> Self {
        FileError::Driver(error)
    }
}

impl<E: Display> Display for FileError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileError::Closed => write!(f, "The file is not open"),
            FileError::Driver(error) => Display::fmt(error, f),
        }
    }
}
