//! Various errors occurring during access of the storage.

use std::fmt::{Debug, Display};

mod database_error;

mod driver_error;
mod file_error;
mod files_error;
mod loading_error;

pub use self::database_error::DatabaseError;
pub use self::driver_error::DriverError;
pub use self::file_error::FileError;
pub use self::files_error::FilesError;
pub use self::loading_error::LoadingError;

/// An error occurring while accessing the storage.
pub trait Error: PartialEq + Debug + Display {
    /// Generate a human-readable version of the error.
    fn error_message(&self) -> String {
        format!("{}", &self)
    }
}
