//! This crate provides file handles over a descriptor-based storage driver, such as on-board flash.
#![deny(missing_docs)]

mod config;
pub mod driver;
pub mod errors;
mod file;
pub mod files;
mod util;

pub use self::config::DriverConfig;
pub use self::driver::{MemoryDriver, SqliteDriver, StorageDriver};
pub use self::file::File;
pub use self::util::{Descriptor, SeekFlag, StoragePath};

pub use rusqlite::Connection as Database;
