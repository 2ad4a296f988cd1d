//! The storage driver contract and the drivers shipped with this crate.
//!
//! A driver hands out [`Descriptor`]s for open files and keeps one cursor per descriptor. All
//! reads and writes happen at that cursor and advance it by the number of bytes transferred.

mod memory;
mod sqlite;

pub use self::memory::MemoryDriver;
pub use self::sqlite::SqliteDriver;

use crate::util::{Descriptor, SeekFlag, StoragePath};

/// Primitive, blocking operations of a descriptor-based storage.
///
/// Methods take `&self` so that several file handles can share one driver; implementations keep
/// their descriptor table behind interior mutability.
pub trait StorageDriver {
    /// The error signalled by the driver.
    type Error;

    /// Open the file at `path`, creating it if it does not exist, with the cursor at 0.
    fn open(&self, path: &StoragePath) -> Result<Descriptor, Self::Error>;

    /// Move the cursor and return the new absolute position.
    fn seek(&self, descriptor: Descriptor, flag: SeekFlag) -> Result<u64, Self::Error>;

    /// Read a single byte, or `None` at the end of the file.
    fn read_byte(&self, descriptor: Descriptor) -> Result<Option<u8>, Self::Error>;

    /// Read at most `max_length` bytes.
    fn read_buffer(&self, descriptor: Descriptor, max_length: usize)
        -> Result<Vec<u8>, Self::Error>;

    /// Write text, encoded as UTF-8.
    fn write_string(&self, descriptor: Descriptor, text: &str) -> Result<(), Self::Error> {
        self.write_buffer(descriptor, text.as_bytes())
    }

    /// Write raw bytes.
    fn write_buffer(&self, descriptor: Descriptor, data: &[u8]) -> Result<(), Self::Error>;

    /// Persist pending writes without closing.
    fn flush(&self, descriptor: Descriptor) -> Result<(), Self::Error>;

    /// Persist pending writes and release the descriptor.
    fn close(&self, descriptor: Descriptor) -> Result<(), Self::Error>;

    /// Delete the file at `path`. Removing a file that does not exist is not an error.
    fn remove(&self, path: &StoragePath) -> Result<(), Self::Error>;

    /// Checks whether a file exists at `path`.
    fn exists(&self, path: &StoragePath) -> Result<bool, Self::Error>;

    /// Create a directory entry in the namespace. Creating an existing directory is a no-op.
    fn create_directory(&self, path: &StoragePath) -> Result<(), Self::Error>;
}
