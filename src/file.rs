use log::warn;

use crate::driver::StorageDriver;
use crate::errors::FileError;
use crate::util::{Descriptor, SeekFlag, StoragePath};

/// A file on the storage, addressed by path and accessed through a driver descriptor.
///
/// A handle starts closed. Every operation except [`File::open`] and [`File::remove`] needs the
/// handle to be open and fails with [`FileError::Closed`] otherwise. Handles are not closed
/// automatically: pair every `open` with a `close`.
#[derive(Debug)]
pub struct File<'a, D> {
    driver: &'a D,
    path: StoragePath,
    descriptor: Option<Descriptor>,
}

impl<'a, D> File<'a, D>
where
    D: StorageDriver,
{
    /// Creates a closed handle for the file at `path`.
    pub fn new<T: Into<StoragePath>>(driver: &'a D, path: T) -> Self {
        File {
            driver,
            path: path.into(),
            descriptor: None,
        }
    }

    /// The path of the file.
    pub fn path(&self) -> &StoragePath {
        &self.path
    }

    /// The descriptor of the file while it is open.
    pub fn descriptor(&self) -> Option<Descriptor> {
        self.descriptor
    }

    /// Checks whether the handle is open.
    pub fn is_open(&self) -> bool {
        self.descriptor.is_some()
    }

    fn open_descriptor(&self) -> Result<Descriptor, FileError<D::Error>> {
        self.descriptor.ok_or(FileError::Closed)
    }

    /// Opens the file, creating it if needed. Opening an open handle does nothing.
    pub fn open(&mut self) -> Result<(), FileError<D::Error>> {
        if self.descriptor.is_none() {
            self.descriptor = Some(self.driver.open(&self.path)?);
        }
        Ok(())
    }

    /// Writes all pending data to the storage without closing the file.
    pub fn flush(&mut self) -> Result<(), FileError<D::Error>> {
        let descriptor = self.open_descriptor()?;
        Ok(self.driver.flush(descriptor)?)
    }

    /// Closes the file and writes all pending data to the storage.
    pub fn close(&mut self) -> Result<(), FileError<D::Error>> {
        let descriptor = self.open_descriptor()?;
        self.descriptor = None;
        Ok(self.driver.close(descriptor)?)
    }

    /// Removes the file. The handle is closed afterwards, whether it was open or not.
    pub fn remove(&mut self) -> Result<(), FileError<D::Error>> {
        // Release the descriptor slot first; a failure there must not keep the file around.
        let closed = match self.descriptor.take() {
            Some(descriptor) => self.driver.close(descriptor),
            None => Ok(()),
        };
        self.driver.remove(&self.path)?;
        Ok(closed?)
    }

    /// Moves the cursor used by subsequent reads and writes. Returns the new absolute position.
    pub fn seek(&mut self, flag: SeekFlag) -> Result<u64, FileError<D::Error>> {
        let descriptor = self.open_descriptor()?;
        Ok(self.driver.seek(descriptor, flag)?)
    }

    /// The current position in the file.
    pub fn position(&mut self) -> Result<u64, FileError<D::Error>> {
        self.seek(SeekFlag::Current(0))
    }

    /// Moves the cursor to `position`, counted from the start of the file. Nothing is truncated.
    pub fn set_position(&mut self, position: u64) -> Result<(), FileError<D::Error>> {
        self.seek(SeekFlag::Set(position)).map(|_| ())
    }

    /// The length of the file in bytes.
    ///
    /// The length is found by seeking to the end, so this leaves the cursor at the **start** of
    /// the file, not where it was before.
    pub fn length(&mut self) -> Result<u64, FileError<D::Error>> {
        self.seek(SeekFlag::End(0))?;
        let length = self.position()?;
        self.seek(SeekFlag::Set(0))?;
        Ok(length)
    }

    /// Writes text at the current position.
    pub fn write_string(&mut self, text: &str) -> Result<(), FileError<D::Error>> {
        let descriptor = self.open_descriptor()?;
        Ok(self.driver.write_string(descriptor, text)?)
    }

    /// Writes bytes at the current position.
    pub fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), FileError<D::Error>> {
        let descriptor = self.open_descriptor()?;
        Ok(self.driver.write_buffer(descriptor, buffer)?)
    }

    /// Reads the byte at the current position, or `None` at the end of the file.
    pub fn read(&mut self) -> Result<Option<u8>, FileError<D::Error>> {
        let descriptor = self.open_descriptor()?;
        Ok(self.driver.read_byte(descriptor)?)
    }

    /// Reads up to `length` bytes, but never more than the file holds.
    ///
    /// Bounding the request queries [`File::length`], which moves the cursor to the start of the
    /// file, so the bytes are read from there. The driver may return fewer bytes than requested.
    pub fn read_buffer(&mut self, length: usize) -> Result<Vec<u8>, FileError<D::Error>> {
        let file_length = self.length()?;
        let length = std::cmp::min(length as u64, file_length) as usize;
        let descriptor = self.open_descriptor()?;
        Ok(self.driver.read_buffer(descriptor, length)?)
    }
}

impl<'a, D> Drop for File<'a, D> {
    fn drop(&mut self) {
        if let Some(descriptor) = self.descriptor {
            warn!(
                "File '{}' dropped while still open as {}",
                self.path, descriptor
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{File, FileError, SeekFlag};
    use crate::driver::{MemoryDriver, StorageDriver};
    use crate::errors::DriverError;

    fn file_with<'a>(driver: &'a MemoryDriver, content: &str) -> File<'a, MemoryDriver> {
        let mut file = File::new(driver, "data.txt");
        file.open().expect("Open failed");
        file.write_string(content).expect("Write failed");
        file
    }

    #[test]
    fn test_new_handle_is_closed() {
        let driver = MemoryDriver::default();
        let file = File::new(&driver, "/data.txt");
        assert!(!file.is_open());
        assert_eq!(file.descriptor(), None);
        assert_eq!(file.path(), &"data.txt");
        assert_eq!(driver.open_descriptors(), 0);
    }

    #[test]
    fn test_open_then_close() {
        let driver = MemoryDriver::default();
        let mut file = File::new(&driver, "data.txt");
        file.open().expect("Open failed");
        assert!(file.is_open());
        file.close().expect("Close failed");
        assert_eq!(file.descriptor(), None);
        assert_eq!(driver.open_descriptors(), 0);
    }

    #[test]
    fn test_open_is_idempotent() {
        let driver = MemoryDriver::default();
        let mut file = File::new(&driver, "data.txt");
        file.open().expect("Open failed");
        let descriptor = file.descriptor();
        file.open().expect("Second open failed");
        assert_eq!(file.descriptor(), descriptor);
        assert_eq!(driver.open_descriptors(), 1);
        file.close().expect("Close failed");
    }

    #[test]
    fn test_remove_open_handle() {
        let driver = MemoryDriver::default();
        let mut file = file_with(&driver, "content");
        file.remove().expect("Remove failed");
        assert_eq!(file.descriptor(), None);
        assert_eq!(driver.contents("data.txt"), None);
        assert_eq!(driver.open_descriptors(), 0);
    }

    #[test]
    fn test_remove_closed_handle() {
        let driver = MemoryDriver::default();
        let mut file = file_with(&driver, "content");
        file.close().expect("Close failed");
        file.remove().expect("Remove failed");
        assert_eq!(file.descriptor(), None);
        assert!(!driver
            .exists(&"data.txt".into())
            .expect("Query failed"));
    }

    #[test]
    fn test_operations_on_closed_handle() {
        let driver = MemoryDriver::default();
        let mut file = File::new(&driver, "data.txt");
        assert_eq!(file.close(), Err(FileError::Closed));
        assert_eq!(file.flush(), Err(FileError::Closed));
        assert_eq!(file.position(), Err(FileError::Closed));
        assert_eq!(file.length(), Err(FileError::Closed));
        assert_eq!(file.read(), Err(FileError::Closed));
        assert_eq!(file.read_buffer(4), Err(FileError::Closed));
        assert_eq!(file.write_string("text"), Err(FileError::Closed));
        assert_eq!(file.write_buffer(b"text"), Err(FileError::Closed));
        assert_eq!(driver.contents("data.txt"), None);
    }

    #[test]
    fn test_driver_errors_are_passed_on() {
        let driver = MemoryDriver::default();
        let mut file = file_with(&driver, "abc");
        assert_eq!(
            file.seek(SeekFlag::Current(-4)),
            Err(FileError::Driver(DriverError::InvalidSeek))
        );
        file.close().expect("Close failed");
    }

    #[test]
    fn test_position_round_trip() {
        let driver = MemoryDriver::default();
        let mut file = file_with(&driver, "0123456789");
        for position in &[0, 3, 9, 10, 25] {
            file.set_position(*position).expect("Set position failed");
            assert_eq!(file.position(), Ok(*position));
        }
        file.close().expect("Close failed");
    }

    #[test]
    fn test_length_moves_cursor_to_start() {
        let driver = MemoryDriver::default();
        let mut file = File::new(&driver, "hello.txt");
        file.open().expect("Open failed");
        file.set_position(0).expect("Set position failed");
        file.write_string("hello").expect("Write failed");
        file.set_position(3).expect("Set position failed");
        assert_eq!(file.length(), Ok(5));
        assert_eq!(file.position(), Ok(0));
        file.close().expect("Close failed");
    }

    #[test]
    fn test_read_buffer_is_bounded_by_length() {
        let driver = MemoryDriver::default();
        let mut file = file_with(&driver, "0123456789");
        file.set_position(0).expect("Set position failed");
        assert_eq!(file.read_buffer(1000), Ok(b"0123456789".to_vec()));
        file.close().expect("Close failed");
    }

    #[test]
    fn test_read_buffer_starts_at_beginning() {
        let driver = MemoryDriver::default();
        let mut file = file_with(&driver, "0123456789");
        file.set_position(6).expect("Set position failed");
        assert_eq!(file.read_buffer(3), Ok(b"012".to_vec()));
        assert_eq!(file.position(), Ok(3));
        file.close().expect("Close failed");
    }

    #[test]
    fn test_read_single_bytes() {
        let driver = MemoryDriver::default();
        let mut file = file_with(&driver, "ab");
        file.set_position(0).expect("Set position failed");
        assert_eq!(file.read(), Ok(Some(b'a')));
        assert_eq!(file.read(), Ok(Some(b'b')));
        assert_eq!(file.read(), Ok(None));
        file.close().expect("Close failed");
    }

    #[test]
    fn test_overwrite_without_truncation() {
        let driver = MemoryDriver::default();
        let mut file = file_with(&driver, "hello world");
        file.set_position(0).expect("Set position failed");
        file.write_string("HELLO").expect("Write failed");
        file.flush().expect("Flush failed");
        assert_eq!(driver.contents("data.txt"), Some(b"HELLO world".to_vec()));
        file.close().expect("Close failed");
    }

    #[test]
    fn test_seek_to_end_appends() {
        let driver = MemoryDriver::default();
        let mut file = file_with(&driver, "abc");
        file.set_position(0).expect("Set position failed");
        assert_eq!(file.seek(SeekFlag::End(0)), Ok(3));
        file.write_buffer(&[b'd']).expect("Write failed");
        assert_eq!(file.length(), Ok(4));
        file.close().expect("Close failed");
    }
}
