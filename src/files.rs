//! Single-shot file operations.
//!
//! Each function opens its own handle, performs one operation and closes the handle again, so no
//! descriptor outlives the call. Nothing is batched: every call pays for a full open and close.

use std::io::Write;

use crate::driver::StorageDriver;
use crate::errors::{FileError, FilesError};
use crate::file::File;
use crate::util::{SeekFlag, StoragePath};

/// Line terminator written by [`append_line`].
pub const NEW_LINE: &str = "\r\n";
/// Tab character.
pub const TAB: &str = "\t";

/// Directory holding the settings written by [`settings_save_number`].
pub const SETTINGS_DIRECTORY: &str = "settings";

const READ_CHUNK_SIZE: usize = 32;

/// Opens the file at `filename`, creating it if needed.
pub fn open<'a, D, T>(driver: &'a D, filename: T) -> Result<File<'a, D>, FileError<D::Error>>
where
    D: StorageDriver,
    T: Into<StoragePath>,
{
    let mut file = File::new(driver, filename);
    file.open()?;
    Ok(file)
}

fn append_with<'a, D, T, F>(driver: &'a D, filename: T, body: F) -> Result<(), FileError<D::Error>>
where
    D: StorageDriver,
    T: Into<StoragePath>,
    F: FnOnce(&mut File<'a, D>) -> Result<(), FileError<D::Error>>,
{
    let mut file = open(driver, filename)?;
    let written = file.seek(SeekFlag::End(0)).and_then(|_| body(&mut file));
    let closed = file.close();
    written.and(closed)
}

/// Appends text and a new line to a file.
pub fn append_line<D, T>(driver: &D, filename: T, text: &str) -> Result<(), FileError<D::Error>>
where
    D: StorageDriver,
    T: Into<StoragePath>,
{
    append_with(driver, filename, |file| {
        file.write_string(text)?;
        file.write_string(NEW_LINE)
    })
}

/// Appends text to a file.
pub fn append_string<D, T>(driver: &D, filename: T, text: &str) -> Result<(), FileError<D::Error>>
where
    D: StorageDriver,
    T: Into<StoragePath>,
{
    append_with(driver, filename, |file| file.write_string(text))
}

/// Appends a number, as text, to a file. Whole numbers are written without a fraction.
pub fn append_number<D, T>(driver: &D, filename: T, value: f64) -> Result<(), FileError<D::Error>>
where
    D: StorageDriver,
    T: Into<StoragePath>,
{
    append_with(driver, filename, |file| {
        file.write_string(&value.to_string())
    })
}

/// Appends bytes to the end of a file.
pub fn append_buffer<D, T>(
    driver: &D,
    filename: T,
    buffer: &[u8],
) -> Result<(), FileError<D::Error>>
where
    D: StorageDriver,
    T: Into<StoragePath>,
{
    append_with(driver, filename, |file| file.write_buffer(buffer))
}

/// Reads the entire file. The whole content is held in memory, so mind large files.
pub fn read_buffer<D, T>(driver: &D, filename: T) -> Result<Vec<u8>, FileError<D::Error>>
where
    D: StorageDriver,
    T: Into<StoragePath>,
{
    let mut file = open(driver, filename)?;
    let content = file
        .length()
        .and_then(|length| file.read_buffer(length as usize));
    let closed = file.close();
    let content = content?;
    closed?;
    Ok(content)
}

/// Copies the content of a file into `sink`, a few bytes at a time. Returns the bytes copied.
pub fn read_to<D, T, W>(driver: &D, filename: T, mut sink: W) -> Result<usize, FilesError<D::Error>>
where
    D: StorageDriver,
    T: Into<StoragePath>,
    W: Write,
{
    let mut file = open(driver, filename)?;
    // `File::read_buffer` restarts at the beginning of the file, so read through the descriptor.
    let mut copy = || -> Result<usize, FilesError<D::Error>> {
        let descriptor = match file.descriptor() {
            Some(descriptor) => descriptor,
            None => return Err(FilesError::File(FileError::Closed)),
        };
        let mut bytes_copied = 0;
        loop {
            let data = driver
                .read_buffer(descriptor, READ_CHUNK_SIZE)
                .map_err(FileError::Driver)?;
            if data.is_empty() {
                return Ok(bytes_copied);
            }
            sink.write_all(&data)?;
            bytes_copied += data.len();
        }
    };
    let copied = copy();
    let closed = file.close();
    let copied = copied?;
    closed?;
    Ok(copied)
}

/// Removes a file. There is no undo for this operation.
pub fn remove<D, T>(driver: &D, filename: T) -> Result<(), FileError<D::Error>>
where
    D: StorageDriver,
    T: Into<StoragePath>,
{
    File::new(driver, filename).remove()
}

/// Creates a directory.
pub fn create_directory<D, T>(driver: &D, name: T) -> Result<(), FileError<D::Error>>
where
    D: StorageDriver,
    T: Into<StoragePath>,
{
    Ok(driver.create_directory(&name.into())?)
}

fn settings_path(name: &str) -> StoragePath {
    StoragePath::from(SETTINGS_DIRECTORY).join(name)
}

/// Stores a number setting, replacing any previous value.
///
/// `name` must be usable as a file name.
pub fn settings_save_number<D>(driver: &D, name: &str, value: f64) -> Result<(), FileError<D::Error>>
where
    D: StorageDriver,
{
    create_directory(driver, SETTINGS_DIRECTORY)?;
    let path = settings_path(name);
    remove(driver, path.clone())?;
    append_number(driver, path, value)
}

/// Reads a number setting. Returns `None` if it was never saved or does not hold a number.
pub fn settings_read_number<D>(driver: &D, name: &str) -> Result<Option<f64>, FileError<D::Error>>
where
    D: StorageDriver,
{
    let path = settings_path(name);
    if !driver.exists(&path)? {
        return Ok(None);
    }
    let content = read_buffer(driver, path)?;
    Ok(std::str::from_utf8(&content)
        .ok()
        .and_then(|text| text.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use std::io::{Error as IoError, ErrorKind, Write};

    use test_case::test_case;

    use super::*;
    use crate::driver::MemoryDriver;

    #[test]
    fn test_open_returns_open_handle() {
        let driver = MemoryDriver::default();
        let mut file = open(&driver, "output.txt").expect("Open failed");
        assert!(file.is_open());
        file.close().expect("Close failed");
    }

    #[test]
    fn test_append_line() {
        let driver = MemoryDriver::default();
        append_line(&driver, "f.txt", "x").expect("Append failed");
        append_line(&driver, "f.txt", "y").expect("Append failed");
        assert_eq!(driver.contents("f.txt"), Some(b"x\r\ny\r\n".to_vec()));
        assert_eq!(driver.open_descriptors(), 0);
    }

    #[test]
    fn test_append_mixed() {
        let driver = MemoryDriver::default();
        append_string(&driver, "log.txt", "t=").expect("Append failed");
        append_number(&driver, "log.txt", 12.0).expect("Append failed");
        append_string(&driver, "log.txt", TAB).expect("Append failed");
        append_buffer(&driver, "log.txt", b"ok").expect("Append failed");
        assert_eq!(driver.contents("log.txt"), Some(b"t=12\tok".to_vec()));
    }

    #[test_case(1.0, "1"; "whole number")]
    #[test_case(-3.0, "-3"; "negative number")]
    #[test_case(2.5, "2.5"; "fraction")]
    #[test_case(0.0, "0"; "zero")]
    fn test_append_number_format(value: f64, expected: &str) {
        let driver = MemoryDriver::default();
        append_number(&driver, "n.txt", value).expect("Append failed");
        assert_eq!(driver.contents("n.txt"), Some(expected.as_bytes().to_vec()));
    }

    #[test]
    fn test_read_buffer_whole_file() {
        let driver = MemoryDriver::default();
        append_string(&driver, "data.txt", "some content").expect("Append failed");
        assert_eq!(
            read_buffer(&driver, "data.txt"),
            Ok(b"some content".to_vec())
        );
        assert_eq!(read_buffer(&driver, "empty.txt"), Ok(Vec::new()));
        assert_eq!(driver.open_descriptors(), 0);
    }

    #[test]
    fn test_read_to_sink() {
        let driver = MemoryDriver::default();
        let content: Vec<u8> = (0..100).collect();
        append_buffer(&driver, "data.bin", &content).expect("Append failed");

        let mut sink = Vec::new();
        assert_eq!(read_to(&driver, "data.bin", &mut sink), Ok(100));
        assert_eq!(sink, content);
        assert_eq!(driver.open_descriptors(), 0);
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(IoError::new(ErrorKind::BrokenPipe, "Sink closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_to_failing_sink_closes_file() {
        let driver = MemoryDriver::default();
        append_string(&driver, "data.txt", "content").expect("Append failed");
        assert_eq!(
            read_to(&driver, "data.txt", BrokenSink),
            Err(FilesError::SinkError(ErrorKind::BrokenPipe))
        );
        assert_eq!(driver.open_descriptors(), 0);
    }

    #[test]
    fn test_remove() {
        let driver = MemoryDriver::default();
        append_string(&driver, "data.txt", "content").expect("Append failed");
        remove(&driver, "data.txt").expect("Remove failed");
        assert_eq!(driver.contents("data.txt"), None);
        remove(&driver, "data.txt").expect("Removing a missing file failed");
    }

    #[test]
    fn test_settings_replace_value() {
        let driver = MemoryDriver::default();
        settings_save_number(&driver, "n", 1.0).expect("Save failed");
        settings_save_number(&driver, "n", 2.0).expect("Save failed");
        assert_eq!(driver.contents("settings/n"), Some(b"2".to_vec()));
        assert_eq!(settings_read_number(&driver, "n"), Ok(Some(2.0)));
    }

    #[test]
    fn test_settings_missing_value() {
        let driver = MemoryDriver::default();
        assert_eq!(settings_read_number(&driver, "volume"), Ok(None));
        assert_eq!(driver.contents("settings/volume"), None);
    }

    #[test]
    fn test_settings_stay_in_settings_directory() {
        let driver = MemoryDriver::default();
        append_string(&driver, "n", "user data").expect("Append failed");
        settings_save_number(&driver, "/n", 5.0).expect("Save failed");
        settings_save_number(&driver, "../n", 6.0).expect("Save failed");

        assert_eq!(driver.contents("n"), Some(b"user data".to_vec()));
        assert_eq!(driver.contents("settings/n"), Some(b"6".to_vec()));
        assert_eq!(settings_read_number(&driver, "/n"), Ok(Some(6.0)));
    }

    #[test]
    fn test_settings_garbage_value() {
        let driver = MemoryDriver::default();
        append_string(&driver, "settings/volume", "loud").expect("Append failed");
        assert_eq!(settings_read_number(&driver, "volume"), Ok(None));
    }
}
