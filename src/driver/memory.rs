use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::convert::TryFrom;

use log::{debug, trace};

use super::StorageDriver;
use crate::config::DriverConfig;
use crate::errors::DriverError;
use crate::util::{Descriptor, DescriptorTable, SeekFlag, StoragePath};

#[derive(Debug)]
struct OpenFile {
    path: StoragePath,
    cursor: u64,
    // Private content of a file removed while still open; it is dropped on close.
    orphan: Option<Vec<u8>>,
}

/// A storage driver keeping every file in memory.
///
/// Writes land in the file immediately, so `flush` only validates the descriptor. Its descriptor
/// table has the configured fixed size, like the table of a flash driver would.
#[derive(Debug)]
pub struct MemoryDriver {
    files: RefCell<BTreeMap<StoragePath, Vec<u8>>>,
    directories: RefCell<BTreeSet<StoragePath>>,
    open_files: RefCell<DescriptorTable<OpenFile>>,
}

impl MemoryDriver {
    /// Create an empty in-memory storage.
    pub fn new(config: DriverConfig) -> Self {
        MemoryDriver {
            files: RefCell::new(BTreeMap::new()),
            directories: RefCell::new(BTreeSet::new()),
            open_files: RefCell::new(DescriptorTable::with_capacity(config.max_descriptors)),
        }
    }

    /// The current content of a file, if it exists.
    pub fn contents<T: Into<StoragePath>>(&self, path: T) -> Option<Vec<u8>> {
        self.files.borrow().get(&path.into()).cloned()
    }

    /// The number of descriptors currently in use.
    pub fn open_descriptors(&self) -> usize {
        self.open_files.borrow().len()
    }

    fn with_open_file<T, F>(&self, descriptor: Descriptor, body: F) -> Result<T, DriverError>
    where
        F: FnOnce(&mut u64, &mut Vec<u8>) -> Result<T, DriverError>,
    {
        let mut open_files = self.open_files.borrow_mut();
        let OpenFile {
            path,
            cursor,
            orphan,
        } = open_files
            .get_mut(descriptor)
            .ok_or(DriverError::BadDescriptor(descriptor))?;
        let mut files = self.files.borrow_mut();
        let data = match orphan {
            Some(data) => data,
            None => files.entry(path.clone()).or_default(),
        };
        body(cursor, data)
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        MemoryDriver::new(DriverConfig::default())
    }
}

fn to_index(position: u64) -> Result<usize, DriverError> {
    usize::try_from(position).map_err(|_| DriverError::FileSystemLimits)
}

impl StorageDriver for MemoryDriver {
    type Error = DriverError;

    fn open(&self, path: &StoragePath) -> Result<Descriptor, DriverError> {
        if path.is_root() || self.directories.borrow().contains(path) {
            return Err(DriverError::IsDirectory(path.clone()));
        }
        let descriptor = self
            .open_files
            .borrow_mut()
            .insert(OpenFile {
                path: path.clone(),
                cursor: 0,
                orphan: None,
            })
            .ok_or(DriverError::TooManyOpenFiles)?;
        self.files.borrow_mut().entry(path.clone()).or_default();
        debug!("Opened '{}' as {}", path, descriptor);
        Ok(descriptor)
    }

    fn seek(&self, descriptor: Descriptor, flag: SeekFlag) -> Result<u64, DriverError> {
        self.with_open_file(descriptor, |cursor, data| {
            let position = flag
                .resolve(*cursor, data.len() as u64)
                .ok_or(DriverError::InvalidSeek)?;
            trace!("Seek {} with {:?} to {}", descriptor, flag, position);
            *cursor = position;
            Ok(position)
        })
    }

    fn read_byte(&self, descriptor: Descriptor) -> Result<Option<u8>, DriverError> {
        self.with_open_file(descriptor, |cursor, data| {
            let value = data.get(to_index(*cursor)?).copied();
            if value.is_some() {
                *cursor += 1;
            }
            Ok(value)
        })
    }

    fn read_buffer(
        &self,
        descriptor: Descriptor,
        max_length: usize,
    ) -> Result<Vec<u8>, DriverError> {
        self.with_open_file(descriptor, |cursor, data| {
            let start = to_index(*cursor)?;
            if start >= data.len() {
                return Ok(Vec::new());
            }
            let end = start + std::cmp::min(max_length, data.len() - start);
            trace!("Read {} bytes from {} at {}", end - start, descriptor, start);
            *cursor = end as u64;
            Ok(data[start..end].to_vec())
        })
    }

    fn write_buffer(&self, descriptor: Descriptor, bytes: &[u8]) -> Result<(), DriverError> {
        self.with_open_file(descriptor, |cursor, data| {
            if bytes.is_empty() {
                return Ok(());
            }
            let start = to_index(*cursor)?;
            let end = start
                .checked_add(bytes.len())
                .ok_or(DriverError::FileSystemLimits)?;
            if end > data.len() {
                data.try_reserve(end - data.len())
                    .map_err(|_| DriverError::FileSystemLimits)?;
                data.resize(end, 0);
            }
            data[start..end].copy_from_slice(bytes);
            trace!("Wrote {} bytes to {} at {}", bytes.len(), descriptor, start);
            *cursor = end as u64;
            Ok(())
        })
    }

    fn flush(&self, descriptor: Descriptor) -> Result<(), DriverError> {
        self.open_files
            .borrow()
            .get(descriptor)
            .map(|_| ())
            .ok_or(DriverError::BadDescriptor(descriptor))
    }

    fn close(&self, descriptor: Descriptor) -> Result<(), DriverError> {
        let open_file = self
            .open_files
            .borrow_mut()
            .remove(descriptor)
            .ok_or(DriverError::BadDescriptor(descriptor))?;
        debug!("Closed {} ('{}')", descriptor, open_file.path);
        Ok(())
    }

    fn remove(&self, path: &StoragePath) -> Result<(), DriverError> {
        if self.files.borrow_mut().remove(path).is_none() {
            return Ok(());
        }
        for open_file in self.open_files.borrow_mut().iter_mut() {
            if open_file.path == *path && open_file.orphan.is_none() {
                open_file.orphan = Some(Vec::new());
            }
        }
        debug!("Removed '{}'", path);
        Ok(())
    }

    fn exists(&self, path: &StoragePath) -> Result<bool, DriverError> {
        Ok(self.files.borrow().contains_key(path))
    }

    fn create_directory(&self, path: &StoragePath) -> Result<(), DriverError> {
        if self.directories.borrow_mut().insert(path.clone()) {
            debug!("Created directory '{}'", path);
        }
        Ok(())
    }
}
