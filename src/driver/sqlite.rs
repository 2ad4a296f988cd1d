use std::borrow::BorrowMut;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::convert::TryFrom;

use log::{debug, trace};
use rusqlite::limits::Limit;
use rusqlite::{params, Connection as Database, DatabaseName, OptionalExtension};

use super::StorageDriver;
use crate::config::DriverConfig;
use crate::errors::{DriverError, LoadingError};
use crate::util::{Availability, Descriptor, DescriptorTable, MetaData, SeekFlag, StoragePath};

mod constants {
    use const_format::formatcp;

    pub const CURRENT_LAYOUT_VERSION: u32 = 0;
    pub const META_TABLE: &str = "Flash_Meta_0";
    pub const DATA_TABLE: &str = "Flash_Data";

    // Room left in a data row for its header and the integer columns next to the blob.
    pub const CHUNK_RECORD_OVERHEAD: usize = 64;

    pub const FILE_ID: i64 = 0;
    pub const DIRECTORY_ID: i64 = 1;

    pub const SQL_CREATE_META: &str = formatcp!(
        "CREATE TABLE {} (id INTEGER PRIMARY KEY, path TEXT UNIQUE NOT NULL, type INTEGER, chunk_size INTEGER NOT NULL)",
        META_TABLE
    );
    pub const SQL_CREATE_DATA: &str = formatcp!(
        "CREATE TABLE IF NOT EXISTS {} (chunk_id INTEGER PRIMARY KEY, file_id INTEGER NOT NULL, chunk_num INTEGER NOT NULL, data BLOB NOT NULL, CONSTRAINT unq UNIQUE (file_id, chunk_num))",
        DATA_TABLE
    );
    pub const SQL_GET_ENTRY: &str = formatcp!(
        "SELECT id, type, chunk_size FROM {} WHERE path = ?",
        META_TABLE
    );
    pub const SQL_CREATE_ENTRY: &str = formatcp!(
        "INSERT INTO {} (path, type, chunk_size) VALUES (?, ?, ?)",
        META_TABLE
    );
    pub const SQL_CREATE_DIRECTORY: &str = formatcp!(
        "INSERT OR IGNORE INTO {} (path, type, chunk_size) VALUES (?, {}, 0)",
        META_TABLE,
        DIRECTORY_ID
    );
    pub const SQL_EXISTS: &str = formatcp!(
        "SELECT id FROM {} WHERE path = ? AND type = {}",
        META_TABLE,
        FILE_ID
    );
    pub const SQL_SIZE: &str = formatcp!(
        "SELECT COALESCE(MAX(chunk_num * ? + LENGTH(data)), 0) FROM {} WHERE file_id = ?",
        DATA_TABLE
    );
    pub const SQL_GET_CHUNK: &str = formatcp!(
        "SELECT chunk_id FROM {} WHERE file_id = ? AND chunk_num = ?",
        DATA_TABLE
    );
    pub const SQL_STORE_CHUNK: &str = formatcp!(
        "INSERT INTO {} (file_id, chunk_num, data) VALUES (?, ?, ?) ON CONFLICT (file_id, chunk_num) DO UPDATE SET data = excluded.data",
        DATA_TABLE
    );
    pub const SQL_DELETE_DATA: &str = formatcp!(
        "DELETE FROM {data} WHERE file_id IN (SELECT id FROM {meta} WHERE path = ? AND type = {file})",
        data = DATA_TABLE,
        meta = META_TABLE,
        file = FILE_ID
    );
    pub const SQL_DELETE_ENTRY: &str = formatcp!(
        "DELETE FROM {} WHERE path = ? AND type = {}",
        META_TABLE,
        FILE_ID
    );
}

/// A file opened through a descriptor. Modified chunks are kept here until they are flushed.
#[derive(Debug)]
struct OpenFile {
    file_id: i64,
    chunk_size: u64,
    cursor: u64,
    dirty: BTreeMap<u64, Vec<u8>>,
    // Set once the file is removed while still open; nothing is stored for it anymore.
    orphaned: bool,
}

impl OpenFile {
    fn chunk_range(&self, start: u64, end: u64) -> std::ops::RangeInclusive<u64> {
        (start / self.chunk_size)..=((end - 1) / self.chunk_size)
    }

    fn dirty_length(&self) -> u64 {
        self.dirty
            .iter()
            .map(|(chunk_num, data)| chunk_num * self.chunk_size + data.len() as u64)
            .max()
            .unwrap_or(0)
    }
}

/// A storage driver persisting files in a SQLite database.
///
/// Every file is split into chunks of a fixed size, each stored as a blob. Writes through a
/// descriptor are cached per chunk and only reach the database on `flush` or `close`.
#[derive(Debug)]
pub struct SqliteDriver<D> {
    database: D,
    meta_data: MetaData,
    chunk_size: usize,
    open_files: RefCell<DescriptorTable<OpenFile>>,
}

impl<D> SqliteDriver<D>
where
    D: BorrowMut<Database>,
{
    /// Load the storage from an SQLite database, creating its tables if requested.
    pub fn load(
        mut database: D,
        create_file_system: bool,
        config: DriverConfig,
    ) -> Result<SqliteDriver<D>, LoadingError> {
        let meta_data = match MetaData::from_database(database.borrow()) {
            Availability::Available(meta_data)
                if meta_data.version() == constants::CURRENT_LAYOUT_VERSION =>
            {
                Ok(meta_data)
            }
            Availability::Available(meta_data) => {
                Err(LoadingError::UnsupportedVersion(meta_data.version()))
            }
            Availability::Missing if create_file_system => {
                let transaction = database.borrow_mut().transaction()?;
                transaction.execute(constants::SQL_CREATE_META, [])?;
                transaction.execute(constants::SQL_CREATE_DATA, [])?;
                transaction.commit()?;
                debug!(
                    "Created storage layout version {}",
                    constants::CURRENT_LAYOUT_VERSION
                );
                Ok(MetaData::from_version(constants::CURRENT_LAYOUT_VERSION))
            }
            Availability::Missing => Err(LoadingError::NoFileSystem),
            Availability::Error(error) => Err(error.into()),
        }?;

        // Pre-compile the primary SQL commands
        const PRECOMPILED_COMMANDS: [&str; 9] = [
            constants::SQL_GET_ENTRY,
            constants::SQL_CREATE_ENTRY,
            constants::SQL_CREATE_DIRECTORY,
            constants::SQL_EXISTS,
            constants::SQL_SIZE,
            constants::SQL_GET_CHUNK,
            constants::SQL_STORE_CHUNK,
            constants::SQL_DELETE_DATA,
            constants::SQL_DELETE_ENTRY,
        ];

        database
            .borrow()
            .set_prepared_statement_cache_capacity(PRECOMPILED_COMMANDS.len());
        for statement in PRECOMPILED_COMMANDS.iter().copied() {
            database
                .borrow()
                .prepare_cached(statement)
                .map_err(|error| LoadingError::InvalidBaseCommand(statement, error.into()))?;
        }

        let max_blob_size = database.borrow().limit(Limit::SQLITE_LIMIT_LENGTH);
        let chunk_size = config.effective_chunk_size(
            (max_blob_size.max(0) as usize).saturating_sub(constants::CHUNK_RECORD_OVERHEAD),
        );

        Ok(SqliteDriver {
            database,
            meta_data,
            chunk_size,
            open_files: RefCell::new(DescriptorTable::with_capacity(config.max_descriptors)),
        })
    }

    /// Returns the version of the storage layout in use.
    pub fn version(&self) -> u32 {
        self.meta_data.version()
    }

    /// Gives the database back, e.g. to close it explicitly.
    pub fn into_inner(self) -> D {
        self.database
    }

    fn database(&self) -> &Database {
        self.database.borrow()
    }

    fn with_open_file<T, F>(&self, descriptor: Descriptor, body: F) -> Result<T, DriverError>
    where
        F: FnOnce(&Database, &mut OpenFile) -> Result<T, DriverError>,
    {
        let mut open_files = self.open_files.borrow_mut();
        let open_file = open_files
            .get_mut(descriptor)
            .ok_or(DriverError::BadDescriptor(descriptor))?;
        body(self.database(), open_file)
    }
}

fn to_sql_integer(value: u64) -> Result<i64, DriverError> {
    i64::try_from(value).map_err(|_| DriverError::FileSystemLimits)
}

fn stored_length(database: &Database, open_file: &OpenFile) -> Result<u64, DriverError> {
    if open_file.orphaned {
        return Ok(0);
    }
    let length: i64 = database.prepare_cached(constants::SQL_SIZE)?.query_row(
        params![to_sql_integer(open_file.chunk_size)?, open_file.file_id],
        |row| row.get(0),
    )?;
    Ok(length.max(0) as u64)
}

fn file_length(database: &Database, open_file: &OpenFile) -> Result<u64, DriverError> {
    Ok(std::cmp::max(
        stored_length(database, open_file)?,
        open_file.dirty_length(),
    ))
}

/// Fetch a chunk, preferring the cached version. Missing chunks are empty.
fn load_chunk(
    database: &Database,
    open_file: &OpenFile,
    chunk_num: u64,
) -> Result<Vec<u8>, DriverError> {
    if let Some(data) = open_file.dirty.get(&chunk_num) {
        return Ok(data.clone());
    }
    if open_file.orphaned {
        return Ok(Vec::new());
    }

    let chunk_id: Option<i64> = database
        .prepare_cached(constants::SQL_GET_CHUNK)?
        .query_row(
            params![open_file.file_id, to_sql_integer(chunk_num)?],
            |row| row.get(0),
        )
        .optional()?;
    let chunk_id = match chunk_id {
        Some(chunk_id) => chunk_id,
        None => return Ok(Vec::new()),
    };

    let blob = database.blob_open(
        DatabaseName::Main,
        constants::DATA_TABLE,
        "data",
        chunk_id,
        true,
    )?;
    let mut data = vec![0u8; blob.size().max(0) as usize];
    blob.read_at_exact(&mut data, 0)?;
    Ok(data)
}

/// Copy the bytes in `start..end` into a buffer. Holes in the file read as zero.
fn read_range(
    database: &Database,
    open_file: &OpenFile,
    start: u64,
    end: u64,
) -> Result<Vec<u8>, DriverError> {
    let mut buffer = vec![0u8; (end - start) as usize];
    if start == end {
        return Ok(buffer);
    }
    for chunk_num in open_file.chunk_range(start, end) {
        let chunk = load_chunk(database, open_file, chunk_num)?;
        let chunk_start = chunk_num * open_file.chunk_size;
        let from = std::cmp::max(start, chunk_start);
        let to = std::cmp::min(end, chunk_start + chunk.len() as u64);
        if from < to {
            let source = &chunk[(from - chunk_start) as usize..(to - chunk_start) as usize];
            buffer[(from - start) as usize..(to - start) as usize].copy_from_slice(source);
        }
    }
    Ok(buffer)
}

fn flush_open_file(database: &Database, open_file: &mut OpenFile) -> Result<(), DriverError> {
    if open_file.dirty.is_empty() {
        return Ok(());
    }
    if open_file.orphaned {
        open_file.dirty.clear();
        return Ok(());
    }

    let transaction = database.unchecked_transaction()?;
    {
        let mut store_statement = transaction.prepare_cached(constants::SQL_STORE_CHUNK)?;
        for (chunk_num, data) in &open_file.dirty {
            store_statement.execute(params![
                open_file.file_id,
                to_sql_integer(*chunk_num)?,
                data
            ])?;
        }
    }
    transaction.commit()?;

    debug!(
        "Flushed {} chunks of file {}",
        open_file.dirty.len(),
        open_file.file_id
    );
    open_file.dirty.clear();
    Ok(())
}

impl<D> StorageDriver for SqliteDriver<D>
where
    D: BorrowMut<Database>,
{
    type Error = DriverError;

    fn open(&self, path: &StoragePath) -> Result<Descriptor, DriverError> {
        if path.is_root() {
            return Err(DriverError::IsDirectory(path.clone()));
        }
        // Refuse before the entry is created, so a failed open leaves no file behind.
        if self.open_files.borrow().is_full() {
            return Err(DriverError::TooManyOpenFiles);
        }
        let database = self.database();
        let entry: Option<(i64, i64, i64)> = database
            .prepare_cached(constants::SQL_GET_ENTRY)?
            .query_row(params![path.as_ref()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;

        let (file_id, chunk_size) = match entry {
            Some((_, constants::DIRECTORY_ID, _)) => {
                return Err(DriverError::IsDirectory(path.clone()))
            }
            Some((file_id, _, chunk_size)) => (file_id, chunk_size),
            None => {
                let chunk_size = self.chunk_size as i64;
                let file_id = database
                    .prepare_cached(constants::SQL_CREATE_ENTRY)?
                    .insert(params![path.as_ref(), constants::FILE_ID, chunk_size])?;
                debug!("Created '{}' as file {}", path, file_id);
                (file_id, chunk_size)
            }
        };

        let descriptor = self
            .open_files
            .borrow_mut()
            .insert(OpenFile {
                file_id,
                chunk_size: std::cmp::max(chunk_size, 1) as u64,
                cursor: 0,
                dirty: BTreeMap::new(),
                orphaned: false,
            })
            .ok_or(DriverError::TooManyOpenFiles)?;
        debug!("Opened '{}' as {}", path, descriptor);
        Ok(descriptor)
    }

    fn seek(&self, descriptor: Descriptor, flag: SeekFlag) -> Result<u64, DriverError> {
        self.with_open_file(descriptor, |database, open_file| {
            let length = match flag {
                SeekFlag::End(_) => file_length(database, open_file)?,
                _ => 0,
            };
            let position = flag
                .resolve(open_file.cursor, length)
                .ok_or(DriverError::InvalidSeek)?;
            trace!("Seek {} with {:?} to {}", descriptor, flag, position);
            open_file.cursor = position;
            Ok(position)
        })
    }

    fn read_byte(&self, descriptor: Descriptor) -> Result<Option<u8>, DriverError> {
        self.read_buffer(descriptor, 1)
            .map(|data| data.first().copied())
    }

    fn read_buffer(
        &self,
        descriptor: Descriptor,
        max_length: usize,
    ) -> Result<Vec<u8>, DriverError> {
        self.with_open_file(descriptor, |database, open_file| {
            let start = open_file.cursor;
            let length = file_length(database, open_file)?;
            if start >= length {
                return Ok(Vec::new());
            }
            let end = std::cmp::min(length, start.saturating_add(max_length as u64));
            let data = read_range(database, open_file, start, end)?;
            trace!("Read {} bytes from {} at {}", data.len(), descriptor, start);
            open_file.cursor = end;
            Ok(data)
        })
    }

    fn write_buffer(&self, descriptor: Descriptor, bytes: &[u8]) -> Result<(), DriverError> {
        self.with_open_file(descriptor, |database, open_file| {
            if bytes.is_empty() {
                return Ok(());
            }
            let start = open_file.cursor;
            let end = start
                .checked_add(bytes.len() as u64)
                .ok_or(DriverError::FileSystemLimits)?;
            to_sql_integer(end)?;

            for chunk_num in open_file.chunk_range(start, end) {
                let mut chunk = load_chunk(database, open_file, chunk_num)?;
                let chunk_start = chunk_num * open_file.chunk_size;
                let from = std::cmp::max(start, chunk_start);
                let to = std::cmp::min(end, chunk_start + open_file.chunk_size);
                let local_end = (to - chunk_start) as usize;
                if chunk.len() < local_end {
                    chunk.resize(local_end, 0);
                }
                chunk[(from - chunk_start) as usize..local_end]
                    .copy_from_slice(&bytes[(from - start) as usize..(to - start) as usize]);
                open_file.dirty.insert(chunk_num, chunk);
            }

            trace!("Wrote {} bytes to {} at {}", bytes.len(), descriptor, start);
            open_file.cursor = end;
            Ok(())
        })
    }

    fn flush(&self, descriptor: Descriptor) -> Result<(), DriverError> {
        self.with_open_file(descriptor, |database, open_file| {
            flush_open_file(database, open_file)
        })
    }

    fn close(&self, descriptor: Descriptor) -> Result<(), DriverError> {
        let mut open_file = self
            .open_files
            .borrow_mut()
            .remove(descriptor)
            .ok_or(DriverError::BadDescriptor(descriptor))?;
        // The descriptor is released even if persisting the last writes fails.
        flush_open_file(self.database(), &mut open_file)?;
        debug!("Closed {} (file {})", descriptor, open_file.file_id);
        Ok(())
    }

    fn remove(&self, path: &StoragePath) -> Result<(), DriverError> {
        let database = self.database();
        let file_id: Option<i64> = database
            .prepare_cached(constants::SQL_EXISTS)?
            .query_row(params![path.as_ref()], |row| row.get(0))
            .optional()?;
        let file_id = match file_id {
            Some(file_id) => file_id,
            None => return Ok(()),
        };

        let transaction = database.unchecked_transaction()?;
        transaction
            .prepare_cached(constants::SQL_DELETE_DATA)?
            .execute(params![path.as_ref()])?;
        transaction
            .prepare_cached(constants::SQL_DELETE_ENTRY)?
            .execute(params![path.as_ref()])?;
        transaction.commit()?;

        for open_file in self.open_files.borrow_mut().iter_mut() {
            if open_file.file_id == file_id {
                open_file.orphaned = true;
                open_file.dirty.clear();
            }
        }
        debug!("Removed '{}' (file {})", path, file_id);
        Ok(())
    }

    fn exists(&self, path: &StoragePath) -> Result<bool, DriverError> {
        let file_id: Option<i64> = self
            .database()
            .prepare_cached(constants::SQL_EXISTS)?
            .query_row(params![path.as_ref()], |row| row.get(0))
            .optional()?;
        Ok(file_id.is_some())
    }

    fn create_directory(&self, path: &StoragePath) -> Result<(), DriverError> {
        let created = self
            .database()
            .prepare_cached(constants::SQL_CREATE_DIRECTORY)?
            .execute(params![path.as_ref()])?;
        if created > 0 {
            debug!("Created directory '{}'", path);
        }
        Ok(())
    }
}
