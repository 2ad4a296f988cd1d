use const_format::concatcp;
use regex::Regex;
use rusqlite::Connection as Database;
use rusqlite::Error as WrappedError;

/// Meta data describing the storage layout found in a SQLite database.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq)]
pub struct MetaData(u32);

/// The availability of a storage layout in a SQLite database.
#[derive(Debug, PartialEq)]
pub enum Availability {
    /// There is a storage layout available.
    Available(MetaData),
    /// There is no storage layout available.
    Missing,
    /// During querying, there was an SQLite error.
    Error(WrappedError),
}

impl MetaData {
    /// The prefix of the table holding the file entries, followed by the layout version.
    pub const META_TABLE_PREFIX: &'static str = "Flash_Meta_";

    /// Create a meta data directly for a specific version.
    pub const fn from_version(version: u32) -> Self {
        MetaData(version)
    }

    /// Queries a database for the most recent layout version available.
    pub fn from_database(database: &Database) -> Availability {
        let mut statement = match database
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name LIKE ?")
        {
            Ok(statement) => statement,
            Err(error) => return Availability::Error(error),
        };

        let tables = match statement.query(&[concatcp!(MetaData::META_TABLE_PREFIX, "%")]) {
            Ok(tables) => tables,
            Err(error) => return Availability::Error(error),
        };

        let extractor = VersionExtractor::default();
        let mut latest: Option<MetaData> = None;
        let names = tables.mapped(|row| row.get::<_, String>(0));
        for name in names {
            match name {
                Ok(name) => {
                    if let Some(version) = extractor.extract(&name) {
                        latest = latest.max(Some(MetaData(version)));
                    }
                }
                Err(error) => return Availability::Error(error),
            }
        }

        match latest {
            Some(meta_data) => Availability::Available(meta_data),
            None => Availability::Missing,
        }
    }

    /// Returns the version of the storage layout.
    pub fn version(&self) -> u32 {
        self.0
    }

    /// Returns the name of the meta table for this version.
    #[cfg(test)]
    pub fn table_name(&self) -> String {
        format!("{}{}", MetaData::META_TABLE_PREFIX, self.0)
    }
}

/// Extracts the layout version from the name of a meta table.
#[derive(Debug, Clone)]
struct VersionExtractor(Regex);

impl Default for VersionExtractor {
    fn default() -> Self {
        VersionExtractor(
            Regex::new(concatcp!("^", MetaData::META_TABLE_PREFIX, "([0-9]+)$"))
                .expect("Encountered invalid layout RegEx"),
        )
    }
}

impl VersionExtractor {
    fn extract<T: AsRef<str>>(&self, value: T) -> Option<u32> {
        self.0
            .captures(value.as_ref())
            .and_then(|captures| captures.get(1))
            .and_then(|version| version.as_str().parse().ok())
    }
}
