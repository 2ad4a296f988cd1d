use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Component, Path};

#[derive(Debug, Clone, PartialOrd, Ord, Hash)]
/// A path in the flat storage namespace. It is always normalized, `/`-separated and valid Unicode.
pub struct StoragePath(String);

impl StoragePath {
    /// Generates a storage path from a given argument. By default, simply use the "Into" trait.
    pub fn from<T: AsRef<Path>>(value: T) -> Self {
        value.into()
    }

    /// Appends a name below this path, e.g. `settings` and `volume` become `settings/volume`.
    ///
    /// The name is always relative to this path: a leading `/` or surplus `..` cannot leave it.
    pub fn join<T: AsRef<Path>>(&self, name: T) -> Self {
        let name = StoragePath::from(name);
        if self.is_root() {
            name
        } else if name.is_root() {
            self.clone()
        } else {
            StoragePath(format!("{}/{}", self.0, name.0))
        }
    }

    /// Checks whether the path names the root of the namespace.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> From<T> for StoragePath
where
    T: AsRef<Path>,
{
    fn from(path: T) -> Self {
        let mut parts: Vec<String> = Vec::new();
        for component in path.as_ref().components() {
            match component {
                // Invalid Unicode is replaced rather than dropped, so it never aliases the parent.
                Component::Normal(raw_part) => {
                    parts.push(raw_part.to_string_lossy().into_owned());
                }
                Component::ParentDir => {
                    parts.pop();
                }
                _ => {}
            }
        }

        StoragePath(parts.join("/"))
    }
}

impl AsRef<str> for StoragePath {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for StoragePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl<T> PartialEq<T> for StoragePath
where
    T: AsRef<str>,
{
    fn eq(&self, other: &T) -> bool {
        self.0.as_str() == other.as_ref()
    }
}

impl Eq for StoragePath {}
