use std::convert::TryFrom;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A raw descriptor to a file opened by a storage driver.
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq, Ord, Hash)]
pub struct Descriptor(pub i64);

impl Descriptor {
    pub(crate) fn from_slot(slot: usize) -> Self {
        Descriptor(slot as i64)
    }

    /// The slot in a descriptor table this descriptor refers to, if it could be one.
    pub(crate) fn slot(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl From<i64> for Descriptor {
    fn from(raw_value: i64) -> Self {
        Descriptor(raw_value)
    }
}

impl Display for Descriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}
