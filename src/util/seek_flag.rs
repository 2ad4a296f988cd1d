use std::convert::TryFrom;

/// How a seek offset is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFlag {
    /// Absolute offset from the start of the file.
    Set(u64),
    /// Offset relative to the current position.
    Current(i64),
    /// Offset relative to the end of the file. `End(0)` moves to the end.
    End(i64),
}

impl SeekFlag {
    /// Resolve the target position given the current cursor and file length.
    ///
    /// Returns `None` if the target lies before the start of the file or does not fit.
    pub fn resolve(self, current: u64, length: u64) -> Option<u64> {
        let (base, offset) = match self {
            SeekFlag::Set(position) => return Some(position),
            SeekFlag::Current(offset) => (current, offset),
            SeekFlag::End(offset) => (length, offset),
        };
        let target = i128::from(base) + i128::from(offset);
        u64::try_from(target).ok()
    }
}
