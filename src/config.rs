/// Tunables shared by the storage drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Number of bytes stored per chunk. Zero selects the default.
    pub chunk_size: usize,
    /// Size of the descriptor table, i.e. how many files may be open at once.
    pub max_descriptors: usize,
}

impl DriverConfig {
    /// Default chunk size, one flash page.
    pub const DEFAULT_CHUNK_SIZE: usize = 4096;
    /// Default number of descriptors.
    pub const DEFAULT_MAX_DESCRIPTORS: usize = 8;

    /// Set the chunk size.
    pub fn with_chunk_size(self, chunk_size: usize) -> Self {
        DriverConfig { chunk_size, ..self }
    }

    /// Set the size of the descriptor table.
    pub fn with_max_descriptors(self, max_descriptors: usize) -> Self {
        DriverConfig {
            max_descriptors,
            ..self
        }
    }

    /// The chunk size to use, never exceeding `limit`. Zero selects the default.
    pub(crate) fn effective_chunk_size(&self, limit: usize) -> usize {
        let limit = limit.max(1);
        match self.chunk_size {
            0 => std::cmp::min(DriverConfig::DEFAULT_CHUNK_SIZE, limit),
            value => std::cmp::min(value, limit),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            chunk_size: DriverConfig::DEFAULT_CHUNK_SIZE,
            max_descriptors: DriverConfig::DEFAULT_MAX_DESCRIPTORS,
        }
    }
}
