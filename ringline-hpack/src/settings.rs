//! Header table sizing shared by the compressor and decompressor.

/// Table size both sides start from before any size update.
pub const DEFAULT_HEADER_TABLE_SIZE: usize = 4096;

/// Header compression parameters for one direction of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Table size in effect before the first size update. Default 4096.
    pub header_table_size: usize,
    /// Ceiling for size updates. For a compressor this is what the peer
    /// allows; for a decompressor it is what we advertised. Default 4096.
    pub max_header_table_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_table_size: DEFAULT_HEADER_TABLE_SIZE,
            max_header_table_size: DEFAULT_HEADER_TABLE_SIZE,
        }
    }
}

impl Settings {
    /// Start from `size`, keeping the ceiling at least at the default.
    pub fn with_header_table_size(size: usize) -> Self {
        Self {
            header_table_size: size,
            max_header_table_size: size.max(DEFAULT_HEADER_TABLE_SIZE),
        }
    }

    /// Starting size, clamped to the ceiling.
    pub(crate) fn initial_table_size(&self) -> usize {
        self.header_table_size.min(self.max_header_table_size)
    }
}
