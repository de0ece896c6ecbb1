//! Save-pass records.
//!
//! A rebuild pass lays out the new container, stages each entry's new
//! position in [`Entry::temporary_offset`](super::Entry::temporary_offset)
//! and [`Entry::temporary_size_compressed_alignment`](super::Entry::temporary_size_compressed_alignment),
//! then asks every entry for an [`EntryRecord`] to serialize. The byte layout
//! of the table itself belongs to the format crate.

use crate::state::EntryFlags;
use crate::{Error, Result};

/// Oldest supported major version.
pub const MIN_MAJOR_VERSION: u8 = 1;

/// Newest supported major version.
pub const MAX_MAJOR_VERSION: u8 = 3;

/// Version information of the container being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl RecordHeader {
    /// Creates a header for the given version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] for major versions outside
    /// [`MIN_MAJOR_VERSION`]..=[`MAX_MAJOR_VERSION`].
    pub fn new(major: u8, minor: u8) -> Result<Self> {
        if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&major) {
            return Err(Error::UnsupportedVersion { major, minor });
        }
        Ok(Self { major, minor })
    }

    /// Returns true if the table stores 64-bit offsets.
    pub fn uses_64bit_offsets(&self) -> bool {
        self.major >= 3
    }

    /// Returns true if entries may be stored encrypted.
    pub fn supports_encryption(&self) -> bool {
        self.major <= 2
    }
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self { major: 2, minor: 0 }
    }
}

/// Denormalized table record for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// Table key.
    pub path: String,
    /// Record kind.
    pub flags: EntryFlags,
    /// Offset in the container being replaced.
    pub offset: u64,
    /// Compressed size in the container being replaced.
    pub size_compressed: u64,
    /// Compressed size padded to the cipher block size.
    pub size_compressed_aligned: u64,
    /// Decompressed size; 0 when unknown.
    pub size_decompressed: u64,
    /// Stored checksum of the decompressed bytes.
    pub crc32: Option<u32>,
    /// Offset in the container being written.
    pub new_offset: u64,
    /// Aligned compressed size in the container being written.
    pub new_size_compressed: u64,
    /// Whether the data is written encrypted.
    pub encrypted: bool,
}
