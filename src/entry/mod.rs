//! Entries: one file of a container.
//!
//! An [`Entry`] holds a file's table metadata and knows where its bytes come
//! from. Exactly one [`EntrySource`] supplies them:
//!
//! - [`EntrySource::Archive`]: compressed bytes at [`Entry::offset`] in the
//!   opened container, read through a shared [`BackingReader`]
//! - [`EntrySource::File`]: an external file staged for addition
//! - [`EntrySource::Memory`]: an in-memory buffer staged for addition
//!
//! Entries are shared as [`EntryRef`] (`Arc<Entry>`). Metadata that the table
//! edits in place (path, soft-delete state, save-pass fields) lives behind a
//! lock inside the entry, so a caller holding an `EntryRef` observes renames
//! and deletions. Edits that must not be observed (encryption toggles,
//! replacements) clone the entry instead.
//!
//! # Concurrency
//!
//! Reading an archive-resident entry takes the entry's private data lock, so
//! at most one codec call runs per entry at a time. Staged entries do not
//! share the container's cursor and are read without it.

mod reader;
mod record;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::codec::Codec;
use crate::path;
use crate::state::{EntryFlags, Modification};
use crate::{Error, Result};

pub use reader::{BackingReader, MemoryReader, SharedReader};
pub use record::{EntryRecord, MAX_MAJOR_VERSION, MIN_MAJOR_VERSION, RecordHeader};

/// Shared handle to an entry. Identity is `Arc::ptr_eq`.
pub type EntryRef = Arc<Entry>;

/// Where an entry's bytes come from.
#[derive(Debug, Clone)]
pub enum EntrySource {
    /// Compressed bytes inside the opened container.
    Archive(Arc<dyn BackingReader>),
    /// Uncompressed bytes in an external file.
    File(PathBuf),
    /// Uncompressed bytes in memory.
    Memory(Arc<[u8]>),
}

#[derive(Debug, Clone)]
struct PathNames {
    directory: String,
    file_name: String,
}

#[derive(Debug, Clone)]
struct EntryMeta {
    relative_path: String,
    names: OnceLock<PathNames>,
    offset: u64,
    size_compressed: u64,
    size_compressed_aligned: u64,
    size_decompressed: Option<u64>,
    crc32: Option<u32>,
    flags: EntryFlags,
    modification: Modification,
    removed_count: u32,
    temporary_offset: u64,
    temporary_size_compressed_alignment: u64,
}

impl EntryMeta {
    fn new(relative_path: String) -> Self {
        Self {
            relative_path,
            names: OnceLock::new(),
            offset: 0,
            size_compressed: 0,
            size_compressed_aligned: 0,
            size_decompressed: None,
            crc32: None,
            flags: EntryFlags::FILE,
            modification: Modification::empty(),
            removed_count: 0,
            temporary_offset: 0,
            temporary_size_compressed_alignment: 0,
        }
    }

    fn names(&self) -> &PathNames {
        self.names.get_or_init(|| {
            let (directory, file_name) = path::split(&self.relative_path);
            PathNames {
                directory: directory.to_string(),
                file_name: file_name.to_string(),
            }
        })
    }

    fn set_path(&mut self, relative_path: String) {
        self.relative_path = relative_path;
        self.names = OnceLock::new();
    }
}

/// One file record of a container table.
pub struct Entry {
    meta: RwLock<EntryMeta>,
    source: EntrySource,
    codec: Arc<dyn Codec>,
    data_lock: Mutex<()>,
}

impl Entry {
    fn with_meta(meta: EntryMeta, source: EntrySource, codec: Arc<dyn Codec>) -> Self {
        Self {
            meta: RwLock::new(meta),
            source,
            codec,
            data_lock: Mutex::new(()),
        }
    }

    /// Creates an entry for data inside an opened container.
    ///
    /// Used by format crates while parsing a container's table.
    pub fn archived(
        relative_path: &str,
        offset: u64,
        size_compressed: u64,
        size_decompressed: Option<u64>,
        reader: Arc<dyn BackingReader>,
        codec: Arc<dyn Codec>,
    ) -> Result<Self> {
        let mut meta = EntryMeta::new(path::normalize_checked(relative_path)?);
        meta.offset = offset;
        meta.size_compressed = size_compressed;
        meta.size_compressed_aligned = size_compressed;
        meta.size_decompressed = size_decompressed;
        Ok(Self::with_meta(meta, EntrySource::Archive(reader), codec))
    }

    /// Creates a staged addition backed by an external file.
    pub fn staged_file(
        relative_path: &str,
        source: impl Into<PathBuf>,
        codec: Arc<dyn Codec>,
    ) -> Result<Self> {
        let source = source.into();
        let mut meta = EntryMeta::new(path::normalize_checked(relative_path)?);
        meta.modification = Modification::ADDED;
        meta.size_decompressed = fs::metadata(&source).ok().map(|m| m.len());
        Ok(Self::with_meta(meta, EntrySource::File(source), codec))
    }

    /// Creates a staged addition backed by an in-memory buffer.
    pub fn staged_bytes(
        relative_path: &str,
        data: impl Into<Arc<[u8]>>,
        codec: Arc<dyn Codec>,
    ) -> Result<Self> {
        let data = data.into();
        let mut meta = EntryMeta::new(path::normalize_checked(relative_path)?);
        meta.modification = Modification::ADDED;
        meta.size_decompressed = Some(data.len() as u64);
        Ok(Self::with_meta(meta, EntrySource::Memory(data), codec))
    }

    /// Creates a record telling a patch consumer to delete `relative_path`.
    pub fn removal_marker(relative_path: &str, codec: Arc<dyn Codec>) -> Result<Self> {
        let mut meta = EntryMeta::new(path::normalize_checked(relative_path)?);
        meta.modification = Modification::ADDED;
        meta.flags = EntryFlags::REMOVE_FILE;
        meta.size_decompressed = Some(0);
        Ok(Self::with_meta(
            meta,
            EntrySource::Memory(Arc::from(Vec::new())),
            codec,
        ))
    }

    /// Sets the stored checksum of the decompressed bytes.
    pub fn with_crc32(self, crc32: u32) -> Self {
        self.meta.write().crc32 = Some(crc32);
        self
    }

    /// Sets the compressed size padded to the cipher block size.
    pub fn with_size_compressed_aligned(self, size: u64) -> Self {
        self.meta.write().size_compressed_aligned = size;
        self
    }

    /// Sets the record kind.
    pub fn with_flags(self, flags: EntryFlags) -> Self {
        self.meta.write().flags = flags;
        self
    }

    /// Duplicates this entry under a new key as a staged addition sharing
    /// the same payload.
    pub(crate) fn restaged(&self, relative_path: String) -> Self {
        let copy = self.clone();
        {
            let mut meta = copy.meta.write();
            meta.set_path(relative_path);
            meta.modification = Modification::ADDED
                | (meta.modification & (Modification::ENCRYPT | Modification::DECRYPT));
            meta.removed_count = 0;
        }
        copy
    }

    /// Returns the table key.
    pub fn relative_path(&self) -> String {
        self.meta.read().relative_path.clone()
    }

    /// Returns the directory part of the key (empty at the root).
    pub fn directory_path(&self) -> String {
        self.meta.read().names().directory.clone()
    }

    /// Returns the file name part of the key.
    pub fn file_name(&self) -> String {
        self.meta.read().names().file_name.clone()
    }

    /// Offset of the compressed bytes in the opened container.
    pub fn offset(&self) -> u64 {
        self.meta.read().offset
    }

    /// Compressed size in the opened container.
    pub fn size_compressed(&self) -> u64 {
        self.meta.read().size_compressed
    }

    /// Compressed size padded to the cipher block size.
    pub fn size_compressed_aligned(&self) -> u64 {
        self.meta.read().size_compressed_aligned
    }

    /// Decompressed size, if known.
    pub fn size_decompressed(&self) -> Option<u64> {
        self.meta.read().size_decompressed
    }

    /// Stored checksum of the decompressed bytes, if any.
    pub fn crc32(&self) -> Option<u32> {
        self.meta.read().crc32
    }

    /// Record kind.
    pub fn flags(&self) -> EntryFlags {
        self.meta.read().flags
    }

    /// Pending changes.
    pub fn modification(&self) -> Modification {
        self.meta.read().modification
    }

    /// How many overlapping soft-deletes are in effect.
    pub fn removed_count(&self) -> u32 {
        self.meta.read().removed_count
    }

    /// Returns true if the entry is soft-deleted.
    pub fn is_removed(&self) -> bool {
        self.modification().contains(Modification::REMOVED)
    }

    /// Returns true if the entry is a staged addition.
    pub fn is_added(&self) -> bool {
        self.modification().contains(Modification::ADDED)
    }

    /// Returns true if this is a removal marker.
    pub fn is_removal_marker(&self) -> bool {
        self.flags().contains(EntryFlags::REMOVE_FILE)
    }

    /// Where the bytes come from.
    pub fn source(&self) -> &EntrySource {
        &self.source
    }

    /// The external file backing this entry, if any.
    pub fn source_file_path(&self) -> Option<&Path> {
        match &self.source {
            EntrySource::File(path) => Some(path),
            _ => None,
        }
    }

    /// Returns true if this is a live staged addition backed by an external
    /// file, i.e. one whose source should be locked.
    pub fn is_staged_file(&self) -> bool {
        let modification = self.modification();
        matches!(self.source, EntrySource::File(_))
            && modification.contains(Modification::ADDED)
            && !modification.contains(Modification::REMOVED)
    }

    /// The entry's codec.
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    /// Offset staged by the current save pass.
    pub fn temporary_offset(&self) -> u64 {
        self.meta.read().temporary_offset
    }

    /// Stages the offset for the current save pass.
    pub fn set_temporary_offset(&self, offset: u64) {
        self.meta.write().temporary_offset = offset;
    }

    /// Aligned compressed size staged by the current save pass.
    pub fn temporary_size_compressed_alignment(&self) -> u64 {
        self.meta.read().temporary_size_compressed_alignment
    }

    /// Stages the aligned compressed size for the current save pass.
    pub fn set_temporary_size_compressed_alignment(&self, size: u64) {
        self.meta.write().temporary_size_compressed_alignment = size;
    }

    pub(crate) fn set_relative_path(&self, relative_path: String) {
        self.meta.write().set_path(relative_path);
    }

    pub(crate) fn set_encryption(&self, flag: Modification) {
        let mut meta = self.meta.write();
        meta.modification = meta.modification.with_encryption(flag);
    }

    /// Adds one soft-delete level.
    pub(crate) fn mark_removed(&self) {
        let mut meta = self.meta.write();
        meta.removed_count = meta.removed_count.saturating_add(1);
        meta.modification |= Modification::REMOVED;
    }

    /// Undoes one soft-delete level. Returns false if the entry was not
    /// removed.
    pub(crate) fn unmark_removed(&self) -> bool {
        let mut meta = self.meta.write();
        if meta.removed_count == 0 {
            return false;
        }
        meta.removed_count -= 1;
        if meta.removed_count == 0 {
            meta.modification.remove(Modification::REMOVED);
        }
        true
    }

    /// Reads and decompresses the entry's bytes.
    ///
    /// Staged entries are returned as stored. Archive-resident entries are
    /// decompressed with the entry's codec while holding the entry's data
    /// lock.
    pub fn decompressed_data(&self) -> Result<Vec<u8>> {
        match &self.source {
            EntrySource::File(source) => Ok(fs::read(source)?),
            EntrySource::Memory(data) => Ok(data.to_vec()),
            EntrySource::Archive(reader) => {
                let _guard = self.data_lock.lock();
                let compressed = self.read_archived(reader.as_ref())?;
                self.codec
                    .decompress(&compressed, self.size_decompressed())
            }
        }
    }

    /// Returns the entry's bytes as they will be stored in the container.
    ///
    /// Removal markers have no data and return an empty buffer. Staged
    /// entries are compressed with the entry's codec.
    pub fn compressed_data(&self) -> Result<Vec<u8>> {
        if self.is_removal_marker() {
            return Ok(Vec::new());
        }
        match &self.source {
            EntrySource::File(source) => self.codec.compress(&fs::read(source)?),
            EntrySource::Memory(data) => self.codec.compress(data),
            EntrySource::Archive(reader) => {
                let _guard = self.data_lock.lock();
                self.read_archived(reader.as_ref())
            }
        }
    }

    fn read_archived(&self, reader: &dyn BackingReader) -> Result<Vec<u8>> {
        let (path, offset, size) = {
            let meta = self.meta.read();
            (meta.relative_path.clone(), meta.offset, meta.size_compressed)
        };
        let end = offset.checked_add(size);
        if let (Some(total), Some(end)) = (reader.size(), end) {
            if end > total {
                return Err(Error::InvalidOffset { path, offset });
            }
        }
        let len = usize::try_from(size).map_err(|_| Error::InvalidOffset { path, offset })?;
        reader.read_at(offset, len)
    }

    /// Writes the decompressed bytes to `destination`, creating parent
    /// directories as needed.
    ///
    /// Entries backed by an external file are copied directly.
    pub fn extract_to(&self, destination: impl AsRef<Path>) -> Result<()> {
        let destination = destination.as_ref();
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        match &self.source {
            EntrySource::File(source) => {
                fs::copy(source, destination)?;
            }
            _ => fs::write(destination, self.decompressed_data()?)?,
        }
        Ok(())
    }

    /// Builds the record a save pass writes for this entry.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidOffset`] if `header` stores 32-bit offsets and the
    ///   staged offset does not fit
    /// - [`Error::EncryptionUnsupported`] if the entry is pending encryption
    ///   and `header` does not support it
    pub fn to_persistable_record(&self, header: &RecordHeader) -> Result<EntryRecord> {
        let meta = self.meta.read();

        if !header.uses_64bit_offsets() && meta.temporary_offset > u64::from(u32::MAX) {
            return Err(Error::InvalidOffset {
                path: meta.relative_path.clone(),
                offset: meta.temporary_offset,
            });
        }

        let encrypted = meta.modification.contains(Modification::ENCRYPT);
        if encrypted && !header.supports_encryption() {
            return Err(Error::EncryptionUnsupported {
                major: header.major,
                minor: header.minor,
            });
        }

        Ok(EntryRecord {
            path: meta.relative_path.clone(),
            flags: meta.flags,
            offset: meta.offset,
            size_compressed: meta.size_compressed,
            size_compressed_aligned: meta.size_compressed_aligned,
            size_decompressed: meta.size_decompressed.unwrap_or(0),
            crc32: meta.crc32,
            new_offset: meta.temporary_offset,
            new_size_compressed: meta.temporary_size_compressed_alignment,
            encrypted,
        })
    }
}

/// Produces a fully independent duplicate: same metadata and payload
/// source, fresh locks.
impl Clone for Entry {
    fn clone(&self) -> Self {
        Self::with_meta(
            self.meta.read().clone(),
            self.source.clone(),
            Arc::clone(&self.codec),
        )
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = self.meta.read();
        f.debug_struct("Entry")
            .field("relative_path", &meta.relative_path)
            .field("flags", &meta.flags)
            .field("modification", &meta.modification)
            .field("removed_count", &meta.removed_count)
            .field("offset", &meta.offset)
            .field("size_compressed", &meta.size_compressed)
            .field("size_decompressed", &meta.size_decompressed)
            .field("codec", &self.codec.name())
            .finish_non_exhaustive()
    }
}
