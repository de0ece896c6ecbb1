//! The container table: path→entry store with derived views.
//!
//! A [`Table`] maps unique, insertion-ordered keys to shared entries and
//! derives everything else on demand: the live file list, the directory set,
//! hidden directories and a directory index. Any structural change marks
//! those views stale; they are rebuilt on the next query.
//!
//! # Mutation discipline
//!
//! Callers may hold an [`EntryRef`] across a table call. Every mutator is one
//! of two kinds:
//!
//! - **In place**: the entry the caller holds is changed. [`Table::rename`],
//!   [`Table::rename_folder`], [`Table::merge_folder`],
//!   [`Table::undo_merge_folder`], and the `delete`/`undo_delete` family.
//! - **Clone and replace**: the row gets a new entry and the caller's
//!   reference keeps the old state. [`Table::encrypt_file`],
//!   [`Table::decrypt_file`], [`Table::replace`], and [`Table::add`] with
//!   `overwrite`.
//!
//! Soft deletes are depth counted: a file deleted directly and again through
//! its folder needs two undos before it reappears.
//!
//! # Example
//!
//! ```rust
//! use assetpak::{SearchOption, Table};
//!
//! let mut table = Table::new();
//! table.add_bytes("data/texture/a.bmp", b"a".to_vec(), false)?;
//! table.add_bytes("data/texture/b.bmp", b"b".to_vec(), false)?;
//!
//! table.delete_folder("data\\texture")?;
//! assert!(!table.contains_file("data\\texture\\a.bmp"));
//! assert!(table.contains("data\\texture\\a.bmp"));
//! assert!(table.get_files("data", "*.bmp", SearchOption::AllDirectories, false)?.is_empty());
//!
//! table.undo_delete_folder("data\\texture")?;
//! assert_eq!(table.files().len(), 2);
//! # Ok::<(), assetpak::Error>(())
//! ```
//!
//! # Concurrency
//!
//! Mutators take `&mut self`, so a single writer is enforced by the borrow
//! checker. Readers may share `&Table` across threads; entry data access is
//! guarded per entry.

mod locks;
mod options;
mod rename;
mod views;

use std::ops::Index;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use indexmap::{IndexMap, IndexSet};

use crate::entry::{Entry, EntryRef, EntrySource};
use crate::error::ensure_not_empty;
use crate::path;
use crate::state::Modification;
use crate::validation::Validation;
use crate::{Error, Result};

use locks::FileLocks;
use views::Views;

pub use options::TableOptions;
pub use rename::{MergeResult, MovedEntry};
pub use views::{FileNamePattern, SearchOption};

/// Payload for [`Table::replace`].
#[derive(Debug, Clone)]
pub enum ReplaceSource {
    /// An external file.
    File(PathBuf),
    /// An in-memory buffer.
    Bytes(Arc<[u8]>),
    /// The payload of another entry.
    Entry(EntryRef),
}

impl From<PathBuf> for ReplaceSource {
    fn from(path: PathBuf) -> Self {
        ReplaceSource::File(path)
    }
}

impl From<&Path> for ReplaceSource {
    fn from(path: &Path) -> Self {
        ReplaceSource::File(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ReplaceSource {
    fn from(data: Vec<u8>) -> Self {
        ReplaceSource::Bytes(data.into())
    }
}

impl From<Arc<[u8]>> for ReplaceSource {
    fn from(data: Arc<[u8]>) -> Self {
        ReplaceSource::Bytes(data)
    }
}

impl From<EntryRef> for ReplaceSource {
    fn from(entry: EntryRef) -> Self {
        ReplaceSource::Entry(entry)
    }
}

impl From<&EntryRef> for ReplaceSource {
    fn from(entry: &EntryRef) -> Self {
        ReplaceSource::Entry(Arc::clone(entry))
    }
}

/// Insertion-ordered, unique-key store of a container's entries.
#[derive(Debug)]
pub struct Table {
    entries: IndexMap<String, EntryRef>,
    views: OnceLock<Views>,
    locks: FileLocks,
    options: TableOptions,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalizes a lookup key. Lookups do not validate beyond emptiness.
fn lookup_key(path: &str) -> Result<String> {
    let key = path::normalize(path);
    ensure_not_empty(&key, "path")?;
    Ok(key)
}

impl Table {
    /// Creates an empty table with default options.
    pub fn new() -> Self {
        Self::with_options(TableOptions::default())
    }

    /// Creates an empty table.
    pub fn with_options(options: TableOptions) -> Self {
        Self {
            entries: IndexMap::new(),
            views: OnceLock::new(),
            locks: FileLocks::new(options.lock_files),
            options,
        }
    }

    /// Returns the table's options.
    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    fn views(&self) -> &Views {
        self.views.get_or_init(|| Views::build(&self.entries))
    }

    fn invalidate(&mut self) {
        self.views.take();
    }

    // Lookup

    /// Returns the entry stored at `path`, soft-deleted or not.
    pub fn get(&self, path: &str) -> Option<&EntryRef> {
        self.entries.get(&path::normalize(path))
    }

    /// Returns true if a row exists at `path`, soft-deleted or not.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&path::normalize(path))
    }

    /// Returns true if a live (not soft-deleted) file exists at `path`.
    pub fn contains_file(&self, path: &str) -> bool {
        self.views().file_set.contains(&path::normalize(path))
    }

    /// Finds a live file, optionally ignoring case. The returned entry
    /// carries the table's stored casing.
    pub fn find_file(&self, path: &str, ignore_case: bool) -> Option<&EntryRef> {
        let key = path::normalize(path);
        let stored = self.views().resolve_file(&key, ignore_case)?;
        self.entries.get(stored)
    }

    /// Number of rows, soft-deleted ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all rows in table order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &EntryRef)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    /// Iterates over all entries in table order, soft-deleted ones included.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &EntryRef> {
        self.entries.values()
    }

    /// Live file keys in table order.
    pub fn files(&self) -> &[String] {
        &self.views().files
    }

    /// Every directory that holds an entry, with all its ancestors and the
    /// root `""`.
    pub fn directories(&self) -> &IndexSet<String> {
        &self.views().directories
    }

    /// Directories whose every entry is soft-deleted.
    ///
    /// These names cannot be used as a folder rename or merge destination
    /// until the container is reloaded.
    pub fn hidden_directories(&self) -> &IndexSet<String> {
        &self.views().hidden_directories
    }

    /// Directory → entries directly inside it, soft-deleted ones included.
    pub fn directory_index(&self) -> &IndexMap<String, Vec<EntryRef>> {
        &self.views().directory_index
    }

    /// Returns true if the source file of the staged entry at `path` is
    /// locked.
    pub fn is_locked(&self, path: &str) -> bool {
        self.locks.is_locked(&path::normalize(path))
    }

    /// Number of source files currently locked.
    pub fn locked_count(&self) -> usize {
        self.locks.len()
    }

    /// Lists live file keys under `path`.
    ///
    /// `pattern` is matched against file names; `""` and `"*"` match all.
    /// With `ignore_case`, directory comparison ignores case and results use
    /// the table's stored casing.
    ///
    /// # Errors
    ///
    /// Fails on an invalid folder path or a pattern that does not compile.
    pub fn get_files(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
        ignore_case: bool,
    ) -> Result<Vec<String>> {
        let folder = path::normalize_folder(path)?;
        let pattern = FileNamePattern::new(pattern)?;
        Ok(self.views().get_files(&folder, &pattern, option, ignore_case))
    }

    /// Lists entries under `path`, soft-deleted ones included.
    ///
    /// `None`, or the root with [`SearchOption::AllDirectories`], returns
    /// every entry.
    pub fn entries_in_directory(
        &self,
        path: Option<&str>,
        option: SearchOption,
        ignore_case: bool,
    ) -> Result<Vec<EntryRef>> {
        let Some(path) = path else {
            return Ok(self.entries.values().cloned().collect());
        };
        let folder = path::normalize_folder(path)?;
        if folder.is_empty() && option == SearchOption::AllDirectories {
            return Ok(self.entries.values().cloned().collect());
        }
        if option == SearchOption::TopDirectoryOnly && !ignore_case {
            return Ok(self
                .views()
                .directory_index
                .get(&folder)
                .cloned()
                .unwrap_or_default());
        }
        Ok(self
            .entries
            .iter()
            .filter(|(key, _)| option.matches(path::split(key).0, &folder, ignore_case))
            .map(|(_, entry)| Arc::clone(entry))
            .collect())
    }

    fn entries_in_folder(&self, folder: &str) -> Vec<EntryRef> {
        self.entries
            .iter()
            .filter(|(key, _)| path::is_in_directory(path::split(key).0, folder, false))
            .map(|(_, entry)| Arc::clone(entry))
            .collect()
    }

    // Staging

    /// Stores `entry` at `key`, displacing any previous row in place.
    fn put(&mut self, key: String, entry: EntryRef) -> Option<EntryRef> {
        let displaced = self.entries.insert(key.clone(), Arc::clone(&entry));
        if displaced.is_some() {
            self.locks.release(&key);
        }
        self.locks.acquire_staged(&entry);
        self.invalidate();
        displaced
    }

    fn stage(&mut self, entry: Entry, overwrite: bool) -> Option<EntryRef> {
        let key = entry.relative_path();
        if !overwrite && self.entries.contains_key(&key) {
            log::debug!("Skipped staging {}: key is occupied", key);
            return None;
        }
        log::debug!("Staged {}", key);
        self.put(key, Arc::new(entry))
    }

    /// Stages an addition backed by `source_file`.
    ///
    /// If `path` is free the entry is inserted and its source locked. If it
    /// is taken and `overwrite` is false, nothing happens and `None` is
    /// returned; check [`contains`](Self::contains) beforehand to tell this
    /// apart from a fresh insert. With `overwrite`, the row is replaced and
    /// the displaced entry returned.
    pub fn add(
        &mut self,
        path: &str,
        source_file: impl Into<PathBuf>,
        overwrite: bool,
    ) -> Result<Option<EntryRef>> {
        let entry = Entry::staged_file(path, source_file, Arc::clone(&self.options.codec))?;
        Ok(self.stage(entry, overwrite))
    }

    /// Stages an addition backed by an in-memory buffer. Same conflict policy
    /// as [`add`](Self::add).
    pub fn add_bytes(
        &mut self,
        path: &str,
        data: impl Into<Arc<[u8]>>,
        overwrite: bool,
    ) -> Result<Option<EntryRef>> {
        let entry = Entry::staged_bytes(path, data, Arc::clone(&self.options.codec))?;
        Ok(self.stage(entry, overwrite))
    }

    /// Stages `source` at `directory\name`, always winning over an existing
    /// row. Returns the displaced entry.
    ///
    /// Clone and replace: a caller holding the displaced entry keeps it
    /// unchanged.
    pub fn replace(
        &mut self,
        directory: &str,
        source: impl Into<ReplaceSource>,
        name: &str,
    ) -> Result<Option<EntryRef>> {
        let directory = path::normalize_folder(directory)?;
        ensure_not_empty(name, "name")?;
        let key = path::normalize_checked(&path::join(&directory, name))?;
        let codec = Arc::clone(&self.options.codec);

        let entry = match source.into() {
            ReplaceSource::File(source) => Entry::staged_file(&key, source, codec)?,
            ReplaceSource::Bytes(data) => Entry::staged_bytes(&key, data, codec)?,
            ReplaceSource::Entry(other) => other.restaged(key.clone()),
        };
        log::debug!("Replaced {}", key);
        Ok(self.put(key, Arc::new(entry)))
    }

    /// Stages a record telling a patch consumer to delete `path`. Returns the
    /// displaced entry.
    pub fn add_file_to_remove(&mut self, path: &str) -> Result<Option<EntryRef>> {
        let entry = Entry::removal_marker(path, Arc::clone(&self.options.codec))?;
        let key = entry.relative_path();
        log::debug!("Staged removal marker {}", key);
        Ok(self.put(key, Arc::new(entry)))
    }

    /// Inserts an entry read from an existing container's table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NameAlreadyExists`] for a duplicate key.
    pub fn insert_parsed(&mut self, entry: Entry) -> Result<EntryRef> {
        let key = entry.relative_path();
        if self.entries.contains_key(&key) {
            return Err(Error::name_exists(key));
        }
        let entry = Arc::new(entry);
        self.locks.acquire_staged(&entry);
        self.entries.insert(key, Arc::clone(&entry));
        self.invalidate();
        Ok(entry)
    }

    // Soft delete

    /// Soft-deletes the entry at `path` (in place).
    ///
    /// The row stays reachable through [`get`](Self::get); file queries no
    /// longer see it. Deletes nest: each one needs its own undo.
    pub fn delete_file(&mut self, path: &str) -> Result<()> {
        let key = lookup_key(path)?;
        let entry = self
            .entries
            .get(&key)
            .ok_or_else(|| Error::file_not_found(&key))?;
        entry.mark_removed();
        self.locks.release(&key);
        log::debug!("Deleted {} (depth {})", key, entry.removed_count());
        self.invalidate();
        Ok(())
    }

    /// Undoes one soft delete of the entry at `path` (in place).
    ///
    /// The entry reappears once every delete has been undone; a staged file
    /// addition then gets its source locked again. Undoing an entry that is
    /// not deleted does nothing.
    pub fn undo_delete_file(&mut self, path: &str) -> Result<()> {
        let key = lookup_key(path)?;
        let entry = self
            .entries
            .get(&key)
            .ok_or_else(|| Error::file_not_found(&key))?;
        if !entry.unmark_removed() {
            log::warn!("Ignored undo delete of {}: entry is not deleted", key);
            return Ok(());
        }
        self.locks.acquire_staged(entry);
        log::debug!("Undid delete of {} (depth {})", key, entry.removed_count());
        self.invalidate();
        Ok(())
    }

    /// Soft-deletes every entry at or below `path` (in place). Returns the
    /// number of entries touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] if no entry lies under `path`.
    pub fn delete_folder(&mut self, path: &str) -> Result<usize> {
        let folder = path::normalize_folder(path)?;
        let targets = self.entries_in_folder(&folder);
        if targets.is_empty() {
            return Err(Error::FolderNotFound { path: folder });
        }
        for entry in &targets {
            entry.mark_removed();
            self.locks.release(&entry.relative_path());
        }
        log::debug!("Deleted folder {} ({} entries)", folder, targets.len());
        self.invalidate();
        Ok(targets.len())
    }

    /// Undoes one soft delete of every entry at or below `path` (in place).
    /// Returns the number of entries whose depth went down.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] if no entry lies under `path`.
    pub fn undo_delete_folder(&mut self, path: &str) -> Result<usize> {
        let folder = path::normalize_folder(path)?;
        let targets = self.entries_in_folder(&folder);
        if targets.is_empty() {
            return Err(Error::FolderNotFound { path: folder });
        }
        let mut undone = 0;
        for entry in &targets {
            if entry.unmark_removed() {
                undone += 1;
                self.locks.acquire_staged(entry);
            }
        }
        log::debug!("Undid delete of folder {} ({} entries)", folder, undone);
        self.invalidate();
        Ok(undone)
    }

    // Encryption

    /// Marks the entry at `path` for encryption on save.
    ///
    /// Clone and replace: returns the entry as it was before the call.
    pub fn encrypt_file(&mut self, path: &str) -> Result<EntryRef> {
        self.set_encryption(path, Modification::ENCRYPT)
    }

    /// Marks the entry at `path` for decryption on save.
    ///
    /// Clone and replace: returns the entry as it was before the call.
    pub fn decrypt_file(&mut self, path: &str) -> Result<EntryRef> {
        self.set_encryption(path, Modification::DECRYPT)
    }

    fn set_encryption(&mut self, path: &str, flag: Modification) -> Result<EntryRef> {
        let key = lookup_key(path)?;
        let slot = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| Error::file_not_found(&key))?;
        let copy = Entry::clone(&**slot);
        copy.set_encryption(flag);
        let previous = std::mem::replace(slot, Arc::new(copy));
        log::debug!("Set {:?} on {}", flag, key);
        self.invalidate();
        Ok(previous)
    }

    // Hard removal

    /// Removes the row at `path` and returns its entry.
    pub fn remove_file(&mut self, path: &str) -> Result<EntryRef> {
        let key = lookup_key(path)?;
        let entry = self
            .entries
            .shift_remove(&key)
            .ok_or_else(|| Error::file_not_found(&key))?;
        self.locks.release(&key);
        log::debug!("Removed {}", key);
        self.invalidate();
        Ok(entry)
    }

    /// Removes `entry` from the table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] unless `entry` itself is the row stored
    /// at its key.
    pub fn delete_entry(&mut self, entry: &EntryRef) -> Result<()> {
        let key = entry.relative_path();
        match self.entries.get(&key) {
            Some(stored) if Arc::ptr_eq(stored, entry) => {}
            _ => return Err(Error::file_not_found(key)),
        }
        self.remove_file(&key).map(|_| ())
    }

    /// Removes every row and releases every lock.
    pub fn clear(&mut self) {
        log::debug!("Clearing table with {} entries", self.entries.len());
        self.entries.clear();
        self.locks.clear();
        self.invalidate();
    }

    /// Decompresses every live archive-resident entry and checks it against
    /// its recorded size and checksum.
    ///
    /// Faults are collected rather than returned at the first one.
    pub fn verify(&self) -> Validation {
        let mut validation = Validation::new();
        for entry in self.entries.values() {
            if entry.is_removed() || !matches!(entry.source(), EntrySource::Archive(_)) {
                continue;
            }
            let Some(data) = validation.record(entry.decompressed_data()) else {
                continue;
            };
            let path = entry.relative_path();

            if let Some(expected) = entry.size_decompressed() {
                if data.len() as u64 != expected {
                    validation.add_fault(Error::corrupted(
                        path,
                        format!("expected {} bytes, got {}", expected, data.len()),
                    ));
                    continue;
                }
            }

            if let Some(expected) = entry.crc32() {
                let actual = crc32fast::hash(&data);
                if actual != expected {
                    validation.add_fault(Error::ChecksumFailed {
                        path,
                        expected,
                        actual,
                    });
                }
            }
        }
        if !validation.is_valid() {
            log::warn!("Verification found {} faults", validation.len());
        }
        validation
    }
}

/// Exact-key lookup.
///
/// # Panics
///
/// Panics if no row exists at the key. Use [`Table::get`] to avoid this.
impl Index<&str> for Table {
    type Output = EntryRef;

    fn index(&self, path: &str) -> &EntryRef {
        match self.get(path) {
            Some(entry) => entry,
            None => panic!("no entry at {}", path),
        }
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a EntryRef;
    type IntoIter = indexmap::map::Values<'a, String, EntryRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::codec::{Codec, StoreCodec, ZlibCodec};
    use crate::entry::MemoryReader;

    fn store_table() -> Table {
        Table::with_options(TableOptions::new().codec(Arc::new(StoreCodec)))
    }

    fn table_with(paths: &[&str]) -> Table {
        let mut table = store_table();
        for p in paths {
            table.add_bytes(p, p.as_bytes().to_vec(), false).unwrap();
        }
        table
    }

    fn archived(path: &str, payload: &[u8]) -> Entry {
        let codec = ZlibCodec::default();
        let compressed = codec.compress(payload).unwrap();
        let size = compressed.len() as u64;
        Entry::archived(
            path,
            0,
            size,
            Some(payload.len() as u64),
            Arc::new(MemoryReader::new(compressed)),
            Arc::new(codec),
        )
        .unwrap()
    }

    #[test]
    fn test_add_keeps_first_entry() {
        let mut table = store_table();
        assert!(table.add_bytes("a.txt", vec![1], false).unwrap().is_none());
        let first = Arc::clone(&table["a.txt"]);
        assert!(table.add_bytes("a.txt", vec![2], false).unwrap().is_none());
        assert!(Arc::ptr_eq(&first, &table["a.txt"]));
    }

    #[test]
    fn test_add_overwrite_returns_displaced() {
        let mut table = store_table();
        table.add_bytes("a.txt", vec![1], false).unwrap();
        let first = Arc::clone(&table["a.txt"]);
        let displaced = table.add_bytes("a.txt", vec![2], true).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &displaced));
        assert_eq!(table["a.txt"].decompressed_data().unwrap(), vec![2]);
    }

    #[test]
    fn test_lookup_normalizes() {
        let table = table_with(&["data/a.txt"]);
        assert!(table.contains("data\\a.txt"));
        assert!(table.contains("/data/a.txt"));
        assert!(table.get("data\\b.txt").is_none());
    }

    #[test]
    fn test_soft_delete_keeps_row() {
        let mut table = table_with(&["a.txt"]);
        table.delete_file("a.txt").unwrap();
        assert!(table.contains("a.txt"));
        assert!(!table.contains_file("a.txt"));
        assert!(table["a.txt"].is_removed());
        assert!(table.files().is_empty());
        table.undo_delete_file("a.txt").unwrap();
        assert!(table.contains_file("a.txt"));
    }

    #[test]
    fn test_delete_missing_file() {
        let mut table = store_table();
        let err = table.delete_file("a.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(table.delete_file("").unwrap_err().kind(), ErrorKind::EmptyPath);
    }

    #[test]
    fn test_undo_on_live_entry_is_noop() {
        let mut table = table_with(&["a.txt"]);
        table.undo_delete_file("a.txt").unwrap();
        assert_eq!(table["a.txt"].removed_count(), 0);
        assert!(table.contains_file("a.txt"));
    }

    #[test]
    fn test_nested_file_and_folder_delete() {
        let mut table = table_with(&["d\\a.txt", "d\\b.txt"]);
        table.delete_file("d\\a.txt").unwrap();
        assert_eq!(table.delete_folder("d").unwrap(), 2);
        assert_eq!(table["d\\a.txt"].removed_count(), 2);

        assert_eq!(table.undo_delete_folder("d").unwrap(), 2);
        assert!(table.contains_file("d\\b.txt"));
        assert!(!table.contains_file("d\\a.txt"));

        table.undo_delete_file("d\\a.txt").unwrap();
        assert!(table.contains_file("d\\a.txt"));
    }

    #[test]
    fn test_delete_folder_component_boundary() {
        let mut table = table_with(&["data\\a.txt", "database\\b.txt"]);
        assert_eq!(table.delete_folder("data").unwrap(), 1);
        assert!(table.contains_file("database\\b.txt"));
        let err = table.delete_folder("nothing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FolderNotFound);
    }

    #[test]
    fn test_encrypt_is_clone_and_replace() {
        let mut table = table_with(&["data\\x.txt"]);
        let before = table.encrypt_file("data\\x.txt").unwrap();
        assert!(!before.modification().contains(Modification::ENCRYPT));
        let current = Arc::clone(&table["data\\x.txt"]);
        assert!(!Arc::ptr_eq(&before, &current));
        assert!(current.modification().contains(Modification::ENCRYPT));
        assert!(!current.modification().contains(Modification::DECRYPT));

        let encrypted = table.decrypt_file("data\\x.txt").unwrap();
        assert!(Arc::ptr_eq(&encrypted, &current));
        let current = &table["data\\x.txt"];
        assert!(current.modification().contains(Modification::DECRYPT));
        assert!(!current.modification().contains(Modification::ENCRYPT));
    }

    #[test]
    fn test_replace_with_bytes_and_entry() {
        let mut table = table_with(&["a\\x.txt"]);
        let original = Arc::clone(&table["a\\x.txt"]);
        let displaced = table.replace("a", vec![9u8], "x.txt").unwrap().unwrap();
        assert!(Arc::ptr_eq(&original, &displaced));
        assert_eq!(table["a\\x.txt"].decompressed_data().unwrap(), vec![9]);

        assert!(table.replace("b", &original, "copy.txt").unwrap().is_none());
        let copy = &table["b\\copy.txt"];
        assert!(copy.is_added());
        assert_eq!(copy.decompressed_data().unwrap(), b"a\\x.txt");
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut table = table_with(&["a.txt", "b.txt", "c.txt"]);
        table.replace("", vec![0u8], "b.txt").unwrap();
        let keys: Vec<_> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_file_to_remove_marker() {
        let mut table = store_table();
        assert!(table.add_file_to_remove("old\\a.txt").unwrap().is_none());
        let marker = &table["old\\a.txt"];
        assert!(marker.is_removal_marker());
        assert!(marker.compressed_data().unwrap().is_empty());
    }

    #[test]
    fn test_remove_file_and_delete_entry() {
        let mut table = table_with(&["a.txt", "b.txt"]);
        let a = table.remove_file("a.txt").unwrap();
        assert_eq!(a.relative_path(), "a.txt");
        assert!(!table.contains("a.txt"));
        assert_eq!(table.delete_entry(&a).unwrap_err().kind(), ErrorKind::FileNotFound);

        let b = Arc::clone(&table["b.txt"]);
        table.delete_entry(&b).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_parsed_rejects_duplicates() {
        let mut table = store_table();
        table.insert_parsed(archived("a.txt", b"abc")).unwrap();
        let err = table.insert_parsed(archived("a.txt", b"abc")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameAlreadyExists);
    }

    #[test]
    fn test_directories_cover_every_entry() {
        let mut table = table_with(&["a\\b\\c.txt", "d.txt"]);
        table.delete_file("a\\b\\c.txt").unwrap();
        for entry in table.entries() {
            assert!(table.directories().contains(&entry.directory_path()));
        }
        assert!(table.hidden_directories().contains("a\\b"));
        assert!(table.hidden_directories().contains("a"));
    }

    #[test]
    fn test_get_files_options() {
        let table = table_with(&["data\\a.bmp", "data\\sub\\b.bmp", "data\\c.txt", "x.bmp"]);
        let top = table
            .get_files("data", "*.bmp", SearchOption::TopDirectoryOnly, false)
            .unwrap();
        assert_eq!(top, vec!["data\\a.bmp"]);
        let all = table
            .get_files("data", "*.BMP", SearchOption::AllDirectories, false)
            .unwrap();
        assert_eq!(all, vec!["data\\a.bmp", "data\\sub\\b.bmp"]);
        let ignore_case = table
            .get_files("DATA", "", SearchOption::TopDirectoryOnly, true)
            .unwrap();
        assert_eq!(ignore_case, vec!["data\\a.bmp", "data\\c.txt"]);
    }

    #[test]
    fn test_entries_in_directory() {
        let mut table = table_with(&["a\\x.txt", "a\\b\\y.txt", "z.txt"]);
        table.delete_file("a\\x.txt").unwrap();
        assert_eq!(table.entries_in_directory(None, SearchOption::TopDirectoryOnly, false).unwrap().len(), 3);
        assert_eq!(table.entries_in_directory(Some(""), SearchOption::AllDirectories, false).unwrap().len(), 3);
        assert_eq!(table.entries_in_directory(Some(""), SearchOption::TopDirectoryOnly, false).unwrap().len(), 1);
        assert_eq!(table.entries_in_directory(Some("a"), SearchOption::TopDirectoryOnly, false).unwrap().len(), 1);
        assert_eq!(table.entries_in_directory(Some("A"), SearchOption::AllDirectories, true).unwrap().len(), 2);
        assert!(table.entries_in_directory(Some("A"), SearchOption::AllDirectories, false).unwrap().is_empty());
    }

    #[test]
    fn test_find_file_ignore_case() {
        let table = table_with(&["Data\\A.txt"]);
        let entry = table.find_file("data\\a.TXT", true).unwrap();
        assert_eq!(entry.relative_path(), "Data\\A.txt");
        assert!(table.find_file("data\\a.TXT", false).is_none());
    }

    #[test]
    fn test_get_files_rejects_invalid_folder() {
        let table = table_with(&["a.txt"]);
        assert!(table.get_files("", "*.txt", SearchOption::AllDirectories, false).is_ok());
        assert_eq!(
            table.get_files("a*b", "", SearchOption::AllDirectories, false).unwrap_err().kind(),
            ErrorKind::InvalidCharacters
        );
    }

    #[test]
    fn test_verify() {
        let mut table = store_table();
        let good = archived("good.txt", b"payload");
        let crc = crc32fast::hash(b"payload");
        table.insert_parsed(good.with_crc32(crc)).unwrap();
        table.insert_parsed(archived("bad.txt", b"payload").with_crc32(crc ^ 1)).unwrap();
        let truncated = Entry::archived(
            "short.txt",
            0,
            7,
            Some(100),
            Arc::new(MemoryReader::new(b"payload".to_vec())),
            Arc::new(StoreCodec),
        )
        .unwrap();
        table.insert_parsed(truncated).unwrap();
        table.add_bytes("staged.txt", vec![1], false).unwrap();

        let validation = table.verify();
        let kinds: Vec<_> = validation
            .faults()
            .iter()
            .map(|f| f.error().unwrap().kind())
            .collect();
        assert_eq!(kinds, vec![ErrorKind::ChecksumFailed, ErrorKind::CorruptedEntry]);
    }

    #[test]
    fn test_locks_follow_staging() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.bin");
        std::fs::write(&source, b"x").unwrap();

        let mut table = Table::with_options(TableOptions::new().lock_files(true));
        table.add("a.bin", &source, false).unwrap();
        assert!(table.is_locked("a.bin"));

        table.delete_file("a.bin").unwrap();
        assert!(!table.is_locked("a.bin"));
        table.undo_delete_file("a.bin").unwrap();
        assert!(table.is_locked("a.bin"));

        table.replace("", vec![1u8], "a.bin").unwrap();
        assert!(!table.is_locked("a.bin"));

        table.add("b.bin", &source, false).unwrap();
        table.remove_file("b.bin").unwrap();
        assert_eq!(table.locked_count(), 0);
    }

    #[test]
    fn test_locking_disabled_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.bin");
        std::fs::write(&source, b"x").unwrap();
        let mut table = Table::new();
        table.add("a.bin", &source, false).unwrap();
        assert!(!table.is_locked("a.bin"));
    }

    #[test]
    fn test_clear() {
        let mut table = table_with(&["a.txt", "b\\c.txt"]);
        assert_eq!(table.directories().len(), 2);
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.directories().len(), 1);
    }

    #[test]
    fn test_table_is_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Table>();
    }
}
