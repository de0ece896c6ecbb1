//! Read handles held on the external sources of staged additions.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use crate::entry::Entry;

/// Path→open read handle map.
///
/// While a handle is held the source cannot be deleted on Windows, where the
/// file is opened with a read-only share mode. Elsewhere the handle keeps the
/// inode alive. Locking is best effort: failures are logged and ignored.
#[derive(Debug, Default)]
pub(crate) struct FileLocks {
    enabled: bool,
    handles: HashMap<String, File>,
}

impl FileLocks {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            handles: HashMap::new(),
        }
    }

    /// Opens `source` and holds it under `key`, replacing any previous handle.
    pub(crate) fn acquire(&mut self, key: &str, source: &Path) {
        if !self.enabled {
            return;
        }
        match open_shared_read(source) {
            Ok(file) => {
                log::debug!("Locked '{}' for {}", source.display(), key);
                self.handles.insert(key.to_string(), file);
            }
            Err(e) => {
                log::warn!("Failed to lock '{}' for {}: {}", source.display(), key, e);
            }
        }
    }

    /// Locks the source of `entry` if it is a live staged file addition.
    pub(crate) fn acquire_staged(&mut self, entry: &Entry) {
        if !entry.is_staged_file() {
            return;
        }
        if let Some(source) = entry.source_file_path() {
            self.acquire(&entry.relative_path(), source);
        }
    }

    /// Closes the handle held under `key`. Returns false if there was none.
    pub(crate) fn release(&mut self, key: &str) -> bool {
        let released = self.handles.remove(key).is_some();
        if released {
            log::debug!("Released lock for {}", key);
        }
        released
    }

    /// Moves a held handle to a new key.
    pub(crate) fn rekey(&mut self, old: &str, new: &str) {
        if let Some(file) = self.handles.remove(old) {
            self.handles.insert(new.to_string(), file);
        }
    }

    /// Moves several handles at once. Keys may overlap between the old and
    /// new sides.
    pub(crate) fn rekey_many<'a>(&mut self, moves: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let taken: Vec<(String, File)> = moves
            .into_iter()
            .filter_map(|(old, new)| self.handles.remove(old).map(|file| (new.to_string(), file)))
            .collect();
        self.handles.extend(taken);
    }

    pub(crate) fn is_locked(&self, key: &str) -> bool {
        self.handles.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn clear(&mut self) {
        if !self.handles.is_empty() {
            log::debug!("Releasing {} file locks", self.handles.len());
        }
        self.handles.clear();
    }
}

#[cfg(windows)]
fn open_shared_read(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_SHARE_READ: u32 = 0x0000_0001;
    OpenOptions::new()
        .read(true)
        .share_mode(FILE_SHARE_READ)
        .open(path)
}

#[cfg(not(windows))]
fn open_shared_read(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}
