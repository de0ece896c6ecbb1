//! Renaming entries and moving whole folders.

use std::sync::Arc;

use indexmap::IndexMap;

use super::Table;
use crate::entry::EntryRef;
use crate::error::{ensure_distinct, ensure_not_empty};
use crate::path;
use crate::{Error, Result};

/// An entry moved by [`Table::merge_folder`].
#[derive(Debug, Clone)]
pub struct MovedEntry {
    /// Key before the merge.
    pub from: String,
    /// Key after the merge.
    pub to: String,
    /// The moved entry.
    pub entry: EntryRef,
}

/// Outcome of [`Table::merge_folder`], consumed by
/// [`Table::undo_merge_folder`].
#[must_use = "the merge result is needed to undo the merge"]
#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    /// Displaced entries with their former table positions.
    conflicts: Vec<(usize, EntryRef)>,
    moved: Vec<MovedEntry>,
}

impl MergeResult {
    /// Entries that occupied a destination key and were displaced.
    pub fn conflicts(&self) -> impl ExactSizeIterator<Item = &EntryRef> {
        self.conflicts.iter().map(|(_, entry)| entry)
    }

    /// Returns true if the merge displaced any entry.
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Entries that were moved, in table order.
    pub fn moved(&self) -> &[MovedEntry] {
        &self.moved
    }
}

/// Keys a folder move would change.
struct FolderMove {
    /// Old key → new key for every entry under the source folder.
    renames: IndexMap<String, String>,
    /// Destination keys held by entries that are not moving.
    occupied: Vec<String>,
}

impl Table {
    /// Renames the entry at `old_path` (in place) and keeps its position.
    ///
    /// Callers holding the entry see the new path. If `new_path` is taken
    /// and `overwrite_if_exists` is false, nothing changes. With
    /// `overwrite_if_exists`, the occupant is removed and returned.
    ///
    /// # Errors
    ///
    /// - [`Error::IdenticalPaths`] if both paths are the same
    /// - [`Error::FileNotFound`] if `old_path` does not exist
    /// - [`Error::NameAlreadyExists`] if `new_path` is taken and
    ///   `overwrite_if_exists` is false
    pub fn rename(
        &mut self,
        old_path: &str,
        new_path: &str,
        overwrite_if_exists: bool,
    ) -> Result<Option<EntryRef>> {
        let old = path::normalize(old_path);
        ensure_not_empty(&old, "old path")?;
        let new = path::normalize_checked(new_path)?;
        ensure_distinct(&old, &new)?;
        if !self.entries.contains_key(&old) {
            return Err(Error::file_not_found(old));
        }

        let displaced = if self.entries.contains_key(&new) {
            if !overwrite_if_exists {
                return Err(Error::name_exists(new));
            }
            self.locks.release(&new);
            self.entries.shift_remove(&new)
        } else {
            None
        };

        let (index, _, entry) = self
            .entries
            .shift_remove_full(&old)
            .ok_or_else(|| Error::file_not_found(&old))?;
        entry.set_relative_path(new.clone());
        self.entries.shift_insert(index, new.clone(), entry);
        self.locks.rekey(&old, &new);

        log::debug!("Renamed {} to {}", old, new);
        self.invalidate();
        Ok(displaced)
    }

    /// Moves every entry under `old_folder` to `new_folder` (in place).
    /// Returns the number of entries moved.
    ///
    /// Each key has its leading `old_folder` replaced with `new_folder`. The
    /// move is checked in full before anything changes.
    ///
    /// # Errors
    ///
    /// - [`Error::IdenticalPaths`] if both folders are the same
    /// - [`Error::DestinationIsSubfolder`] if `new_folder` is inside
    ///   `old_folder`
    /// - [`Error::DestinationTypeMismatch`] if a file exists at `new_folder`
    /// - [`Error::HiddenFolderConflict`] if `new_folder` was emptied by a
    ///   deletion
    /// - [`Error::FolderNotFound`] if nothing lies under `old_folder`
    /// - [`Error::NameAlreadyExists`] if a destination key is taken
    pub fn rename_folder(&mut self, old_folder: &str, new_folder: &str) -> Result<usize> {
        let plan = self.plan_folder_move(old_folder, new_folder)?;
        if let Some(key) = plan.occupied.first() {
            return Err(Error::name_exists(key));
        }
        let (_, moved) = self.apply_folder_move(&plan);
        log::debug!(
            "Renamed folder {} to {} ({} entries)",
            old_folder,
            new_folder,
            moved.len()
        );
        Ok(moved.len())
    }

    /// Moves every entry under `source` into `destination` (in place),
    /// displacing entries already at the destination keys.
    ///
    /// Fails like [`rename_folder`](Self::rename_folder) except that taken
    /// destination keys are not an error. Pass the result to
    /// [`undo_merge_folder`](Self::undo_merge_folder) to reverse it.
    pub fn merge_folder(&mut self, source: &str, destination: &str) -> Result<MergeResult> {
        let plan = self.plan_folder_move(source, destination)?;
        let (conflicts, moved) = self.apply_folder_move(&plan);
        log::debug!(
            "Merged folder {} into {} ({} moved, {} displaced)",
            source,
            destination,
            moved.len(),
            conflicts.len()
        );
        Ok(MergeResult { conflicts, moved })
    }

    /// Reverses a merge: moves every entry back and reinserts the displaced
    /// entries at their keys and positions.
    ///
    /// # Errors
    ///
    /// - [`Error::FileNotFound`] if a moved entry is no longer at its
    ///   destination key
    /// - [`Error::NameAlreadyExists`] if a key to restore has been taken
    ///
    /// Nothing changes on error.
    pub fn undo_merge_folder(&mut self, result: MergeResult) -> Result<()> {
        for moved in &result.moved {
            match self.entries.get(&moved.to) {
                Some(current) if Arc::ptr_eq(current, &moved.entry) => {}
                _ => return Err(Error::file_not_found(&moved.to)),
            }
        }

        let renames: IndexMap<String, String> = result
            .moved
            .iter()
            .map(|moved| (moved.to.clone(), moved.from.clone()))
            .collect();

        let restored = renames.values().cloned();
        let displaced = result.conflicts.iter().map(|(_, entry)| entry.relative_path());
        for key in restored.chain(displaced) {
            if self.entries.contains_key(&key) && !renames.contains_key(&key) {
                return Err(Error::name_exists(key));
            }
        }

        let plan = FolderMove {
            renames,
            occupied: Vec::new(),
        };
        self.apply_folder_move(&plan);

        let mut conflicts = result.conflicts;
        conflicts.sort_by_key(|(index, _)| *index);
        for (index, entry) in conflicts {
            let key = entry.relative_path();
            let index = index.min(self.entries.len());
            self.locks.acquire_staged(&entry);
            self.entries.shift_insert(index, key, entry);
        }

        log::debug!("Undid merge of {} entries", result.moved.len());
        self.invalidate();
        Ok(())
    }

    fn plan_folder_move(&self, source: &str, destination: &str) -> Result<FolderMove> {
        let source = path::normalize_folder(source)?;
        let destination = path::normalize_folder(destination)?;
        ensure_not_empty(&source, "source folder")?;
        ensure_distinct(&source, &destination)?;

        if path::is_subfolder(&destination, &source) {
            return Err(Error::DestinationIsSubfolder {
                source_path: source,
                destination,
            });
        }
        if self.entries.contains_key(&destination) {
            return Err(Error::DestinationTypeMismatch { path: destination });
        }
        if self.views().is_hidden(&destination) {
            return Err(Error::HiddenFolderConflict { name: destination });
        }

        let mut renames = IndexMap::new();
        for key in self.entries.keys() {
            if path::is_in_directory(path::split(key).0, &source, false) {
                let new_key = path::replace_prefix(key, &source, &destination);
                path::validate(&new_key)?;
                renames.insert(key.clone(), new_key);
            }
        }
        if renames.is_empty() {
            return Err(Error::FolderNotFound { path: source });
        }

        let occupied = renames
            .values()
            .filter(|new_key| {
                self.entries.contains_key(new_key.as_str()) && !renames.contains_key(new_key.as_str())
            })
            .cloned()
            .collect();

        Ok(FolderMove { renames, occupied })
    }

    /// Re-keys the table per `plan`, preserving order. Occupants of
    /// destination keys are removed and returned with their positions.
    fn apply_folder_move(&mut self, plan: &FolderMove) -> (Vec<(usize, EntryRef)>, Vec<MovedEntry>) {
        for key in &plan.occupied {
            self.locks.release(key);
        }
        self.locks.rekey_many(
            plan.renames
                .iter()
                .map(|(old, new)| (old.as_str(), new.as_str())),
        );

        let previous = std::mem::take(&mut self.entries);
        let mut rebuilt = IndexMap::with_capacity(previous.len());
        let mut displaced = Vec::new();
        let mut moved = Vec::with_capacity(plan.renames.len());

        for (index, (key, entry)) in previous.into_iter().enumerate() {
            if let Some(new_key) = plan.renames.get(&key) {
                entry.set_relative_path(new_key.clone());
                moved.push(MovedEntry {
                    from: key,
                    to: new_key.clone(),
                    entry: Arc::clone(&entry),
                });
                rebuilt.insert(new_key.clone(), entry);
            } else if plan.occupied.contains(&key) {
                displaced.push((index, entry));
            } else {
                rebuilt.insert(key, entry);
            }
        }

        self.entries = rebuilt;
        self.invalidate();
        (displaced, moved)
    }
}
