//! Bit sets describing archive health and entry state.

use bitflags::bitflags;

bitflags! {
    /// Health of an archive session.
    ///
    /// This crate only defines the states. Deciding when to move between
    /// them is up to whoever drives the session.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ArchiveState: u8 {
        /// Nothing went wrong.
        const NORMAL = 0;
        /// An operation failed and the session may be inconsistent.
        const ERROR = 1 << 0;
        /// Loading was cancelled before the table was complete.
        const LOAD_CANCELLED = 1 << 1;
        /// A long-running operation was cancelled.
        const CANCELLED = 1 << 2;
    }
}

impl ArchiveState {
    /// Returns true if no fault flag is set.
    pub fn is_normal(self) -> bool {
        self.is_empty()
    }
}

bitflags! {
    /// Kind of record an entry represents in the container table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntryFlags: u8 {
        /// A regular file.
        const FILE = 1 << 0;
        /// A folder record.
        const FOLDER = 1 << 1;
        /// A marker telling the patch consumer to delete the path.
        const REMOVE_FILE = 1 << 2;
    }
}

impl Default for EntryFlags {
    fn default() -> Self {
        EntryFlags::FILE
    }
}

bitflags! {
    /// Pending changes of an entry relative to the last saved container.
    ///
    /// `ENCRYPT` and `DECRYPT` are never set together; use
    /// [`Modification::with_encryption`] to switch between them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modification: u8 {
        /// Staged addition, not yet written to the container.
        const ADDED = 1 << 0;
        /// Soft-deleted.
        const REMOVED = 1 << 1;
        /// Will be encrypted on save.
        const ENCRYPT = 1 << 2;
        /// Will be decrypted on save.
        const DECRYPT = 1 << 3;
    }
}

impl Modification {
    /// Returns a copy with `flag` (`ENCRYPT` or `DECRYPT`) set and the other
    /// one cleared. Other bits are kept.
    pub fn with_encryption(self, flag: Modification) -> Modification {
        debug_assert!(flag == Modification::ENCRYPT || flag == Modification::DECRYPT);
        let cleared = self - (Modification::ENCRYPT | Modification::DECRYPT);
        cleared | flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_state_normal() {
        assert!(ArchiveState::NORMAL.is_normal());
        assert!(ArchiveState::default().is_normal());
        assert!(!(ArchiveState::ERROR | ArchiveState::CANCELLED).is_normal());
    }

    #[test]
    fn test_entry_flags_default_is_file() {
        assert_eq!(EntryFlags::default(), EntryFlags::FILE);
    }

    #[test]
    fn test_encryption_bits_are_exclusive() {
        let m = Modification::ADDED | Modification::DECRYPT;
        let m = m.with_encryption(Modification::ENCRYPT);
        assert!(m.contains(Modification::ENCRYPT));
        assert!(!m.contains(Modification::DECRYPT));
        assert!(m.contains(Modification::ADDED));

        let m = m.with_encryption(Modification::DECRYPT);
        assert!(m.contains(Modification::DECRYPT));
        assert!(!m.contains(Modification::ENCRYPT));
    }
}
