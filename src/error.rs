//! Error types for table and entry operations.
//!
//! This module is the crate's fault catalog: the closed set of canonical
//! error templates, each one a variant of [`Error`] carrying its own payload.
//! Every template has a stable identity, [`ErrorKind`], that does not depend
//! on the arguments used to raise it. Two raised errors compare equal iff they
//! come from the same template:
//!
//! ```rust
//! use assetpak::{Error, ErrorKind};
//!
//! let a = Error::FileNotFound { path: "data\\a.txt".into() };
//! let b = Error::FileNotFound { path: "data\\b.txt".into() };
//! assert_eq!(a, b);
//! assert_eq!(a.kind(), ErrorKind::FileNotFound);
//!
//! let c = Error::FolderNotFound { path: "data".into() };
//! assert_ne!(a, c);
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`]. Errors are raised
//! immediately with no internal retry; callers decide whether to recover
//! (for example by prompting for another name on a conflict) or abort.
//!
//! ```rust
//! use assetpak::{Error, ErrorCategory, Table};
//!
//! fn rename_or_report(table: &mut Table, from: &str, to: &str) -> assetpak::Result<()> {
//!     match table.rename(from, to, false) {
//!         Ok(_) => Ok(()),
//!         Err(e) if e.category() == ErrorCategory::Conflict => {
//!             eprintln!("pick another name: {}", e);
//!             Err(e)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```
//!
//! Callers who want to collect faults instead of stopping at the first one
//! can feed errors into a [`Validation`](crate::Validation).

use std::fmt;
use std::io;

/// Broad fault family an [`Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing, malformed, or unknown paths.
    Path,
    /// Name collisions and invalid destinations.
    Conflict,
    /// The archive session is not in a state that allows the operation.
    State,
    /// Unsupported container format, version, or compression method.
    Format,
    /// Damaged or unreadable entry data.
    Data,
    /// Encryption key problems.
    Encryption,
    /// Underlying I/O failures.
    Io,
    /// Invalid search patterns.
    Pattern,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Path => "path",
            Self::Conflict => "conflict",
            Self::State => "state",
            Self::Format => "format",
            Self::Data => "data",
            Self::Encryption => "encryption",
            Self::Io => "I/O",
            Self::Pattern => "pattern",
        };
        f.write_str(name)
    }
}

/// Identity of an error template.
///
/// The discriminant is the template's process-wide identity number. It is
/// fixed at compile time, so it is the same in every run and on every thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A required path argument was absent.
    NullPath = 1,
    /// A required path argument was empty.
    EmptyPath = 2,
    /// The path contains forbidden characters.
    InvalidCharacters = 3,
    /// The path contains consecutive separators.
    DoubleSeparator = 4,
    /// No entry at the given key.
    FileNotFound = 5,
    /// No entry at or below the given folder.
    FolderNotFound = 6,
    /// Source and destination are the same.
    IdenticalPaths = 7,

    /// The destination key is taken.
    NameAlreadyExists = 20,
    /// The destination folder was emptied by a deletion.
    HiddenFolderConflict = 21,
    /// A folder was moved into itself.
    DestinationIsSubfolder = 22,
    /// A folder operation targeted a file.
    DestinationTypeMismatch = 23,

    /// No container is opened.
    NotOpened = 40,
    /// The container is still loading.
    NotLoaded = 41,
    /// The container is busy.
    Busy = 42,
    /// The container is being saved.
    Saving = 43,
    /// A collaborator was never set up.
    Uninstantiated = 44,

    /// Unknown container format.
    UnsupportedFormat = 60,
    /// Unknown container version.
    UnsupportedVersion = 61,
    /// Unknown compression method or setting.
    UnsupportedCompression = 62,

    /// Checksum mismatch.
    ChecksumFailed = 80,
    /// Entry data could not be interpreted.
    CorruptedEntry = 81,
    /// Entry data is encrypted.
    EncryptedEntry = 82,
    /// Entry offset out of range.
    InvalidOffset = 83,

    /// No encryption key set.
    NoKeySet = 100,
    /// Wrong encryption key.
    WrongKey = 101,
    /// Encryption unsupported by the version.
    EncryptionUnsupported = 102,

    /// I/O failure.
    Io = 120,
    /// Search pattern failed to compile.
    InvalidPattern = 121,
}

impl ErrorKind {
    /// Returns the template's identity number.
    pub fn id(self) -> u16 {
        self as u16
    }

    /// Returns the category this template belongs to.
    pub fn category(self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            NullPath | EmptyPath | InvalidCharacters | DoubleSeparator | FileNotFound
            | FolderNotFound | IdenticalPaths => ErrorCategory::Path,
            NameAlreadyExists
            | HiddenFolderConflict
            | DestinationIsSubfolder
            | DestinationTypeMismatch => ErrorCategory::Conflict,
            NotOpened | NotLoaded | Busy | Saving | Uninstantiated => ErrorCategory::State,
            UnsupportedFormat | UnsupportedVersion | UnsupportedCompression => {
                ErrorCategory::Format
            }
            ChecksumFailed | CorruptedEntry | EncryptedEntry | InvalidOffset => {
                ErrorCategory::Data
            }
            NoKeySet | WrongKey | EncryptionUnsupported => ErrorCategory::Encryption,
            Io => ErrorCategory::Io,
            InvalidPattern => ErrorCategory::Pattern,
        }
    }

    /// Returns the message template: the format string the matching
    /// [`Error`] variant displays with, field placeholders included.
    pub fn template(self) -> &'static str {
        use ErrorKind::*;
        match self {
            NullPath => "{what} cannot be null",
            EmptyPath => "{what} cannot be empty",
            InvalidCharacters => "path contains invalid characters: {path}",
            DoubleSeparator => "path contains a double separator: {path}",
            FileNotFound => "file not found: {path}",
            FolderNotFound => "folder not found: {path}",
            IdenticalPaths => "source and destination are identical: {path}",
            NameAlreadyExists => "an entry with this name already exists: {path}",
            HiddenFolderConflict => {
                "folder name {name} was emptied by a deletion and cannot be reused until the container is reloaded"
            }
            DestinationIsSubfolder => {
                "destination {destination} is a subfolder of the source {source_path}"
            }
            DestinationTypeMismatch => "destination {path} is a file, expected a folder",
            NotOpened => "no container is opened",
            NotLoaded => "the container has not finished loading",
            Busy => "the container is busy",
            Saving => "the container is being saved",
            Uninstantiated => "{what} has not been instantiated",
            UnsupportedFormat => "unsupported container format: {format}",
            UnsupportedVersion => "unsupported container version: {major}.{minor}",
            UnsupportedCompression => "unsupported compression: {method}",
            ChecksumFailed => {
                "checksum mismatch for {path}: expected {expected:#010x}, got {actual:#010x}"
            }
            CorruptedEntry => "entry {path} is corrupted: {reason}",
            EncryptedEntry => "entry {path} is encrypted",
            InvalidOffset => "invalid offset {offset:#x} for entry {path}",
            NoKeySet => "no encryption key has been set",
            WrongKey => "wrong encryption key for {path}",
            EncryptionUnsupported => "encryption is not supported for version {major}.{minor}",
            Io => "I/O error: {0}",
            InvalidPattern => "invalid search pattern '{pattern}': {reason}",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for table and entry operations.
///
/// | Category | Variants |
/// |----------|----------|
/// | Path | [`NullPath`][Self::NullPath], [`EmptyPath`][Self::EmptyPath], [`InvalidCharacters`][Self::InvalidCharacters], [`DoubleSeparator`][Self::DoubleSeparator], [`FileNotFound`][Self::FileNotFound], [`FolderNotFound`][Self::FolderNotFound], [`IdenticalPaths`][Self::IdenticalPaths] |
/// | Conflict | [`NameAlreadyExists`][Self::NameAlreadyExists], [`HiddenFolderConflict`][Self::HiddenFolderConflict], [`DestinationIsSubfolder`][Self::DestinationIsSubfolder], [`DestinationTypeMismatch`][Self::DestinationTypeMismatch] |
/// | State | [`NotOpened`][Self::NotOpened], [`NotLoaded`][Self::NotLoaded], [`Busy`][Self::Busy], [`Saving`][Self::Saving], [`Uninstantiated`][Self::Uninstantiated] |
/// | Format | [`UnsupportedFormat`][Self::UnsupportedFormat], [`UnsupportedVersion`][Self::UnsupportedVersion], [`UnsupportedCompression`][Self::UnsupportedCompression] |
/// | Data | [`ChecksumFailed`][Self::ChecksumFailed], [`CorruptedEntry`][Self::CorruptedEntry], [`EncryptedEntry`][Self::EncryptedEntry], [`InvalidOffset`][Self::InvalidOffset] |
/// | Encryption | [`NoKeySet`][Self::NoKeySet], [`WrongKey`][Self::WrongKey], [`EncryptionUnsupported`][Self::EncryptionUnsupported] |
///
/// Equality compares template identity only; see [`Error::kind`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A required path argument was absent.
    #[error("{what} cannot be null")]
    NullPath {
        /// Which argument was missing.
        what: &'static str,
    },

    /// A required path argument was empty.
    #[error("{what} cannot be empty")]
    EmptyPath {
        /// Which argument was empty.
        what: &'static str,
    },

    /// The path contains characters that cannot appear in a table path.
    #[error("path contains invalid characters: {path}")]
    InvalidCharacters {
        /// The offending path.
        path: String,
    },

    /// The path contains two consecutive separators.
    #[error("path contains a double separator: {path}")]
    DoubleSeparator {
        /// The offending path.
        path: String,
    },

    /// No entry exists at the given key.
    #[error("file not found: {path}")]
    FileNotFound {
        /// The path that was looked up.
        path: String,
    },

    /// No entry exists at or below the given folder.
    #[error("folder not found: {path}")]
    FolderNotFound {
        /// The folder that was looked up.
        path: String,
    },

    /// Source and destination of a move are the same.
    #[error("source and destination are identical: {path}")]
    IdenticalPaths {
        /// The path given for both.
        path: String,
    },

    /// The destination key is already taken.
    #[error("an entry with this name already exists: {path}")]
    NameAlreadyExists {
        /// The occupied path.
        path: String,
    },

    /// The destination folder was emptied by a deletion in this session.
    ///
    /// The removed rows keep their keys until the container is rebuilt, so
    /// moving other entries under the same name could collide with them.
    #[error(
        "folder name {name} was emptied by a deletion and cannot be reused until the container is reloaded"
    )]
    HiddenFolderConflict {
        /// The hidden folder name.
        name: String,
    },

    /// A folder cannot be moved into itself.
    #[error("destination {destination} is a subfolder of the source {source_path}")]
    DestinationIsSubfolder {
        /// The folder being moved.
        source_path: String,
        /// The requested destination.
        destination: String,
    },

    /// A folder operation targeted a path that is a file.
    #[error("destination {path} is a file, expected a folder")]
    DestinationTypeMismatch {
        /// The destination path.
        path: String,
    },

    /// No container is opened.
    #[error("no container is opened")]
    NotOpened,

    /// The container has not finished loading.
    #[error("the container has not finished loading")]
    NotLoaded,

    /// Another operation holds the container.
    #[error("the container is busy")]
    Busy,

    /// The container is being saved.
    #[error("the container is being saved")]
    Saving,

    /// A required collaborator was never set up.
    #[error("{what} has not been instantiated")]
    Uninstantiated {
        /// The missing collaborator.
        what: &'static str,
    },

    /// The container format is not recognized.
    #[error("unsupported container format: {format}")]
    UnsupportedFormat {
        /// Description of the format found.
        format: String,
    },

    /// The container version is not supported.
    #[error("unsupported container version: {major}.{minor}")]
    UnsupportedVersion {
        /// Major version.
        major: u8,
        /// Minor version.
        minor: u8,
    },

    /// The compression method or setting is not supported.
    #[error("unsupported compression: {method}")]
    UnsupportedCompression {
        /// The method or setting.
        method: String,
    },

    /// Decompressed data does not match the stored checksum.
    #[error("checksum mismatch for {path}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumFailed {
        /// The entry path.
        path: String,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// Entry data could not be interpreted.
    #[error("entry {path} is corrupted: {reason}")]
    CorruptedEntry {
        /// The entry path.
        path: String,
        /// What was wrong.
        reason: String,
    },

    /// Entry data is encrypted and cannot be read as-is.
    #[error("entry {path} is encrypted")]
    EncryptedEntry {
        /// The entry path.
        path: String,
    },

    /// The entry's offset does not fit the container.
    #[error("invalid offset {offset:#x} for entry {path}")]
    InvalidOffset {
        /// The entry path.
        path: String,
        /// The offending offset.
        offset: u64,
    },

    /// An operation needs an encryption key and none was set.
    #[error("no encryption key has been set")]
    NoKeySet,

    /// The encryption key does not decrypt the entry.
    #[error("wrong encryption key for {path}")]
    WrongKey {
        /// The entry path.
        path: String,
    },

    /// The container version does not support encryption.
    #[error("encryption is not supported for version {major}.{minor}")]
    EncryptionUnsupported {
        /// Major version.
        major: u8,
        /// Minor version.
        minor: u8,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A search pattern failed to compile.
    #[error("invalid search pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

}

impl Error {
    /// Returns the template this error was raised from.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NullPath { .. } => ErrorKind::NullPath,
            Error::EmptyPath { .. } => ErrorKind::EmptyPath,
            Error::InvalidCharacters { .. } => ErrorKind::InvalidCharacters,
            Error::DoubleSeparator { .. } => ErrorKind::DoubleSeparator,
            Error::FileNotFound { .. } => ErrorKind::FileNotFound,
            Error::FolderNotFound { .. } => ErrorKind::FolderNotFound,
            Error::IdenticalPaths { .. } => ErrorKind::IdenticalPaths,
            Error::NameAlreadyExists { .. } => ErrorKind::NameAlreadyExists,
            Error::HiddenFolderConflict { .. } => ErrorKind::HiddenFolderConflict,
            Error::DestinationIsSubfolder { .. } => ErrorKind::DestinationIsSubfolder,
            Error::DestinationTypeMismatch { .. } => ErrorKind::DestinationTypeMismatch,
            Error::NotOpened => ErrorKind::NotOpened,
            Error::NotLoaded => ErrorKind::NotLoaded,
            Error::Busy => ErrorKind::Busy,
            Error::Saving => ErrorKind::Saving,
            Error::Uninstantiated { .. } => ErrorKind::Uninstantiated,
            Error::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Error::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Error::UnsupportedCompression { .. } => ErrorKind::UnsupportedCompression,
            Error::ChecksumFailed { .. } => ErrorKind::ChecksumFailed,
            Error::CorruptedEntry { .. } => ErrorKind::CorruptedEntry,
            Error::EncryptedEntry { .. } => ErrorKind::EncryptedEntry,
            Error::InvalidOffset { .. } => ErrorKind::InvalidOffset,
            Error::NoKeySet => ErrorKind::NoKeySet,
            Error::WrongKey { .. } => ErrorKind::WrongKey,
            Error::EncryptionUnsupported { .. } => ErrorKind::EncryptionUnsupported,
            Error::Io(_) => ErrorKind::Io,
            Error::InvalidPattern { .. } => ErrorKind::InvalidPattern,
        }
    }

    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        self.kind().category()
    }

    /// Returns `true` if both errors were raised from the same template.
    ///
    /// Same as `==`; provided for call sites where the intent should read
    /// explicitly.
    pub fn is_same_kind(&self, other: &Error) -> bool {
        self.kind() == other.kind()
    }

    /// Returns `true` if this error is a naming conflict.
    pub fn is_conflict(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }

    /// Returns `true` if this is a data corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::ChecksumFailed { .. } | Error::CorruptedEntry { .. }
        )
    }

    /// Returns `true` if this error might go away on a retry or with
    /// different input.
    ///
    /// Conflicts are recoverable by choosing another name, state errors by
    /// waiting for the container, key errors by supplying a key. I/O errors
    /// count only when their kind is transient (`WouldBlock`, `Interrupted`,
    /// `TimedOut`).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => matches!(
                self.category(),
                ErrorCategory::Conflict | ErrorCategory::State | ErrorCategory::Encryption
            ),
        }
    }

    /// Returns the path associated with this error, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::InvalidCharacters { path }
            | Error::DoubleSeparator { path }
            | Error::FileNotFound { path }
            | Error::FolderNotFound { path }
            | Error::IdenticalPaths { path }
            | Error::NameAlreadyExists { path }
            | Error::DestinationTypeMismatch { path }
            | Error::ChecksumFailed { path, .. }
            | Error::CorruptedEntry { path, .. }
            | Error::EncryptedEntry { path }
            | Error::InvalidOffset { path, .. }
            | Error::WrongKey { path } => Some(path.as_str()),
            Error::HiddenFolderConflict { name } => Some(name.as_str()),
            Error::DestinationIsSubfolder { destination, .. } => Some(destination.as_str()),
            _ => None,
        }
    }

    /// Creates a FileNotFound error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Creates a NameAlreadyExists error.
    pub fn name_exists(path: impl Into<String>) -> Self {
        Error::NameAlreadyExists { path: path.into() }
    }

    /// Creates a CorruptedEntry error.
    pub fn corrupted(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptedEntry {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }
}

impl Eq for Error {}

/// A specialized Result type for table operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns `Err(error())` unless `condition` holds.
///
/// ```rust
/// use assetpak::{Error, ensure};
///
/// let open = false;
/// assert!(ensure(open, || Error::NotOpened).is_err());
/// ```
#[inline]
pub fn ensure(condition: bool, error: impl FnOnce() -> Error) -> Result<()> {
    if condition { Ok(()) } else { Err(error()) }
}

/// Fails with [`Error::EmptyPath`] if `value` is empty.
#[inline]
pub fn ensure_not_empty(value: &str, what: &'static str) -> Result<()> {
    ensure(!value.is_empty(), || Error::EmptyPath { what })
}

/// Fails with [`Error::IdenticalPaths`] if both paths are equal.
#[inline]
pub fn ensure_distinct(source: &str, destination: &str) -> Result<()> {
    ensure(source != destination, || Error::IdenticalPaths {
        path: destination.to_string(),
    })
}
