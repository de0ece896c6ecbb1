//! # assetpak
//!
//! The in-memory table engine behind a game-asset archive container.
//!
//! A container holds many files in one blob. This crate tracks every file
//! the container holds, the edits pending against it, and what a rebuild
//! pass needs to lay the container out again. It does not define any
//! on-disk format: format crates parse their tables into [`Entry`] values and
//! serialize [`EntryRecord`]s back out.
//!
//! ## Quick Start
//!
//! ```rust
//! use assetpak::{SearchOption, Table, TableOptions};
//!
//! fn main() -> assetpak::Result<()> {
//!     let mut table = Table::with_options(TableOptions::new());
//!
//!     // Stage additions
//!     table.add_bytes("data/texture/a.bmp", b"BM...".to_vec(), false)?;
//!     table.add_bytes("data/texture/b.bmp", b"BM...".to_vec(), false)?;
//!     table.add_bytes("data/sound/c.wav", b"RIFF".to_vec(), false)?;
//!
//!     // Query
//!     let textures = table.get_files("data", "*.bmp", SearchOption::AllDirectories, false)?;
//!     assert_eq!(textures.len(), 2);
//!
//!     // Move a folder; callers holding the entry see the new key
//!     let held = table["data\\sound\\c.wav"].clone();
//!     table.rename_folder("data\\sound", "data\\audio")?;
//!     assert_eq!(held.relative_path(), "data\\audio\\c.wav");
//!
//!     // Soft delete is reversible
//!     table.delete_folder("data\\texture")?;
//!     assert_eq!(table.files().len(), 1);
//!     table.undo_delete_folder("data\\texture")?;
//!     assert_eq!(table.files().len(), 3);
//!     Ok(())
//! }
//! ```
//!
//! ## Opening a Container
//!
//! Format crates build archive-resident entries over a shared
//! [`BackingReader`] and insert them as they parse:
//!
//! ```rust
//! use std::sync::Arc;
//! use assetpak::codec::{Codec, ZlibCodec};
//! use assetpak::{BackingReader, Entry, MemoryReader, Table};
//!
//! # fn main() -> assetpak::Result<()> {
//! let codec = Arc::new(ZlibCodec::default());
//! let packed = codec.compress(b"hello")?;
//! let reader: Arc<dyn BackingReader> = Arc::new(MemoryReader::new(packed.clone()));
//!
//! let mut table = Table::new();
//! table.insert_parsed(Entry::archived(
//!     "data\\hello.txt",
//!     0,
//!     packed.len() as u64,
//!     Some(5),
//!     reader,
//!     codec,
//! )?)?;
//!
//! assert_eq!(table["data\\hello.txt"].decompressed_data()?, b"hello");
//! assert!(table.verify().is_valid());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Each [`Error`] variant is
//! one canonical fault template; [`Error::kind`] gives its stable identity,
//! and two errors compare equal iff they come from the same template.
//! [`Validation`] collects faults for callers who would rather not stop at
//! the first one.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `parallel` | Yes | Multi-threaded bulk extraction with Rayon |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod codec;
pub mod entry;
pub mod error;
pub mod extract;
pub mod path;
pub mod resources;
pub mod session;
pub mod state;
pub mod table;
pub mod validation;

pub use codec::Codec;
pub use entry::{
    BackingReader, Entry, EntryRecord, EntryRef, EntrySource, MemoryReader, RecordHeader,
    SharedReader,
};
pub use error::{Error, ErrorCategory, ErrorKind, Result, ensure, ensure_distinct, ensure_not_empty};
pub use resources::ResourceRegistry;
pub use session::Session;
pub use state::{ArchiveState, EntryFlags, Modification};
pub use table::{
    FileNamePattern, MergeResult, MovedEntry, ReplaceSource, SearchOption, Table, TableOptions,
};
pub use validation::{Fault, Validation};
