//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assetpak::codec::{Codec, StoreCodec, ZlibCodec};
use assetpak::{BackingReader, Entry, EntryRef, SharedReader, Table, TableOptions};

/// Creates a table with the store codec and one staged in-memory entry per
/// path. Each entry's payload is its own path.
pub fn table_with(paths: &[&str]) -> Table {
    let mut table = Table::with_options(TableOptions::new().codec(Arc::new(StoreCodec)));
    for path in paths {
        table
            .add_bytes(path, path.as_bytes().to_vec(), false)
            .expect("valid test path");
    }
    table
}

/// Lays out `files` zlib-compressed in one blob and returns a table parsed
/// from it, as a format crate would.
pub fn archived_table(files: &[(&str, &[u8])]) -> Table {
    archived_table_with_codec(files, Arc::new(ZlibCodec::default()))
}

/// Same as [`archived_table`] with a caller-chosen codec.
pub fn archived_table_with_codec(files: &[(&str, &[u8])], codec: Arc<dyn Codec>) -> Table {
    let mut blob = b"PAK\0".to_vec();
    let mut layout = Vec::new();
    for (path, data) in files {
        let packed = codec.compress(data).expect("compress");
        layout.push((*path, blob.len() as u64, packed.len() as u64, data.len() as u64));
        blob.extend_from_slice(&packed);
    }

    let reader: Arc<dyn BackingReader> =
        Arc::new(SharedReader::new(Cursor::new(blob)).expect("reader over memory"));
    let mut table = Table::new();
    for (path, offset, packed, size) in layout {
        let entry = Entry::archived(
            path,
            offset,
            packed,
            Some(size),
            Arc::clone(&reader),
            Arc::clone(&codec),
        )
        .expect("valid test path");
        table.insert_parsed(entry).expect("unique test path");
    }
    table
}

/// Table keys in order.
pub fn keys(table: &Table) -> Vec<String> {
    table.iter().map(|(key, _)| key.to_string()).collect()
}

/// Keys and entry handles in order.
pub fn snapshot(table: &Table) -> Vec<(String, EntryRef)> {
    table
        .iter()
        .map(|(key, entry)| (key.to_string(), Arc::clone(entry)))
        .collect()
}

/// Asserts two snapshots hold the same keys and the same entries.
pub fn assert_same_rows(before: &[(String, EntryRef)], after: &[(String, EntryRef)]) {
    assert_eq!(before.len(), after.len(), "row count changed");
    for ((k1, e1), (k2, e2)) in before.iter().zip(after) {
        assert_eq!(k1, k2);
        assert!(Arc::ptr_eq(e1, e2), "entry at {} was replaced", k1);
        assert_eq!(e2.relative_path(), *k2);
    }
}

/// Writes a source file for staged additions.
pub fn write_source(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("write source file");
    path
}

/// Store codec that records how many decompressions run at once.
#[derive(Debug, Default)]
pub struct CountingCodec {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl CountingCodec {
    /// Highest number of concurrent `decompress` calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Total `decompress` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Codec for CountingCodec {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn decompress(&self, input: &[u8], _size_hint: Option<u64>) -> assetpak::Result<Vec<u8>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(2));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(input.to_vec())
    }

    fn compress(&self, input: &[u8]) -> assetpak::Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}
