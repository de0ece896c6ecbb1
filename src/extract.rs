//! Bulk extraction of entries to a directory.
//!
//! Extraction only reads the table, so it can run on many entries at once.
//! With the `parallel` feature (on by default) entries are spread over a
//! rayon pool; otherwise they are processed in order on the calling thread.
//! Per-entry failures do not stop the batch; they are collected in
//! [`ExtractResult::faults`].
//!
//! # Example
//!
//! ```rust
//! use assetpak::Table;
//! use assetpak::extract::{self, ExtractOptions, OverwritePolicy};
//!
//! let mut table = Table::new();
//! table.add_bytes("data/a.txt", b"hello".to_vec(), false)?;
//!
//! let dir = tempfile::tempdir()?;
//! let options = ExtractOptions::new().overwrite(OverwritePolicy::Overwrite);
//! let result = extract::extract_table(&table, dir.path(), &options)?;
//! assert_eq!(result.entries_extracted, 1);
//! assert!(result.faults.is_valid());
//! assert_eq!(std::fs::read(dir.path().join("data").join("a.txt"))?, b"hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::entry::{Entry, EntryRef};
use crate::path::SEPARATOR;
use crate::table::Table;
use crate::validation::Validation;
use crate::{Error, Result};

/// Thread configuration for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threads {
    /// One thread per available CPU.
    #[default]
    Auto,
    /// A fixed number of threads.
    Count(NonZeroUsize),
    /// Extract on the calling thread.
    Single,
}

impl Threads {
    /// Returns `Threads::Single` for zero, `Threads::Count` otherwise.
    ///
    /// ```rust
    /// use assetpak::extract::Threads;
    ///
    /// assert_eq!(Threads::count_or_single(0), Threads::Single);
    /// assert_eq!(Threads::count_or_single(4).count(), 4);
    /// ```
    pub fn count_or_single(n: usize) -> Self {
        match NonZeroUsize::new(n) {
            Some(count) => Self::Count(count),
            None => Self::Single,
        }
    }

    /// Resolves to a thread count of at least 1.
    pub fn count(&self) -> usize {
        match self {
            Self::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            Self::Count(n) => n.get(),
            Self::Single => 1,
        }
    }
}

/// What to do when a destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Record a [`Error::NameAlreadyExists`] fault for the entry.
    #[default]
    Error,
    /// Leave the existing file and count the entry as skipped.
    Skip,
    /// Replace the existing file.
    Overwrite,
}

/// Cooperative cancellation flag, polled between entries.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Entries already being extracted finish.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Options for [`extract_entries`].
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Thread configuration.
    pub threads: Threads,
    /// Policy for existing destination files.
    pub overwrite: OverwritePolicy,
    /// Cancellation flag.
    pub cancel: Option<CancellationToken>,
}

impl ExtractOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the thread configuration.
    pub fn threads(mut self, threads: Threads) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the overwrite policy.
    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Sets the cancellation token.
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Outcome of a bulk extraction.
#[must_use = "extraction result should be checked for faults"]
#[derive(Debug, Default)]
pub struct ExtractResult {
    /// Entries written to disk.
    pub entries_extracted: usize,
    /// Entries left alone because the destination existed.
    pub entries_skipped: usize,
    /// Bytes written.
    pub bytes_extracted: u64,
    /// Whether cancellation stopped the batch early.
    pub cancelled: bool,
    /// Threads used.
    pub threads_used: usize,
    /// Per-entry failures, ordered by entry path.
    pub faults: Validation,
}

enum Outcome {
    Extracted(u64),
    Skipped,
}

#[derive(Default)]
struct Counters {
    extracted: AtomicUsize,
    skipped: AtomicUsize,
    bytes: AtomicU64,
    cancelled: AtomicBool,
    faults: Mutex<Vec<(String, Error)>>,
}

impl Counters {
    fn process(&self, entry: &Entry, dest_dir: &Path, options: &ExtractOptions) {
        if options.is_cancelled() {
            self.cancelled.store(true, Ordering::Relaxed);
            return;
        }
        match extract_one(entry, dest_dir, options.overwrite) {
            Ok(Outcome::Extracted(bytes)) => {
                self.extracted.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(bytes, Ordering::Relaxed);
            }
            Ok(Outcome::Skipped) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                let path = entry.relative_path();
                log::warn!("Failed to extract {}: {}", path, e);
                self.faults.lock().push((path, e));
            }
        }
    }

    fn into_result(self, threads_used: usize) -> ExtractResult {
        let mut faults = self.faults.into_inner();
        faults.sort_by(|a, b| a.0.cmp(&b.0));

        let mut validation = Validation::new();
        for (path, error) in faults {
            validation.add_fault_with_message(format!("{}: {}", path, error), error);
        }

        ExtractResult {
            entries_extracted: self.extracted.into_inner(),
            entries_skipped: self.skipped.into_inner(),
            bytes_extracted: self.bytes.into_inner(),
            cancelled: self.cancelled.into_inner(),
            threads_used,
            faults: validation,
        }
    }
}

/// Maps a table key to a path under `dest_dir`.
pub fn destination_path(dest_dir: &Path, key: &str) -> PathBuf {
    key.split(SEPARATOR)
        .fold(dest_dir.to_path_buf(), |path, segment| path.join(segment))
}

fn extract_one(entry: &Entry, dest_dir: &Path, overwrite: OverwritePolicy) -> Result<Outcome> {
    let key = entry.relative_path();
    let target = destination_path(dest_dir, &key);
    if target.exists() {
        match overwrite {
            OverwritePolicy::Error => return Err(Error::name_exists(key)),
            OverwritePolicy::Skip => return Ok(Outcome::Skipped),
            OverwritePolicy::Overwrite => {}
        }
    }
    entry.extract_to(&target)?;
    Ok(Outcome::Extracted(fs::metadata(&target)?.len()))
}

/// Extracts `entries` under `dest_dir`, mirroring their table keys.
///
/// # Errors
///
/// Fails only if `dest_dir` cannot be created or the thread pool cannot be
/// built. Per-entry failures go to [`ExtractResult::faults`].
pub fn extract_entries(
    entries: &[EntryRef],
    dest_dir: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<ExtractResult> {
    let dest_dir = dest_dir.as_ref();
    fs::create_dir_all(dest_dir)?;

    let counters = Counters::default();
    let threads_used = run(entries, dest_dir, options, &counters)?;
    let result = counters.into_result(threads_used);

    log::debug!(
        "Extracted {} entries ({} skipped, {} failed) to '{}'",
        result.entries_extracted,
        result.entries_skipped,
        result.faults.len(),
        dest_dir.display()
    );
    Ok(result)
}

/// Extracts every live file of `table`. Removal markers are skipped.
pub fn extract_table(
    table: &Table,
    dest_dir: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<ExtractResult> {
    let entries: Vec<EntryRef> = table
        .entries()
        .filter(|entry| !entry.is_removed() && !entry.is_removal_marker())
        .cloned()
        .collect();
    extract_entries(&entries, dest_dir, options)
}

#[cfg(feature = "parallel")]
fn run(
    entries: &[EntryRef],
    dest_dir: &Path,
    options: &ExtractOptions,
    counters: &Counters,
) -> Result<usize> {
    use rayon::prelude::*;

    let threads = options.threads.count().min(entries.len()).max(1);
    if threads == 1 {
        return run_sequential(entries, dest_dir, options, counters);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
    pool.install(|| {
        entries
            .par_iter()
            .for_each(|entry| counters.process(entry, dest_dir, options));
    });
    Ok(threads)
}

#[cfg(not(feature = "parallel"))]
fn run(
    entries: &[EntryRef],
    dest_dir: &Path,
    options: &ExtractOptions,
    counters: &Counters,
) -> Result<usize> {
    run_sequential(entries, dest_dir, options, counters)
}

fn run_sequential(
    entries: &[EntryRef],
    dest_dir: &Path,
    options: &ExtractOptions,
    counters: &Counters,
) -> Result<usize> {
    for entry in entries {
        if options.is_cancelled() {
            counters.cancelled.store(true, Ordering::Relaxed);
            break;
        }
        counters.process(entry, dest_dir, options);
    }
    Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn table_with(paths: &[&str]) -> Table {
        let mut table = Table::new();
        for p in paths {
            table.add_bytes(p, p.as_bytes().to_vec(), false).unwrap();
        }
        table
    }

    #[test]
    fn test_threads_count() {
        assert_eq!(Threads::Single.count(), 1);
        assert!(Threads::Auto.count() >= 1);
        assert_eq!(Threads::count_or_single(3), Threads::Count(NonZeroUsize::new(3).unwrap()));
    }

    #[test]
    fn test_destination_path() {
        let base = Path::new("out");
        assert_eq!(
            destination_path(base, "a\\b\\c.txt"),
            base.join("a").join("b").join("c.txt")
        );
    }

    #[test]
    fn test_extract_table_skips_removed() {
        let mut table = table_with(&["a\\x.txt", "a\\y.txt", "z.txt"]);
        table.delete_file("a\\y.txt").unwrap();
        table.add_file_to_remove("old.txt").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let result = extract_table(&table, dir.path(), &ExtractOptions::new()).unwrap();
        assert_eq!(result.entries_extracted, 2);
        assert_eq!(result.bytes_extracted, ("a\\x.txt".len() + "z.txt".len()) as u64);
        assert!(!result.cancelled);
        assert!(dir.path().join("a").join("x.txt").exists());
        assert!(!dir.path().join("a").join("y.txt").exists());
        assert!(!dir.path().join("old.txt").exists());
    }

    #[test]
    fn test_overwrite_policies() {
        let table = table_with(&["a.txt"]);
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"existing").unwrap();

        let result = extract_table(&table, dir.path(), &ExtractOptions::new()).unwrap();
        assert_eq!(result.faults.len(), 1);
        let error = result.faults.last_fault().unwrap().error().unwrap();
        assert_eq!(error.kind(), ErrorKind::NameAlreadyExists);

        let skip = ExtractOptions::new().overwrite(OverwritePolicy::Skip);
        let result = extract_table(&table, dir.path(), &skip).unwrap();
        assert_eq!(result.entries_skipped, 1);
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"existing");

        let overwrite = ExtractOptions::new().overwrite(OverwritePolicy::Overwrite);
        let result = extract_table(&table, dir.path(), &overwrite).unwrap();
        assert_eq!(result.entries_extracted, 1);
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"a.txt");
    }

    #[test]
    fn test_cancelled_before_start() {
        let table = table_with(&["a.txt", "b.txt"]);
        let token = CancellationToken::new();
        token.cancel();
        let dir = tempfile::tempdir().unwrap();
        let options = ExtractOptions::new().cancel(token);
        let result = extract_table(&table, dir.path(), &options).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.entries_extracted, 0);
    }

    #[test]
    fn test_failures_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::new();
        table.add("b.bin", dir.path().join("missing-b.bin"), false).unwrap();
        table.add("a.bin", dir.path().join("missing-a.bin"), false).unwrap();
        table.add_bytes("ok.txt", b"ok".to_vec(), false).unwrap();

        let out = dir.path().join("out");
        let options = ExtractOptions::new().threads(Threads::count_or_single(2));
        let result = extract_table(&table, &out, &options).unwrap();
        assert_eq!(result.entries_extracted, 1);
        assert_eq!(result.faults.len(), 2);
        assert!(result.faults.faults()[0].message().starts_with("a.bin"));
        assert!(result.faults.faults()[1].message().starts_with("b.bin"));
    }
}
