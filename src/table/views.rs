//! Derived, rebuild-on-demand views over a table's entries.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};

use crate::entry::EntryRef;
use crate::path;
use crate::{Error, Result};

/// How far below a folder a listing reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchOption {
    /// Only entries whose parent directory is the folder itself.
    #[default]
    TopDirectoryOnly,
    /// Entries at or anywhere below the folder.
    AllDirectories,
}

impl SearchOption {
    /// Returns true if `directory` falls within `folder` under this option.
    pub fn matches(self, directory: &str, folder: &str, ignore_case: bool) -> bool {
        match self {
            SearchOption::AllDirectories => path::is_in_directory(directory, folder, ignore_case),
            SearchOption::TopDirectoryOnly if ignore_case => {
                path::fold_case(directory) == path::fold_case(folder)
            }
            SearchOption::TopDirectoryOnly => directory == folder,
        }
    }
}

/// File name pattern with `*` and `?` wildcards, matched case-insensitively.
///
/// `""` and `"*"` match every name.
///
/// ```rust
/// use assetpak::table::FileNamePattern;
///
/// let pattern = FileNamePattern::new("*.BMP").unwrap();
/// assert!(pattern.is_match("a.bmp"));
/// assert!(!pattern.is_match("a.bmp.bak"));
/// assert!(FileNamePattern::new("").unwrap().is_match("anything"));
/// ```
#[derive(Debug, Clone)]
pub struct FileNamePattern {
    regex: Option<regex::Regex>,
}

impl FileNamePattern {
    /// Compiles a wildcard pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() || pattern == "*" {
            return Ok(Self { regex: None });
        }

        let mut source = String::with_capacity(pattern.len() + 8);
        source.push('^');
        for c in pattern.chars() {
            match c {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                c => source.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
            }
        }
        source.push('$');

        let regex = regex::RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { regex: Some(regex) })
    }

    /// Returns true if the pattern matches every name.
    pub fn matches_all(&self) -> bool {
        self.regex.is_none()
    }

    /// Tests a file name.
    pub fn is_match(&self, file_name: &str) -> bool {
        self.regex.as_ref().is_none_or(|regex| regex.is_match(file_name))
    }
}

/// Snapshot of everything the table derives from its entries.
#[derive(Debug, Default)]
pub(crate) struct Views {
    /// Live file keys in table order.
    pub(crate) files: Vec<String>,
    pub(crate) file_set: HashSet<String>,
    /// Case-folded live key → stored key.
    pub(crate) folded_files: HashMap<String, String>,
    /// Every ancestor directory of every entry, root included.
    pub(crate) directories: IndexSet<String>,
    /// Directories whose every descendant entry is soft-deleted.
    pub(crate) hidden_directories: IndexSet<String>,
    /// Directory → entries directly inside it.
    pub(crate) directory_index: IndexMap<String, Vec<EntryRef>>,
}

impl Views {
    pub(crate) fn build(entries: &IndexMap<String, EntryRef>) -> Self {
        let mut views = Views::default();
        // directory → (entries at or below, live entries at or below)
        let mut occupancy: IndexMap<String, (usize, usize)> = IndexMap::new();

        for (key, entry) in entries {
            let removed = entry.is_removed();
            let directory = path::split(key).0;

            if !removed {
                views.files.push(key.clone());
                views.file_set.insert(key.clone());
                views
                    .folded_files
                    .entry(path::fold_case(key))
                    .or_insert_with(|| key.clone());
            }

            views
                .directory_index
                .entry(directory.to_string())
                .or_default()
                .push(entry.clone());

            for ancestor in path::ancestors(directory) {
                let counts = occupancy.entry(ancestor.to_string()).or_default();
                counts.0 += 1;
                if !removed {
                    counts.1 += 1;
                }
            }
        }

        views.directories.insert(String::new());
        for (directory, (total, live)) in occupancy {
            if !directory.is_empty() && total > 0 && live == 0 {
                views.hidden_directories.insert(directory.clone());
            }
            views.directories.insert(directory);
        }

        log::debug!(
            "Rebuilt table views: {} live files, {} directories, {} hidden",
            views.files.len(),
            views.directories.len(),
            views.hidden_directories.len()
        );
        views
    }

    /// Resolves a key to the stored key of a live file.
    pub(crate) fn resolve_file(&self, key: &str, ignore_case: bool) -> Option<&str> {
        if let Some(stored) = self.file_set.get(key) {
            return Some(stored.as_str());
        }
        if ignore_case {
            return self.folded_files.get(&path::fold_case(key)).map(String::as_str);
        }
        None
    }

    /// Returns true if `directory` is hidden, compared case-insensitively.
    pub(crate) fn is_hidden(&self, directory: &str) -> bool {
        let folded = path::fold_case(directory);
        self.hidden_directories
            .iter()
            .any(|hidden| path::fold_case(hidden) == folded)
    }

    pub(crate) fn get_files(
        &self,
        folder: &str,
        pattern: &FileNamePattern,
        option: SearchOption,
        ignore_case: bool,
    ) -> Vec<String> {
        self.files
            .iter()
            .filter(|key| {
                let (directory, file_name) = path::split(key);
                option.matches(directory, folder, ignore_case) && pattern.is_match(file_name)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StoreCodec;
    use crate::entry::Entry;
    use std::sync::Arc;

    fn table_of(paths: &[&str]) -> IndexMap<String, EntryRef> {
        paths
            .iter()
            .map(|p| {
                let entry = Entry::staged_bytes(p, Vec::new(), Arc::new(StoreCodec)).unwrap();
                (entry.relative_path(), Arc::new(entry))
            })
            .collect()
    }

    #[test]
    fn test_pattern_wildcards() {
        let p = FileNamePattern::new("a?c.*").unwrap();
        assert!(p.is_match("abc.txt"));
        assert!(p.is_match("ABC.TXT"));
        assert!(!p.is_match("abbc.txt"));
        assert!(!p.matches_all());
    }

    #[test]
    fn test_pattern_escapes_regex_syntax() {
        let p = FileNamePattern::new("a+b(1).txt").unwrap();
        assert!(p.is_match("a+b(1).txt"));
        assert!(!p.is_match("aab1.txt"));
        assert!(FileNamePattern::new("[x]").unwrap().is_match("[X]"));
    }

    #[test]
    fn test_pattern_match_all() {
        assert!(FileNamePattern::new("").unwrap().matches_all());
        assert!(FileNamePattern::new("*").unwrap().matches_all());
    }

    #[test]
    fn test_search_option() {
        let all = SearchOption::AllDirectories;
        let top = SearchOption::TopDirectoryOnly;
        assert!(all.matches("a\\b", "a", false));
        assert!(!top.matches("a\\b", "a", false));
        assert!(top.matches("A", "a", true));
        assert!(!top.matches("A", "a", false));
    }

    #[test]
    fn test_directories_include_all_ancestors() {
        let views = Views::build(&table_of(&["a\\b\\c\\x.txt", "y.txt"]));
        let dirs: Vec<_> = views.directories.iter().map(String::as_str).collect();
        for expected in ["", "a", "a\\b", "a\\b\\c"] {
            assert!(dirs.contains(&expected), "missing {:?}", expected);
        }
        assert_eq!(views.directories.len(), 4);
    }

    #[test]
    fn test_hidden_directories() {
        let entries = table_of(&["a\\b\\x.txt", "a\\c\\y.txt"]);
        entries["a\\b\\x.txt"].mark_removed();
        let views = Views::build(&entries);
        assert!(views.hidden_directories.contains("a\\b"));
        assert!(!views.hidden_directories.contains("a"));
        assert!(views.is_hidden("A\\B"));
        assert_eq!(views.files, vec!["a\\c\\y.txt".to_string()]);
        // Removed entries stay in the directory index.
        assert_eq!(views.directory_index["a\\b"].len(), 1);
    }

    #[test]
    fn test_resolve_file_ignore_case() {
        let views = Views::build(&table_of(&["Data\\A.txt"]));
        assert_eq!(views.resolve_file("data\\a.txt", true), Some("Data\\A.txt"));
        assert_eq!(views.resolve_file("data\\a.txt", false), None);
        assert_eq!(views.resolve_file("Data\\A.txt", false), Some("Data\\A.txt"));
    }
}
