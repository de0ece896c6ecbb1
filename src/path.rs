//! Table path normalization and splitting.
//!
//! Table keys are archive-internal paths using `\` as the separator, with no
//! leading or trailing separator. The root directory is the empty string.
//! Forward slashes are accepted on input and converted.
//!
//! ```
//! use assetpak::path;
//!
//! let key = path::normalize("data/texture/a.bmp");
//! assert_eq!(key, "data\\texture\\a.bmp");
//! assert_eq!(path::split(&key), ("data\\texture", "a.bmp"));
//! assert!(path::is_in_directory("data\\texture", "data", false));
//! assert!(!path::is_in_directory("database", "data", false));
//! ```

use crate::{Error, Result};

/// Separator used in table paths.
pub const SEPARATOR: char = '\\';

/// Maximum length for table paths (in bytes).
///
/// Container tables store names in fixed or length-prefixed fields; anything
/// longer than this is rejected before it reaches the table.
const MAX_PATH_LENGTH: usize = 4096;

/// Characters that cannot appear in a table path.
///
/// These are rejected so that every key can be extracted on Windows.
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Converts separators to `\` and trims leading and trailing separators.
///
/// Does not validate; see [`validate`].
pub fn normalize(path: &str) -> String {
    let converted: String = path
        .chars()
        .map(|c| if c == '/' { SEPARATOR } else { c })
        .collect();
    converted.trim_matches(SEPARATOR).to_string()
}

/// Validates a normalized table path.
///
/// # Errors
///
/// - [`Error::EmptyPath`] if the path is empty
/// - [`Error::InvalidCharacters`] for NUL or control characters, reserved
///   characters, `.`/`..` segments, or an over-long path
/// - [`Error::DoubleSeparator`] for consecutive separators
pub fn validate(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::EmptyPath { what: "path" });
    }

    if path.len() > MAX_PATH_LENGTH
        || path
            .chars()
            .any(|c| c.is_control() || INVALID_CHARS.contains(&c))
    {
        return Err(Error::InvalidCharacters {
            path: path.to_string(),
        });
    }

    if path.contains("\\\\") {
        return Err(Error::DoubleSeparator {
            path: path.to_string(),
        });
    }

    if path.split(SEPARATOR).any(|seg| seg == "." || seg == "..") {
        return Err(Error::InvalidCharacters {
            path: path.to_string(),
        });
    }

    Ok(())
}

/// Normalizes and validates a path in one step.
pub fn normalize_checked(path: &str) -> Result<String> {
    let normalized = normalize(path);
    validate(&normalized)?;
    Ok(normalized)
}

/// Normalizes a folder path. The root folder (empty string) is allowed.
pub fn normalize_folder(path: &str) -> Result<String> {
    let normalized = normalize(path);
    if !normalized.is_empty() {
        validate(&normalized)?;
    }
    Ok(normalized)
}

/// Splits a path into its directory and file name.
///
/// The directory of a root-level path is the empty string.
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATOR) {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Joins a directory and a name.
pub fn join(directory: &str, name: &str) -> String {
    if directory.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        directory.to_string()
    } else {
        format!("{}{}{}", directory, SEPARATOR, name)
    }
}

/// Returns true if `directory` is `folder` or lies beneath it.
///
/// This is a component-wise comparison: `data\texture` is in `data`, but
/// `database` is not. Every directory is in the root folder `""`.
pub fn is_in_directory(directory: &str, folder: &str, ignore_case: bool) -> bool {
    if folder.is_empty() {
        return true;
    }
    if ignore_case {
        return has_folder_prefix(&fold_case(directory), &fold_case(folder));
    }
    has_folder_prefix(directory, folder)
}

fn has_folder_prefix(directory: &str, folder: &str) -> bool {
    match directory.strip_prefix(folder) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// Returns true if `candidate` is a strict subfolder of `folder`.
pub fn is_subfolder(candidate: &str, folder: &str) -> bool {
    candidate != folder && is_in_directory(candidate, folder, false)
}

/// Replaces the leading `old` folder of `path` with `new`.
///
/// `path` must be in `old` (see [`is_in_directory`]); otherwise it is
/// returned unchanged.
pub fn replace_prefix(path: &str, old: &str, new: &str) -> String {
    if !is_in_directory(path, old, false) {
        return path.to_string();
    }
    let rest = path[old.len()..].trim_start_matches(SEPARATOR);
    join(new, rest)
}

/// Returns `directory` followed by each of its ancestors, ending with the
/// root `""`.
pub fn ancestors(directory: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(directory);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current.is_empty() {
            None
        } else {
            Some(split(current).0)
        };
        Some(current)
    })
}

/// Lowercases a path for case-insensitive comparisons.
pub(crate) fn fold_case(path: &str) -> String {
    path.to_lowercase()
}
