//! Fuzz target for table path normalization with arbitrary string input.
//!
//! Run with: cargo +nightly fuzz run table_path
//!
//! Properties checked for every accepted path:
//! - no leading or trailing separator
//! - no empty, `.` or `..` segment
//! - no reserved or control characters
//! - splitting and joining round-trips

#![no_main]

use assetpak::path;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(key) = path::normalize_checked(input) else {
        return;
    };

    assert!(!key.starts_with('\\') && !key.ends_with('\\'), "untrimmed: {:?}", key);
    assert!(!key.contains('/'), "forward slash kept: {:?}", key);
    for segment in key.split('\\') {
        assert!(
            !segment.is_empty() && segment != "." && segment != "..",
            "bad segment in {:?}",
            key
        );
    }
    assert!(!key.chars().any(char::is_control), "control char in {:?}", key);

    let (directory, file_name) = path::split(&key);
    assert_eq!(path::join(directory, file_name), key);
    assert!(path::is_in_directory(directory, directory, false));
    assert_eq!(path::ancestors(directory).last(), Some(""));
    assert_eq!(path::normalize_checked(&key).ok().as_deref(), Some(key.as_str()));
});
