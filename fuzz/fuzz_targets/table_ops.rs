//! Fuzz target driving a table with an arbitrary sequence of operations.
//!
//! Run with: cargo +nightly fuzz run table_ops
//!
//! After every operation the derived views must agree with the rows:
//! every entry's directory is listed, live files are exactly the rows that
//! are not soft-deleted, and each row's key matches its entry's path.

#![no_main]

use assetpak::{SearchOption, Table};
use libfuzzer_sys::fuzz_target;

const NAMES: &[&str] = &["a", "b", "A", "a\\b", "a\\c", "d\\a", ""];
const FILES: &[&str] = &["x.txt", "y.bmp", "X.TXT"];

fn pick<'a>(items: &[&'a str], byte: u8) -> &'a str {
    items[byte as usize % items.len()]
}

fuzz_target!(|data: &[u8]| {
    let mut table = Table::new();
    for op in data.chunks_exact(4) {
        let folder = pick(NAMES, op[1]);
        let other = pick(NAMES, op[2]);
        let key = format!("{}\\{}", folder, pick(FILES, op[3]));
        let other_key = format!("{}\\{}", other, pick(FILES, op[3] >> 4));

        let _ = match op[0] % 10 {
            0 => table.add_bytes(&key, vec![op[3]], op[2] & 1 == 1).map(|_| ()),
            1 => table.delete_file(&key),
            2 => table.undo_delete_file(&key),
            3 => table.delete_folder(folder).map(|_| ()),
            4 => table.undo_delete_folder(folder).map(|_| ()),
            5 => table.rename(&key, &other_key, op[2] & 1 == 1).map(|_| ()),
            6 => table.rename_folder(folder, other).map(|_| ()),
            7 => match table.merge_folder(folder, other) {
                Ok(result) if op[3] & 1 == 1 => table.undo_merge_folder(result),
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            },
            8 => table.encrypt_file(&key).map(|_| ()),
            _ => table.remove_file(&key).map(|_| ()),
        };

        for (stored, entry) in table.iter() {
            assert_eq!(stored, entry.relative_path());
            assert!(table.directories().contains(&entry.directory_path()));
            assert_eq!(table.contains_file(stored), !entry.is_removed());
        }
        let all = table
            .get_files("", "", SearchOption::AllDirectories, true)
            .unwrap_or_default();
        assert_eq!(all.as_slice(), table.files());
    }
});
