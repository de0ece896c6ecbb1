//! Concurrent access to shared entries.

mod common;

use std::sync::Arc;
use std::thread;

use assetpak::codec::ZlibCodec;
use common::{CountingCodec, archived_table, archived_table_with_codec};

const THREADS: usize = 8;
const ROUNDS: usize = 5;

#[test]
fn test_decompression_is_single_flight_per_entry() {
    let codec = Arc::new(CountingCodec::default());
    let table = archived_table_with_codec(&[("data\\big.bin", &[7u8; 4096])], codec.clone());
    let entry = Arc::clone(&table["data\\big.bin"]);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let entry = Arc::clone(&entry);
            scope.spawn(move || {
                for _ in 0..ROUNDS {
                    let data = entry.decompressed_data().unwrap();
                    assert_eq!(data.len(), 4096);
                }
            });
        }
    });

    assert_eq!(codec.calls(), THREADS * ROUNDS);
    assert_eq!(codec.max_in_flight(), 1);
}

#[test]
fn test_distinct_entries_decompress_in_parallel() {
    let codec = Arc::new(CountingCodec::default());
    let files: Vec<(String, Vec<u8>)> = (0..THREADS)
        .map(|i| (format!("data\\{}.bin", i), vec![i as u8; 1024]))
        .collect();
    let refs: Vec<(&str, &[u8])> = files
        .iter()
        .map(|(path, data)| (path.as_str(), data.as_slice()))
        .collect();
    let table = archived_table_with_codec(&refs, codec.clone());

    thread::scope(|scope| {
        for entry in table.entries() {
            scope.spawn(move || {
                for _ in 0..ROUNDS {
                    entry.decompressed_data().unwrap();
                }
            });
        }
    });

    assert_eq!(codec.calls(), THREADS * ROUNDS);
    assert!(codec.max_in_flight() >= 1);
}

#[test]
fn test_readers_share_table_across_threads() {
    let table = archived_table(&[("a.txt", b"alpha"), ("b.txt", b"beta")]);
    let table = &table;

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(move || {
                assert_eq!(table.files().len(), 2);
                assert_eq!(table["a.txt"].decompressed_data().unwrap(), b"alpha");
                assert!(table.find_file("B.TXT", true).is_some());
            });
        }
    });
}

#[test]
fn test_compressed_reads_do_not_block_other_entries() {
    let codec = Arc::new(ZlibCodec::default());
    let table = archived_table_with_codec(&[("a.txt", b"alpha"), ("b.txt", b"beta")], codec);
    let a = Arc::clone(&table["a.txt"]);
    let b = Arc::clone(&table["b.txt"]);

    let (ra, rb) = thread::scope(|scope| {
        let ha = scope.spawn(|| a.compressed_data().unwrap());
        let hb = scope.spawn(|| b.decompressed_data().unwrap());
        (ha.join().unwrap(), hb.join().unwrap())
    });
    assert_eq!(ra.len() as u64, a.size_compressed());
    assert_eq!(rb, b"beta");
}
