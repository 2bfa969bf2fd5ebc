//! Integration tests for the JSON file snapshot store
//!
//! These tests write real files into temporary directories and validate
//! the on-disk document format, recovery from missing or corrupt files,
//! and overwrite semantics.
//!
//! Run with: cargo test --package cardtap-storage --test json_file_store

use cardtap_core::{CardIdentifier, ScanRecord};
use cardtap_storage::{JsonFileStore, SnapshotStore, StorageError};
use chrono::{Duration, TimeZone, Utc};
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

fn id(hex: &str) -> CardIdentifier {
    CardIdentifier::parse(hex).unwrap()
}

fn records(uids: &[&str]) -> Vec<ScanRecord> {
    let base = Utc.with_ymd_and_hms(2025, 1, 15, 12, 30, 0).unwrap();
    uids.iter()
        .enumerate()
        .map(|(i, uid)| ScanRecord::new(id(uid), base - Duration::seconds(i as i64)))
        .collect()
}

#[test]
fn test_fresh_directory_loads_empty() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());

    assert!(store.try_load_history().unwrap().is_none());
    assert!(store.try_load_unique().unwrap().is_none());
    assert!(store.load_history().is_empty());
    assert!(store.load_unique().is_empty());
}

#[test]
fn test_history_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    let history = records(&["0A", "0B", "0A"]);

    store.save_history(&history).unwrap();

    assert!(store.history_path().exists());
    assert_eq!(store.load_history(), history);
}

#[test]
fn test_history_document_format() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());

    store.save_history(&records(&["04ABCDEF"])).unwrap();

    let text = fs::read_to_string(store.history_path()).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc[0]["uid"], "04ABCDEF");
    assert_eq!(doc[0]["timestamp"], "2025-01-15T12:30:00Z");
}

#[test]
fn test_unique_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    let ids = vec![id("0A"), id("0B"), id("DEADBEEF")];

    store.save_unique(&ids).unwrap();

    let text = fs::read_to_string(store.unique_path()).unwrap();
    assert!(text.contains("\"DEADBEEF\""));
    assert_eq!(store.load_unique(), ids);
}

#[test]
fn test_save_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("state").join("reader");
    let store = JsonFileStore::new(&nested);

    store.save_unique(&[id("0A")]).unwrap();

    assert!(nested.join("unique_uids.json").exists());
}

#[test]
fn test_save_overwrites_whole_document() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());

    store.save_history(&records(&["0A", "0B", "0C"])).unwrap();
    store.save_history(&records(&["0D"])).unwrap();

    let loaded = store.load_history();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].uid, id("0D"));
}

#[test]
fn test_no_temporary_files_left_behind() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());

    store.save_history(&records(&["0A"])).unwrap();
    store.save_unique(&[id("0A")]).unwrap();

    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["history.json", "unique_uids.json"]);
}

#[rstest]
#[case("")]
#[case("{")]
#[case("{\"uid\": \"0A\"}")]
#[case("[{\"uid\": \"XYZ\", \"timestamp\": \"2025-01-15T12:30:00Z\"}]")]
fn test_malformed_history_loads_empty(#[case] document: &str) {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    fs::write(store.history_path(), document).unwrap();

    assert!(matches!(
        store.try_load_history(),
        Err(StorageError::Malformed { .. })
    ));
    assert!(store.load_history().is_empty());
}

#[test]
fn test_malformed_unique_does_not_affect_history() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    store.save_history(&records(&["0A"])).unwrap();
    fs::write(store.unique_path(), "not json").unwrap();

    assert!(store.load_unique().is_empty());
    assert_eq!(store.load_history().len(), 1);
}

#[test]
fn test_lowercase_identifiers_are_normalized_on_load() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    fs::write(store.unique_path(), "[\"deadbeef\", \"0a\"]").unwrap();

    assert_eq!(store.load_unique(), vec![id("DEADBEEF"), id("0A")]);
}

#[test]
fn test_store_does_not_truncate_history() {
    // Capacity is the ledger's concern; the store persists what it is given.
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    let long: Vec<String> = (0..15).map(|i| format!("{i:02X}")).collect();
    let long: Vec<&str> = long.iter().map(String::as_str).collect();

    store.save_history(&records(&long)).unwrap();

    assert_eq!(store.load_history().len(), 15);
}

#[cfg(unix)]
#[test]
fn test_unwritable_directory_reports_io_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "file, not a directory").unwrap();
    let store = JsonFileStore::new(blocker.join("data"));

    assert!(matches!(
        store.save_history(&records(&["0A"])),
        Err(StorageError::Io { .. })
    ));
}
