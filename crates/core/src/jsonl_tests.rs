// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestRecord {
    id: u32,
    name: String,
}

fn read_records(path: &Path) -> (Vec<TestRecord>, usize) {
    let mut records = Vec::new();
    let skipped = read_lenient(path, |record: TestRecord, _raw| records.push(record));
    (records, skipped)
}

#[test]
fn append_creates_file_if_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    let record = TestRecord {
        id: 1,
        name: "first".into(),
    };
    append(&path, &record).unwrap();

    assert!(path.exists());
}

#[test]
fn append_writes_one_line_per_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    for id in 0..3 {
        append(&path, &TestRecord { id, name: format!("r{id}") }).unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.ends_with('\n'));
    assert!(!content.contains('['));
}

#[test]
fn append_fails_when_parent_is_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope").join("test.jsonl");
    assert!(append(&path, &TestRecord { id: 1, name: "x".into() }).is_err());
}

#[test]
fn read_lenient_returns_empty_for_missing_file() {
    let dir = TempDir::new().unwrap();
    let (records, skipped) = read_records(&dir.path().join("missing.jsonl"));
    assert!(records.is_empty());
    assert_eq!(skipped, 0);
}

#[test]
fn append_and_read_preserve_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    let r1 = TestRecord {
        id: 1,
        name: "first".into(),
    };
    let r2 = TestRecord {
        id: 2,
        name: "second".into(),
    };

    append(&path, &r1).unwrap();
    append(&path, &r2).unwrap();

    let (records, _) = read_records(&path);
    assert_eq!(records, vec![r1, r2]);
}

#[test]
fn read_lenient_skips_empty_and_malformed_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    std::fs::write(
        &path,
        "{\"id\":1,\"name\":\"a\"}\n\n{\"id\":2,\"na\n{\"id\":\"three\",\"name\":\"c\"}\n{\"id\":4,\"name\":\"d\"}\n",
    )
    .unwrap();

    let (records, skipped) = read_records(&path);
    assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 4]);
    assert_eq!(skipped, 2);
}

#[test]
fn read_lenient_passes_raw_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");
    std::fs::write(&path, "{\"id\":7,\"name\":\"g\"}\n").unwrap();

    let mut raws = Vec::new();
    read_lenient(&path, |_: TestRecord, raw| raws.push(raw.to_string()));
    assert_eq!(raws, vec!["{\"id\":7,\"name\":\"g\"}".to_string()]);
}
