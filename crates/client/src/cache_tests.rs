// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use cage_core::{EventType, LogLevel};
use yare::parameterized;

fn event(id: &str, minute: u32) -> Event {
    Event::new(
        format!("2025-01-15T10:{minute:02}:00Z"),
        EventType::PreToolUse,
        "s1",
    )
    .with_id(id)
}

fn ids(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.id_or_empty()).collect()
}

fn is_newest_first(events: &[Event]) -> bool {
    events
        .windows(2)
        .all(|w| SortKey::new(&w[0].timestamp) >= SortKey::new(&w[1].timestamp))
}

#[test]
fn merge_sorts_newest_first() {
    let merged = merge(vec![event("a", 1)], vec![event("c", 3), event("b", 2)], 10);
    assert_eq!(ids(&merged), vec!["c", "b", "a"]);
}

#[test]
fn merge_drops_known_ids() {
    let mut replayed = event("a", 1);
    replayed.session_id = "changed".into();
    let merged = merge(vec![event("a", 1)], vec![replayed, event("b", 2)], 10);

    assert_eq!(ids(&merged), vec!["b", "a"]);
    assert_eq!(merged[1].session_id, "s1");
}

#[test]
fn merge_drops_duplicates_within_a_batch() {
    let merged = merge(Vec::new(), vec![event("a", 1), event("a", 1), event("b", 2)], 10);
    assert_eq!(ids(&merged), vec!["b", "a"]);
}

#[test]
fn merge_is_idempotent() {
    let cache = vec![event("x", 5), event("y", 0)];
    let batch = vec![event("a", 1), event("b", 7), event("x", 5)];

    let once = merge(cache, batch.clone(), 4);
    let twice = merge(once.clone(), batch, 4);
    assert_eq!(once, twice);
}

#[test]
fn merge_order_does_not_depend_on_arrival() {
    let first = merge(merge(Vec::new(), vec![event("a", 1)], 10), vec![event("b", 1)], 10);
    let second = merge(merge(Vec::new(), vec![event("b", 1)], 10), vec![event("a", 1)], 10);
    assert_eq!(first, second);
}

#[parameterized(
    under = { 10, 6 },
    exact = { 6, 6 },
    over = { 3, 3 },
    zero = { 0, 0 },
)]
fn merge_respects_cap(cap: usize, expected: usize) {
    let cache: Vec<Event> = (0..3).map(|m| event(&format!("old{m}"), m)).collect();
    let batch: Vec<Event> = (3..6).map(|m| event(&format!("new{m}"), m)).collect();
    let merged = merge(cache, batch, cap);
    assert_eq!(merged.len(), expected);
    assert!(is_newest_first(&merged));
}

#[test]
fn truncation_keeps_the_newest() {
    let cache: Vec<Event> = vec![event("m9", 9), event("m1", 1)];
    let batch: Vec<Event> = vec![event("m5", 5), event("m0", 0), event("m7", 7)];
    let merged = merge(cache, batch, 3);
    assert_eq!(ids(&merged), vec!["m9", "m7", "m5"]);
}

#[test]
fn mixed_precision_timestamps_sort_by_instant() {
    let coarse = event("coarse", 1);
    let mut fine = event("fine", 0);
    fine.timestamp = "2025-01-15T10:00:30.500Z".into();
    let mut offset = event("offset", 0);
    offset.timestamp = "2025-01-15T05:02:00-05:00".into();

    let merged = merge(Vec::new(), vec![fine, offset, coarse], 10);
    assert_eq!(ids(&merged), vec!["offset", "coarse", "fine"]);
}

#[test]
fn id_less_records_collapse_only_when_identical() {
    let bare = Event::new("2025-01-15T10:00:00Z", EventType::Stop, "s1");
    let other = Event::new("2025-01-15T10:00:00Z", EventType::Stop, "s2");
    let merged = merge(vec![bare.clone()], vec![bare, other], 10);
    assert_eq!(merged.len(), 2);
}

#[test]
fn debug_logs_merge_by_id() {
    let log = |id: &str, second: u32| {
        let mut entry = DebugLogEntry::new(
            format!("2025-01-15T10:00:{second:02}Z"),
            LogLevel::Info,
            "ui",
            "m",
        );
        entry.id = Some(id.to_string());
        entry
    };
    let merged = merge(vec![log("a", 1)], vec![log("a", 1), log("b", 2)], 10);
    let ids: Vec<_> = merged.iter().map(|e| e.id.clone().unwrap()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[test]
fn newest_timestamp_is_temporal() {
    let mut a = event("a", 5);
    a.timestamp = "2025-01-15T10:05:00Z".into();
    let mut b = event("b", 0);
    b.timestamp = "2025-01-15T06:00:00-05:00".into();
    assert_eq!(newest_timestamp(&[a, b]), Some("2025-01-15T06:00:00-05:00"));
    assert_eq!(newest_timestamp::<Event>(&[]), None);
}
