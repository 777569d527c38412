// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::event::EventType;
use tempfile::TempDir;
use yare::parameterized;

fn event_at(ts: &str, session: &str, tool: &str) -> Event {
    Event::new(ts, EventType::PreToolUse, session).with_tool(tool)
}

fn timestamps(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.timestamp.as_str()).collect()
}

/// Store with three events on 2025-01-15 at 10:00, 10:01, 10:02.
fn three_event_store() -> (TempDir, EventStore) {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());
    for ts in [
        "2025-01-15T10:00:00Z",
        "2025-01-15T10:01:00Z",
        "2025-01-15T10:02:00Z",
    ] {
        store.write(&event_at(ts, "s1", "Bash")).unwrap();
    }
    (dir, store)
}

#[test]
fn write_creates_partition_layout() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());

    store
        .write(&event_at("2025-01-15T10:00:00Z", "s1", "Bash"))
        .unwrap();

    let path = dir.path().join(".cage/events/2025-01-15/events.jsonl");
    assert!(path.exists());
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn write_assigns_id_when_missing() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());

    let stored = store
        .write(&event_at("2025-01-15T10:00:00Z", "s1", "Bash"))
        .unwrap();
    assert!(stored.id.is_some());

    let kept = store
        .write(&event_at("2025-01-15T10:00:01Z", "s1", "Bash").with_id("mine"))
        .unwrap();
    assert_eq!(kept.id.as_deref(), Some("mine"));

    let listed = store.list(&ListQuery::page(1, 10)).events;
    assert_eq!(listed[0].id.as_deref(), Some("mine"));
    assert_eq!(listed[1].id, stored.id);
}

#[test]
fn write_rejects_undatable_timestamp() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());
    let err = store.write(&event_at("soon", "s1", "Bash")).unwrap_err();
    assert!(matches!(err, Error::InvalidTimestamp(_)));
}

#[test]
fn write_fails_when_root_is_a_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("blocker");
    std::fs::write(&root, "not a directory").unwrap();

    let store = EventStore::new(&root);
    let result = store.write(&event_at("2025-01-15T10:00:00Z", "s1", "Bash"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn list_returns_all_writes_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());

    // Written out of order on purpose
    let minutes = [7, 2, 9, 0, 5, 3, 8, 1, 6, 4];
    for m in minutes {
        store
            .write(&event_at(&format!("2025-01-15T10:0{m}:00Z"), "s1", "Bash"))
            .unwrap();
    }

    let page = store.list(&ListQuery::page(1, 100));
    assert_eq!(page.total, minutes.len());
    assert_eq!(page.events.len(), minutes.len());
    assert!(page
        .events
        .windows(2)
        .all(|w| timestamp::compare(&w[0].timestamp, &w[1].timestamp).is_gt()));
}

#[test]
fn list_paginates_by_index() {
    let (_dir, store) = three_event_store();

    let first = store.list(&ListQuery::page(1, 2));
    assert_eq!(
        timestamps(&first.events),
        vec!["2025-01-15T10:02:00Z", "2025-01-15T10:01:00Z"]
    );
    assert_eq!(first.total, 3);
    assert!(first.has_more);

    let second = store.list(&ListQuery::page(2, 2));
    assert_eq!(timestamps(&second.events), vec!["2025-01-15T10:00:00Z"]);
    assert_eq!(second.total, 3);
    assert!(!second.has_more);
}

#[test]
fn list_past_last_page_is_empty() {
    let (_dir, store) = three_event_store();
    let page = store.list(&ListQuery::page(5, 2));
    assert!(page.events.is_empty());
    assert!(!page.has_more);
}

#[parameterized(
    zero_page = { 0, 10 },
    zero_limit = { 1, 0 },
)]
fn list_invalid_paging_is_empty(page: usize, limit: usize) {
    let (_dir, store) = three_event_store();
    let result = store.list(&ListQuery::page(page, limit));
    assert!(result.events.is_empty());
    assert_eq!(result.total, 0);
}

#[parameterized(
    garbage = { "yesterday" },
    bad_day = { "2025-02-30" },
    wrong_order = { "15-01-2025" },
)]
fn list_malformed_date_is_empty(date: &str) {
    let (_dir, store) = three_event_store();
    let query = ListQuery {
        date: Some(date.to_string()),
        ..ListQuery::page(1, 10)
    };
    let result = store.list(&query);
    assert!(result.events.is_empty());
    assert_eq!(result.total, 0);
}

#[test]
fn list_missing_root_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path().join("never-created"));
    let page = store.list(&ListQuery::default());
    assert!(page.events.is_empty());
    assert_eq!(page.total, 0);
}

#[test]
fn list_filters_by_date_and_session() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());
    store.write(&event_at("2025-01-14T09:00:00Z", "a", "Read")).unwrap();
    store.write(&event_at("2025-01-15T09:00:00Z", "a", "Read")).unwrap();
    store.write(&event_at("2025-01-15T09:30:00Z", "b", "Edit")).unwrap();

    let by_date = store.list(&ListQuery {
        date: Some("2025-01-15".into()),
        ..ListQuery::page(1, 10)
    });
    assert_eq!(by_date.total, 2);

    let by_session = store.list(&ListQuery {
        session_id: Some("a".into()),
        ..ListQuery::page(1, 10)
    });
    assert_eq!(
        timestamps(&by_session.events),
        vec!["2025-01-15T09:00:00Z", "2025-01-14T09:00:00Z"]
    );

    let both = store.list(&ListQuery {
        date: Some("2025-01-15".into()),
        session_id: Some("b".into()),
        ..ListQuery::page(1, 10)
    });
    assert_eq!(timestamps(&both.events), vec!["2025-01-15T09:30:00Z"]);
}

#[test]
fn list_skips_malformed_lines() {
    let (dir, store) = three_event_store();
    let path = dir.path().join(".cage/events/2025-01-15/events.jsonl");
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("{not json\n");
    content.push_str("{\"timestamp\":\"2025-01-15T10:03:00Z\"}\n"); // missing eventType
    std::fs::write(&path, content).unwrap();

    let page = store.list(&ListQuery::page(1, 10));
    assert_eq!(page.total, 3);
}

#[test]
fn legacy_records_get_stable_ids() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());
    let partition = dir.path().join(".cage/events/2025-01-15");
    std::fs::create_dir_all(&partition).unwrap();
    std::fs::write(
        partition.join("events.jsonl"),
        "{\"timestamp\":\"2025-01-15T10:00:00Z\",\"eventType\":\"Stop\",\"sessionId\":\"s\"}\n",
    )
    .unwrap();

    let first = store.list(&ListQuery::default()).events;
    let second = store.since("2025-01-15T00:00:00Z");
    assert!(first[0].id.is_some());
    assert_eq!(first[0].id, second[0].id);
}

#[test]
fn tail_returns_most_recent_across_partitions() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());
    for ts in [
        "2025-01-13T12:00:00Z",
        "2025-01-14T08:00:00Z",
        "2025-01-14T09:00:00Z",
        "2025-01-15T07:00:00Z",
    ] {
        store.write(&event_at(ts, "s", "Bash")).unwrap();
    }

    assert_eq!(
        timestamps(&store.tail(3)),
        vec![
            "2025-01-15T07:00:00Z",
            "2025-01-14T09:00:00Z",
            "2025-01-14T08:00:00Z"
        ]
    );
    assert_eq!(store.tail(10).len(), 4);
    assert!(store.tail(0).is_empty());
}

#[test]
fn since_is_inclusive_and_ascending() {
    let (_dir, store) = three_event_store();
    let events = store.since("2025-01-15T10:01:00Z");
    assert_eq!(
        timestamps(&events),
        vec!["2025-01-15T10:01:00Z", "2025-01-15T10:02:00Z"]
    );
    assert!(events.iter().all(|e| e.id.is_some()));
}

#[test]
fn since_compares_instants_not_text() {
    let (_dir, store) = three_event_store();
    // Same instant as the 10:01 record, written with millisecond precision
    let events = store.since("2025-01-15T10:01:00.000Z");
    assert_eq!(events.len(), 2);
}

#[test]
fn since_skips_older_partitions_but_not_neighbours() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());
    store.write(&event_at("2025-01-10T23:00:00Z", "s", "Bash")).unwrap();
    store.write(&event_at("2025-01-14T23:59:00Z", "s", "Bash")).unwrap();
    // Written with an offset: same instant as 2025-01-15T01:00:00Z
    store
        .write(&event_at("2025-01-14T20:00:00-05:00", "s", "Bash"))
        .unwrap();
    store.write(&event_at("2025-01-15T02:00:00Z", "s", "Bash")).unwrap();

    let events = store.since("2025-01-15T00:00:00Z");
    assert_eq!(
        timestamps(&events),
        vec!["2025-01-14T20:00:00-05:00", "2025-01-15T02:00:00Z"]
    );
}

#[test]
fn since_malformed_bound_is_empty() {
    let (_dir, store) = three_event_store();
    assert!(store.since("ten o'clock").is_empty());
}

#[test]
fn stats_counts_tools_types_and_sessions() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());
    let rows = [
        ("2025-01-14T10:00:00Z", "s1", "Bash"),
        ("2025-01-14T10:01:00Z", "s1", "Read"),
        ("2025-01-15T10:02:00Z", "s2", "Bash"),
        ("2025-01-15T10:03:00Z", "s2", "Edit"),
        ("2025-01-15T10:04:00Z", "s1", "Bash"),
    ];
    for (ts, session, tool) in rows {
        store.write(&event_at(ts, session, tool)).unwrap();
    }

    let stats = store.stats(None);
    assert_eq!(stats.total_events, 5);
    assert_eq!(stats.unique_sessions, 2);
    assert_eq!(stats.tool_counts.get("Bash"), Some(&3));
    assert_eq!(stats.tool_counts.get("Read"), Some(&1));
    assert_eq!(stats.tool_counts.get("Edit"), Some(&1));
    assert_eq!(stats.tool_counts.values().sum::<usize>(), 5);
    assert_eq!(stats.event_type_counts.get("PreToolUse"), Some(&5));
    assert_eq!(
        stats.date_range,
        Some(DateRange {
            start: "2025-01-14".into(),
            end: "2025-01-15".into()
        })
    );

    let one_day = store.stats(Some("2025-01-14"));
    assert_eq!(one_day.total_events, 2);
    assert_eq!(one_day.unique_sessions, 1);
}

#[test]
fn stats_on_empty_or_bad_input() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());
    assert_eq!(store.stats(None), EventStats::default());
    assert_eq!(store.stats(Some("not-a-date")), EventStats::default());
}

#[test]
fn stats_wire_format() {
    let events = vec![event_at("2025-01-15T10:00:00Z", "s", "Bash")];
    let value = serde_json::to_value(EventStats::from_events(&events)).unwrap();
    assert_eq!(value["uniqueSessions"], 1);
    assert_eq!(value["toolCounts"]["Bash"], 1);
    assert_eq!(value["dateRange"]["start"], "2025-01-15");
}

#[test]
fn partitions_ignore_stray_entries() {
    let (dir, store) = three_event_store();
    let events_dir = dir.path().join(".cage/events");
    std::fs::create_dir_all(events_dir.join("scratch")).unwrap();
    std::fs::write(events_dir.join("2025-01-16"), "file, not dir").unwrap();

    let dates = store.partitions();
    assert_eq!(dates, vec![timestamp::parse_date("2025-01-15").unwrap()]);
}

#[test]
fn concurrent_writers_never_interleave_lines() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(dir.path());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    let mut event = event_at(&format!("2025-01-15T10:{t:02}:{i:02}Z"), "s", "Bash");
                    event.payload.insert("pad".into(), "x".repeat(512).into());
                    store.write(&event).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let page = store.list(&ListQuery::page(1, 1000));
    assert_eq!(page.total, 200);
}
