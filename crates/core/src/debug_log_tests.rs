// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    debug = { "debug", LogLevel::Debug },
    info = { "INFO", LogLevel::Info },
    warn = { "warn", LogLevel::Warn },
    warning = { "warning", LogLevel::Warn },
    error = { "Error", LogLevel::Error },
)]
fn level_parses(input: &str, expected: LogLevel) {
    assert_eq!(input.parse::<LogLevel>().unwrap(), expected);
}

#[test]
fn level_rejects_unknown() {
    let err = "fatal".parse::<LogLevel>().unwrap_err();
    assert!(matches!(err, Error::InvalidLogLevel(_)));
}

#[test]
fn levels_are_ordered_by_severity() {
    assert!(LogLevel::Debug < LogLevel::Info);
    assert!(LogLevel::Info < LogLevel::Warn);
    assert!(LogLevel::Warn < LogLevel::Error);
}

#[test]
fn entry_wire_format() {
    let entry = DebugLogEntry::new("2025-01-15T10:00:00Z", LogLevel::Warn, "sse", "dropped")
        .with_context(json!({"connection": 3}));
    let value = serde_json::to_value(&entry).unwrap();
    assert_eq!(value["level"], "warn");
    assert_eq!(value["context"]["connection"], 3);
    assert!(value.get("stackTrace").is_none());

    let parsed: DebugLogEntry = serde_json::from_value(json!({
        "timestamp": "2025-01-15T10:00:00Z",
        "level": "error",
        "component": "ui",
        "message": "boom",
        "stackTrace": "at main"
    }))
    .unwrap();
    assert_eq!(parsed.stack_trace.as_deref(), Some("at main"));
    assert!(parsed.id.is_none());
}

#[test]
fn entry_fields_default_when_missing() {
    let parsed: DebugLogEntry = serde_json::from_value(json!({"message": "hi"})).unwrap();
    assert_eq!(parsed.level, LogLevel::Info);
    assert!(parsed.timestamp.is_empty());
    assert!(parsed.component.is_empty());
}

#[test]
fn log_ids_are_prefixed_and_unique() {
    let a = new_log_id();
    assert!(a.starts_with("log-"));
    assert_ne!(a, new_log_id());
}
