// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Hook capture.
//!
//! Turns a raw hook payload into an [`Event`], persists it and announces it
//! on the bus. The caller is always acknowledged: a failed write is logged
//! and recorded as a debug log entry, never returned.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use cage_core::timestamp;
use cage_core::{DebugLogEntry, Event, EventStore, EventType, LogLevel};

use crate::bus::{BusMessage, EventBus};
use crate::log_buffer::DebugLogBuffer;

/// Component name on debug log entries raised by capture.
pub const CAPTURE_COMPONENT: &str = "capture";

/// Response returned to the hook caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureAck {
    pub success: bool,
    pub timestamp: String,
}

/// Builds an event from a hook payload.
///
/// Accepts both snake_case and camelCase keys. `tool_input` becomes
/// `arguments` and `tool_response` becomes `result`. The payload's own
/// timestamp is kept only if it parses; otherwise `received_at` is used.
pub fn build_event(event_type: EventType, payload: Value, received_at: &str) -> Event {
    let mut fields = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };

    let timestamp = take(&mut fields, &["timestamp"])
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|ts| timestamp::parse(ts).is_some())
        .unwrap_or_else(|| received_at.to_string());
    let session_id = take(&mut fields, &["session_id", "sessionId"])
        .and_then(as_text)
        .unwrap_or_default();

    let mut event = Event::new(timestamp, event_type, session_id);
    event.tool_name = take(&mut fields, &["tool_name", "toolName"]).and_then(as_text);
    event.arguments = match take(&mut fields, &["tool_input", "toolInput", "arguments"]) {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    event.result = take(&mut fields, &["tool_response", "toolResponse", "result"]);
    event.results = take(&mut fields, &["results"]);
    event.error = take(&mut fields, &["error"]).and_then(as_text);
    event.execution_time =
        take(&mut fields, &["execution_time", "executionTime"]).and_then(|v| v.as_f64());
    event.payload = fields;
    event
}

/// Removes the first non-null value found under any of `keys`.
fn take(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let mut found = None;
    for key in keys {
        if let Some(value) = fields.remove(*key) {
            if found.is_none() && !value.is_null() {
                found = Some(value);
            }
        }
    }
    found
}

fn as_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Persists captured events and ingested debug logs, then publishes them.
#[derive(Clone)]
pub struct CaptureService {
    store: EventStore,
    bus: EventBus,
    logs: Arc<DebugLogBuffer>,
}

impl CaptureService {
    pub fn new(store: EventStore, bus: EventBus, logs: Arc<DebugLogBuffer>) -> Self {
        CaptureService { store, bus, logs }
    }

    /// Captures one hook invocation. Never fails.
    pub async fn handle(&self, event_type: EventType, payload: Value) -> CaptureAck {
        let received_at = timestamp::now();
        let event = build_event(event_type, payload, &received_at);
        let store = self.store.clone();

        match tokio::task::spawn_blocking(move || store.write(&event)).await {
            Ok(Ok(stored)) => {
                tracing::debug!(
                    "captured {} for session {:?}",
                    stored.event_type,
                    stored.session_id
                );
                self.bus.publish(BusMessage::EventAdded(stored));
            }
            Ok(Err(e)) => self.report_failure(format!("failed to store event: {e}")),
            Err(e) => self.report_failure(format!("event write task failed: {e}")),
        }

        CaptureAck {
            success: true,
            timestamp: received_at,
        }
    }

    /// Stores debug log entries and publishes one notification per entry.
    pub fn ingest_logs(&self, entries: Vec<DebugLogEntry>) -> usize {
        let stored = self.logs.extend(entries);
        let count = stored.len();
        for entry in stored {
            self.bus.publish(BusMessage::DebugLogAdded(entry));
        }
        count
    }

    fn report_failure(&self, message: String) {
        tracing::error!("{}", message);
        let entry = DebugLogEntry::new(
            timestamp::now(),
            LogLevel::Error,
            CAPTURE_COMPONENT,
            message,
        );
        self.ingest_logs(vec![entry]);
    }
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;
