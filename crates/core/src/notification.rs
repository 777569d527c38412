// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push notifications sent from the server to subscribed clients.
//!
//! A notification only says that something changed; it never carries an
//! event body. Clients that care re-query the store with the timestamp it
//! carries. Every serialized notification stays under
//! [`MAX_NOTIFICATION_BYTES`]: the constructors clip string fields to byte
//! budgets measured after JSON escaping, and [`Notification::to_json`]
//! refuses anything that still would not fit.

use serde::{Deserialize, Serialize};

use crate::debug_log::{DebugLogEntry, LogLevel};
use crate::error::{Error, Result};
use crate::event::Event;

/// Upper bound (exclusive) on the serialized size of a notification.
pub const MAX_NOTIFICATION_BYTES: usize = 200;

const EVENT_TYPE_BUDGET: usize = 32;
const SESSION_ID_BUDGET: usize = 56;
const TIMESTAMP_BUDGET: usize = 35;
const COMPONENT_BUDGET: usize = 64;

/// Messages pushed from server to client over the event stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Sent once, immediately after subscribing.
    Connected,

    /// Keep-alive.
    Heartbeat,

    /// An event was appended to the store.
    EventAdded {
        #[serde(rename = "eventType")]
        event_type: String,
        #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        timestamp: String,
    },

    /// A debug log entry was ingested.
    DebugLogAdded {
        level: LogLevel,
        component: String,
        timestamp: String,
    },

    /// Any type this build does not know about.
    #[serde(other)]
    Unknown,
}

impl Notification {
    /// Creates a Connected message.
    pub fn connected() -> Self {
        Notification::Connected
    }

    /// Creates a Heartbeat message.
    pub fn heartbeat() -> Self {
        Notification::Heartbeat
    }

    /// Creates an EventAdded message describing a stored event.
    pub fn event_added(event: &Event) -> Self {
        let session_id = (!event.session_id.is_empty())
            .then(|| clip_escaped(&event.session_id, SESSION_ID_BUDGET));
        Notification::EventAdded {
            event_type: clip_escaped(event.event_type.as_str(), EVENT_TYPE_BUDGET),
            session_id,
            timestamp: clip_escaped(&event.timestamp, TIMESTAMP_BUDGET),
        }
    }

    /// Creates a DebugLogAdded message describing an ingested entry.
    pub fn debug_log_added(entry: &DebugLogEntry) -> Self {
        Notification::DebugLogAdded {
            level: entry.level,
            component: clip_escaped(&entry.component, COMPONENT_BUDGET),
            timestamp: clip_escaped(&entry.timestamp, TIMESTAMP_BUDGET),
        }
    }

    /// The watermark timestamp this notification carries, if any.
    pub fn timestamp(&self) -> Option<&str> {
        match self {
            Notification::EventAdded { timestamp, .. }
            | Notification::DebugLogAdded { timestamp, .. } => Some(timestamp),
            _ => None,
        }
    }

    /// Serializes the message to JSON, enforcing the size bound.
    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        if json.len() >= MAX_NOTIFICATION_BYTES {
            return Err(Error::NotificationTooLarge(json.len()));
        }
        Ok(json)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Bytes `c` occupies once escaped inside a JSON string.
fn escaped_len(c: char) -> usize {
    match c {
        '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0c}' => 2,
        c if (c as u32) < 0x20 => 6,
        c => c.len_utf8(),
    }
}

/// Longest prefix of `s` whose escaped form fits in `budget` bytes.
fn clip_escaped(s: &str, budget: usize) -> String {
    let mut used = 0;
    let mut end = 0;
    for (index, c) in s.char_indices() {
        used += escaped_len(c);
        if used > budget {
            break;
        }
        end = index + c.len_utf8();
    }
    s[..end].to_string()
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
