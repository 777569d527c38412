// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Captured hook events.
//!
//! An [`Event`] is one durable record of something the assistant did. The
//! fields the pipeline inspects (`timestamp`, `eventType`, `sessionId`,
//! `toolName`) are typed; everything else the hook sent travels in the
//! opaque `payload` map and is never interpreted.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Lifecycle tag of a captured event.
///
/// Serialized as the hook's PascalCase name. Tags written by other tools or
/// older versions survive a round-trip as [`EventType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    PreToolUse,
    PostToolUse,
    UserPromptSubmit,
    Notification,
    Stop,
    SubagentStop,
    PreCompact,
    SessionStart,
    SessionEnd,
    Other(String),
}

impl EventType {
    /// Every hook the capture endpoint exposes a route for.
    pub const HOOKS: [EventType; 9] = [
        EventType::PreToolUse,
        EventType::PostToolUse,
        EventType::UserPromptSubmit,
        EventType::Notification,
        EventType::Stop,
        EventType::SubagentStop,
        EventType::PreCompact,
        EventType::SessionStart,
        EventType::SessionEnd,
    ];

    /// The stored tag (e.g., "PreToolUse").
    pub fn as_str(&self) -> &str {
        match self {
            EventType::PreToolUse => "PreToolUse",
            EventType::PostToolUse => "PostToolUse",
            EventType::UserPromptSubmit => "UserPromptSubmit",
            EventType::Notification => "Notification",
            EventType::Stop => "Stop",
            EventType::SubagentStop => "SubagentStop",
            EventType::PreCompact => "PreCompact",
            EventType::SessionStart => "SessionStart",
            EventType::SessionEnd => "SessionEnd",
            EventType::Other(tag) => tag,
        }
    }

    /// The route segment for this hook (e.g., "pre-tool-use").
    ///
    /// Returns `None` for [`EventType::Other`], which has no route.
    pub fn route_name(&self) -> Option<&'static str> {
        match self {
            EventType::PreToolUse => Some("pre-tool-use"),
            EventType::PostToolUse => Some("post-tool-use"),
            EventType::UserPromptSubmit => Some("user-prompt-submit"),
            EventType::Notification => Some("notification"),
            EventType::Stop => Some("stop"),
            EventType::SubagentStop => Some("subagent-stop"),
            EventType::PreCompact => Some("pre-compact"),
            EventType::SessionStart => Some("session-start"),
            EventType::SessionEnd => Some("session-end"),
            EventType::Other(_) => None,
        }
    }

    /// Resolves a route segment to a known hook.
    pub fn from_route(name: &str) -> Option<Self> {
        Self::HOOKS
            .into_iter()
            .find(|hook| hook.route_name() == Some(name))
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "PreToolUse" => EventType::PreToolUse,
            "PostToolUse" => EventType::PostToolUse,
            "UserPromptSubmit" => EventType::UserPromptSubmit,
            "Notification" => EventType::Notification,
            "Stop" => EventType::Stop,
            "SubagentStop" => EventType::SubagentStop,
            "PreCompact" => EventType::PreCompact,
            "SessionStart" => EventType::SessionStart,
            "SessionEnd" => EventType::SessionEnd,
            _ => EventType::Other(tag),
        }
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured hook invocation, as stored in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Opaque identifier. Assigned on write; derived from content on read
    /// for records written without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// ISO-8601 timestamp; partition key and primary sort key.
    pub timestamp: String,
    pub event_type: EventType,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub arguments: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Execution time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    /// Remaining hook fields, kept verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
}

impl Event {
    /// Creates a bare event with no tool details.
    pub fn new(
        timestamp: impl Into<String>,
        event_type: EventType,
        session_id: impl Into<String>,
    ) -> Self {
        Event {
            id: None,
            timestamp: timestamp.into(),
            event_type,
            session_id: session_id.into(),
            tool_name: None,
            arguments: Map::new(),
            result: None,
            results: None,
            error: None,
            execution_time: None,
            payload: Map::new(),
        }
    }

    /// Sets the tool name.
    pub fn with_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    /// Sets the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the id, or an empty string if none has been assigned.
    pub fn id_or_empty(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Serializes to a single JSON line (no trailing newline).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Generates a fresh random event id.
pub fn new_id() -> String {
    format!("evt-{}", uuid::Uuid::new_v4().simple())
}

/// Derives a stable id from a stored line.
///
/// Used for records written without an id so every reader agrees on it.
pub fn derived_id(raw_line: &str) -> String {
    let digest = Sha256::digest(raw_line.trim().as_bytes());
    format!("evt-{}", hex::encode(&digest[..16]))
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
