// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! cage-core: Shared library for the cage event pipeline
//!
//! This crate provides the event and debug-log data model, the push
//! notification protocol, and the append-only, date-partitioned event store
//! used by both the cage server and its clients.

pub mod debug_log;
pub mod error;
pub mod event;
pub mod jsonl;
pub mod notification;
pub mod store;
pub mod timestamp;

pub use debug_log::{DebugLogEntry, LogLevel};
pub use error::{Error, Result};
pub use event::{Event, EventType};
pub use notification::{Notification, MAX_NOTIFICATION_BYTES};
pub use store::{DateRange, EventPage, EventStats, EventStore, ListQuery};
