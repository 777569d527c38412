// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for client tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

use cage_core::timestamp::{self, SortKey};
use cage_core::{DebugLogEntry, Event, EventPage, EventType, LogLevel, Notification};

use crate::error::{TransportError, TransportResult};
use crate::transport::{BoxFuture, EventSource, NotificationStream};

/// Timestamp `minute` minutes past 10:00 on a fixed day.
pub fn ts(minute: u32) -> String {
    format!("2025-01-15T10:{minute:02}:00Z")
}

pub fn make_event(id: &str, minute: u32) -> Event {
    Event::new(ts(minute), EventType::PostToolUse, "s1")
        .with_tool("Bash")
        .with_id(id)
}

pub fn make_log(id: &str, minute: u32) -> DebugLogEntry {
    let mut entry = DebugLogEntry::new(ts(minute), LogLevel::Info, "ui", id);
    entry.id = Some(id.to_string());
    entry
}

/// In-memory stand-in for a server.
pub struct MockSource {
    events: Mutex<Vec<Event>>,
    logs: Mutex<Vec<DebugLogEntry>>,
    /// Bounds passed to `events_since`, in call order.
    since_calls: Mutex<Vec<String>>,
    failing_fetches: AtomicU32,
    failing_connects: AtomicU32,
    stream: Mutex<Option<mpsc::UnboundedReceiver<TransportResult<Notification>>>>,
    stream_tx: Mutex<Option<mpsc::UnboundedSender<TransportResult<Notification>>>>,
}

impl MockSource {
    pub fn new() -> Self {
        let (stream_tx, rx) = mpsc::unbounded_channel();
        MockSource {
            events: Mutex::new(Vec::new()),
            logs: Mutex::new(Vec::new()),
            since_calls: Mutex::new(Vec::new()),
            failing_fetches: AtomicU32::new(0),
            failing_connects: AtomicU32::new(0),
            stream: Mutex::new(Some(rx)),
            stream_tx: Mutex::new(Some(stream_tx)),
        }
    }

    /// Stores an event server-side.
    pub fn add_event(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn add_log(&self, entry: DebugLogEntry) {
        self.logs.lock().unwrap().push(entry);
    }

    /// Makes the next `n` fetches fail.
    pub fn fail_fetches(&self, n: u32) {
        self.failing_fetches.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` subscribe calls fail.
    pub fn fail_connects(&self, n: u32) {
        self.failing_connects.store(n, Ordering::SeqCst);
    }

    pub fn since_calls(&self) -> Vec<String> {
        self.since_calls.lock().unwrap().clone()
    }

    /// Sender feeding the notification stream.
    pub fn notifier(&self) -> mpsc::UnboundedSender<TransportResult<Notification>> {
        self.stream_tx.lock().unwrap().clone().unwrap()
    }

    /// Drops the source's own sender so the stream ends once every
    /// notifier is gone.
    pub fn close_stream(&self) {
        self.stream_tx.lock().unwrap().take();
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn at_or_after<T: Clone>(records: &[T], ts_of: impl Fn(&T) -> &str, since: &str) -> Vec<T> {
        let bound = timestamp::parse(since).unwrap();
        let mut out: Vec<T> = records
            .iter()
            .filter(|r| timestamp::parse(ts_of(r)).is_some_and(|at| at >= bound))
            .cloned()
            .collect();
        out.sort_by_cached_key(|r| SortKey::new(ts_of(r)));
        out
    }
}

impl EventSource for MockSource {
    fn list(&self, page: usize, limit: usize) -> BoxFuture<'_, TransportResult<EventPage>> {
        Box::pin(async move {
            let mut events = self.events.lock().unwrap().clone();
            events.sort_by_cached_key(|e| std::cmp::Reverse(SortKey::new(&e.timestamp)));
            let total = events.len();
            let start = (page - 1) * limit;
            let events: Vec<Event> = events.into_iter().skip(start).take(limit).collect();
            let has_more = start + events.len() < total;
            Ok(EventPage {
                events,
                total,
                page,
                limit,
                has_more,
            })
        })
    }

    fn events_since(&self, since: &str) -> BoxFuture<'_, TransportResult<Vec<Event>>> {
        let since = since.to_string();
        Box::pin(async move {
            self.since_calls.lock().unwrap().push(since.clone());
            if Self::take_failure(&self.failing_fetches) {
                return Err(TransportError::RequestFailed("mock failure".into()));
            }
            let events = self.events.lock().unwrap().clone();
            Ok(Self::at_or_after(&events, |e| &e.timestamp, &since))
        })
    }

    fn debug_logs_since(
        &self,
        since: &str,
        limit: usize,
    ) -> BoxFuture<'_, TransportResult<Vec<DebugLogEntry>>> {
        let since = since.to_string();
        Box::pin(async move {
            if Self::take_failure(&self.failing_fetches) {
                return Err(TransportError::RequestFailed("mock failure".into()));
            }
            let logs = self.logs.lock().unwrap().clone();
            let mut matched = Self::at_or_after(&logs, |l| &l.timestamp, &since);
            let excess = matched.len().saturating_sub(limit);
            matched.drain(..excess);
            Ok(matched)
        })
    }

    fn recent_debug_logs(
        &self,
        limit: usize,
    ) -> BoxFuture<'_, TransportResult<Vec<DebugLogEntry>>> {
        Box::pin(async move {
            let mut logs = self.logs.lock().unwrap().clone();
            logs.sort_by_cached_key(|l| std::cmp::Reverse(SortKey::new(&l.timestamp)));
            logs.truncate(limit);
            Ok(logs)
        })
    }

    fn subscribe(&self) -> BoxFuture<'_, TransportResult<NotificationStream>> {
        Box::pin(async move {
            if Self::take_failure(&self.failing_connects) {
                return Err(TransportError::ConnectionFailed("mock refused".into()));
            }
            let rx = self
                .stream
                .lock()
                .unwrap()
                .take()
                .ok_or(TransportError::ConnectionFailed("already subscribed".into()))?;
            let stream = futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });
            let stream: NotificationStream = Box::pin(stream);
            Ok(stream)
        })
    }
}
