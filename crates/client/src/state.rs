// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client state and the reducer that evolves it.
//!
//! Every change goes through [`reduce`], a pure function from the current
//! state and an [`Action`] to the next state. [`ClientStore`] owns the one
//! live copy and publishes each new state to watchers.

use std::cmp::Ordering;
use std::sync::Arc;

use tokio::sync::watch;

use cage_core::timestamp;
use cage_core::{DebugLogEntry, Event};

use crate::cache::{self, CacheRecord};

/// State of the notification subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Attempting to connect.
    Connecting,
    /// Receiving notifications.
    Open,
    /// The stream failed.
    Error,
    /// The server ended the stream.
    Closed,
}

/// The two kinds of record the client keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Events,
    DebugLogs,
}

/// Cache capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    pub max_events: usize,
    pub max_debug_logs: usize,
}

/// Everything the client knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientState {
    /// Newest first.
    pub events: Vec<Event>,
    /// Newest first.
    pub debug_logs: Vec<DebugLogEntry>,
    pub connection: ConnectionState,
    pub streaming: bool,
    pub last_event_timestamp: Option<String>,
    pub last_debug_log_timestamp: Option<String>,
    /// Lower bound of an event fetch that failed and has not been retried.
    pub event_retry_floor: Option<String>,
    pub debug_log_retry_floor: Option<String>,
}

impl ClientState {
    pub fn watermark(&self, kind: RecordKind) -> Option<&str> {
        match kind {
            RecordKind::Events => self.last_event_timestamp.as_deref(),
            RecordKind::DebugLogs => self.last_debug_log_timestamp.as_deref(),
        }
    }

    pub fn retry_floor(&self, kind: RecordKind) -> Option<&str> {
        match kind {
            RecordKind::Events => self.event_retry_floor.as_deref(),
            RecordKind::DebugLogs => self.debug_log_retry_floor.as_deref(),
        }
    }

    /// Lower bound for the next incremental fetch: the retry floor if one is
    /// pending, otherwise the watermark.
    pub fn fetch_bound(&self, kind: RecordKind) -> Option<String> {
        match (self.retry_floor(kind), self.watermark(kind)) {
            (Some(floor), Some(mark)) => Some(earliest(floor, mark).to_string()),
            (Some(floor), None) => Some(floor.to_string()),
            (None, mark) => mark.map(str::to_string),
        }
    }

    fn watermark_mut(&mut self, kind: RecordKind) -> &mut Option<String> {
        match kind {
            RecordKind::Events => &mut self.last_event_timestamp,
            RecordKind::DebugLogs => &mut self.last_debug_log_timestamp,
        }
    }

    fn retry_floor_mut(&mut self, kind: RecordKind) -> &mut Option<String> {
        match kind {
            RecordKind::Events => &mut self.event_retry_floor,
            RecordKind::DebugLogs => &mut self.debug_log_retry_floor,
        }
    }
}

/// A state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Connecting,
    Opened,
    Errored,
    Closed,
    Disconnected,
    /// Replace the event cache with a fresh snapshot.
    EventsLoaded(Vec<Event>),
    /// Replace the debug log cache with a fresh snapshot.
    DebugLogsLoaded(Vec<DebugLogEntry>),
    /// A notification announced a record with this timestamp.
    Notified {
        kind: RecordKind,
        timestamp: String,
    },
    /// An incremental event fetch from `bound` succeeded.
    EventsFetched { events: Vec<Event>, bound: String },
    /// An incremental debug log fetch from `bound` succeeded.
    DebugLogsFetched {
        logs: Vec<DebugLogEntry>,
        bound: String,
    },
    /// An incremental fetch from `bound` failed.
    FetchFailed { kind: RecordKind, bound: String },
}

/// Computes the state that follows `action`.
///
/// Connection transitions that do not apply to the current state are
/// ignored. Watermarks only move forward.
pub fn reduce(mut state: ClientState, action: Action, limits: &CacheLimits) -> ClientState {
    use ConnectionState as C;

    match action {
        Action::Connecting => {
            if matches!(state.connection, C::Disconnected | C::Error | C::Closed) {
                state.connection = C::Connecting;
            }
        }
        Action::Opened => {
            if state.connection == C::Connecting {
                state.connection = C::Open;
                state.streaming = true;
            }
        }
        Action::Errored => {
            if matches!(state.connection, C::Connecting | C::Open) {
                state.connection = C::Error;
                state.streaming = false;
            }
        }
        Action::Closed => {
            if matches!(state.connection, C::Connecting | C::Open) {
                state.connection = C::Closed;
                state.streaming = false;
            }
        }
        Action::Disconnected => {
            state.connection = C::Disconnected;
            state.streaming = false;
        }
        Action::EventsLoaded(events) => {
            state.events = cache::merge(Vec::new(), events, limits.max_events);
            state.event_retry_floor = None;
            if let Some(newest) = cache::newest_timestamp(&state.events).map(str::to_string) {
                advance(&mut state.last_event_timestamp, newest);
            }
        }
        Action::DebugLogsLoaded(logs) => {
            state.debug_logs = cache::merge(Vec::new(), logs, limits.max_debug_logs);
            state.debug_log_retry_floor = None;
            if let Some(newest) = cache::newest_timestamp(&state.debug_logs).map(str::to_string) {
                advance(&mut state.last_debug_log_timestamp, newest);
            }
        }
        Action::Notified { kind, timestamp } => {
            advance(state.watermark_mut(kind), timestamp);
        }
        Action::EventsFetched { events, bound } => {
            state.events = merge_into(state.events, events, limits.max_events);
            settle(state.retry_floor_mut(RecordKind::Events), &bound);
        }
        Action::DebugLogsFetched { logs, bound } => {
            state.debug_logs = merge_into(state.debug_logs, logs, limits.max_debug_logs);
            settle(state.retry_floor_mut(RecordKind::DebugLogs), &bound);
        }
        Action::FetchFailed { kind, bound } => {
            let floor = state.retry_floor_mut(kind);
            *floor = Some(match floor.take() {
                Some(existing) => earliest(&existing, &bound).to_string(),
                None => bound,
            });
        }
    }
    state
}

fn merge_into<T: CacheRecord>(cached: Vec<T>, incoming: Vec<T>, cap: usize) -> Vec<T> {
    if incoming.is_empty() {
        return cached;
    }
    cache::merge(cached, incoming, cap)
}

fn earliest<'a>(a: &'a str, b: &'a str) -> &'a str {
    match timestamp::compare(a, b) {
        Ordering::Greater => b,
        _ => a,
    }
}

/// Moves a watermark forward to `candidate` if it is later.
fn advance(mark: &mut Option<String>, candidate: String) {
    let later = match mark {
        Some(current) => timestamp::compare(&candidate, current) == Ordering::Greater,
        None => true,
    };
    if later {
        *mark = Some(candidate);
    }
}

/// Clears a retry floor once a fetch starting at or before it succeeded.
fn settle(floor: &mut Option<String>, bound: &str) {
    let covered = floor
        .as_deref()
        .is_some_and(|pending| timestamp::compare(bound, pending) != Ordering::Greater);
    if covered {
        *floor = None;
    }
}

/// Owner of the live [`ClientState`]. Cheap to clone.
#[derive(Clone)]
pub struct ClientStore {
    tx: Arc<watch::Sender<ClientState>>,
    limits: CacheLimits,
}

impl ClientStore {
    pub fn new(limits: CacheLimits) -> Self {
        let (tx, _) = watch::channel(ClientState::default());
        ClientStore {
            tx: Arc::new(tx),
            limits,
        }
    }

    /// Applies `action` and notifies watchers.
    pub fn dispatch(&self, action: Action) {
        self.tx.send_modify(|state| {
            let current = std::mem::take(state);
            *state = reduce(current, action, &self.limits);
        });
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> ClientState {
        self.tx.borrow().clone()
    }

    pub fn fetch_bound(&self, kind: RecordKind) -> Option<String> {
        self.tx.borrow().fetch_bound(kind)
    }

    /// Watches for state changes.
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
