// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded in-memory ring buffer of debug log entries.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use cage_core::debug_log::new_log_id;
use cage_core::timestamp::{self, SortKey};
use cage_core::{DebugLogEntry, LogLevel};

/// Default number of entries kept before the oldest is evicted.
pub const DEFAULT_MAX_LOGS: usize = 10_000;

/// Default number of entries a query returns.
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Filters for [`DebugLogBuffer::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Minimum severity.
    pub level: Option<LogLevel>,
    pub component: Option<String>,
    pub limit: usize,
    /// Inclusive lower bound; switches the result to oldest-first.
    pub since: Option<String>,
}

impl Default for LogQuery {
    fn default() -> Self {
        LogQuery {
            level: None,
            component: None,
            limit: DEFAULT_LOG_LIMIT,
            since: None,
        }
    }
}

pub struct DebugLogBuffer {
    entries: Mutex<VecDeque<DebugLogEntry>>,
    capacity: usize,
}

impl DebugLogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        DebugLogBuffer {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<DebugLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores an entry, evicting the oldest when full.
    ///
    /// Fills in a missing id, replaces a missing or unreadable timestamp
    /// with the current time, and returns the entry as stored.
    pub fn push(&self, mut entry: DebugLogEntry) -> DebugLogEntry {
        if entry.id.is_none() {
            entry.id = Some(new_log_id());
        }
        if timestamp::parse(&entry.timestamp).is_none() {
            entry.timestamp = timestamp::now();
        }

        let mut entries = self.entries();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    /// Stores every entry in order, returning them as stored.
    pub fn extend(&self, entries: impl IntoIterator<Item = DebugLogEntry>) -> Vec<DebugLogEntry> {
        entries.into_iter().map(|entry| self.push(entry)).collect()
    }

    /// Newest-first entries matching `query`, or oldest-first when `since`
    /// is set. Either way at most `limit` entries, always the newest ones.
    pub fn query(&self, query: &LogQuery) -> Vec<DebugLogEntry> {
        if query.limit == 0 {
            return Vec::new();
        }
        let bound = match &query.since {
            Some(since) => match timestamp::parse(since) {
                Some(bound) => Some(bound),
                None => return Vec::new(),
            },
            None => None,
        };

        let mut matched: Vec<DebugLogEntry> = self
            .entries()
            .iter()
            .filter(|e| query.level.is_none_or(|min| e.level >= min))
            .filter(|e| query.component.as_ref().is_none_or(|c| &e.component == c))
            .filter(|e| {
                bound.is_none_or(|b| timestamp::parse(&e.timestamp).is_some_and(|at| at >= b))
            })
            .cloned()
            .collect();

        matched.sort_by_cached_key(|e| std::cmp::Reverse(SortKey::new(&e.timestamp)));
        matched.truncate(query.limit);
        if bound.is_some() {
            matched.reverse();
        }
        matched
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DebugLogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOGS)
    }
}

#[cfg(test)]
#[path = "log_buffer_tests.rs"]
mod tests;
