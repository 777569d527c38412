// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only, date-partitioned event log.
//!
//! Layout: `<root>/.cage/events/<YYYY-MM-DD>/events.jsonl`, one JSON object
//! per line. A record is never rewritten once appended. Writers append a
//! single line without reading the file; readers load whole partitions and
//! skip lines they cannot parse. There is no lock between the two.
//!
//! Queries never fail: a missing root, a malformed date or an invalid page
//! all read as an empty result.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::event::{derived_id, new_id, Event};
use crate::jsonl;
use crate::timestamp::{self, SortKey, DATE_FORMAT};

/// Name of the hidden state directory under the project root.
pub const STATE_DIR_NAME: &str = ".cage";
const EVENTS_DIR_NAME: &str = "events";
const PARTITION_FILE_NAME: &str = "events.jsonl";

/// Page size used when a caller does not pass one.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Parameters for [`EventStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
    /// Restrict to one partition (`YYYY-MM-DD`).
    pub date: Option<String>,
    pub session_id: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            date: None,
            session_id: None,
        }
    }
}

impl ListQuery {
    pub fn page(page: usize, limit: usize) -> Self {
        ListQuery {
            page,
            limit,
            ..Default::default()
        }
    }
}

/// One page of events, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub events: Vec<Event>,
    /// Number of matching events before pagination.
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
}

impl EventPage {
    fn empty(page: usize, limit: usize) -> Self {
        EventPage {
            events: Vec::new(),
            total: 0,
            page,
            limit,
            has_more: false,
        }
    }
}

/// First and last calendar dates observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Aggregate counts over a set of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub total_events: usize,
    pub unique_sessions: usize,
    pub tool_counts: BTreeMap<String, usize>,
    pub event_type_counts: BTreeMap<String, usize>,
    pub date_range: Option<DateRange>,
}

impl EventStats {
    /// Reduces a set of events to their aggregate counts.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut stats = EventStats::default();
        let mut sessions = HashSet::new();
        let mut first: Option<NaiveDate> = None;
        let mut last: Option<NaiveDate> = None;

        for event in events {
            stats.total_events += 1;
            if let Some(tool) = &event.tool_name {
                *stats.tool_counts.entry(tool.clone()).or_default() += 1;
            }
            *stats
                .event_type_counts
                .entry(event.event_type.as_str().to_string())
                .or_default() += 1;
            if !event.session_id.is_empty() {
                sessions.insert(event.session_id.as_str());
            }
            if let Some(date) = timestamp::date_portion(&event.timestamp) {
                first = Some(first.map_or(date, |d| d.min(date)));
                last = Some(last.map_or(date, |d| d.max(date)));
            }
        }

        stats.unique_sessions = sessions.len();
        if let (Some(start), Some(end)) = (first, last) {
            stats.date_range = Some(DateRange {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        stats
    }
}

/// Handle to the on-disk event log. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventStore {
    events_dir: PathBuf,
}

impl EventStore {
    /// Opens the store under `<project_root>/.cage/events`.
    ///
    /// Nothing is created until the first write.
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        EventStore {
            events_dir: project_root
                .as_ref()
                .join(STATE_DIR_NAME)
                .join(EVENTS_DIR_NAME),
        }
    }

    /// Path of the partition file for `date`.
    pub fn partition_path(&self, date: NaiveDate) -> PathBuf {
        self.events_dir
            .join(date.format(DATE_FORMAT).to_string())
            .join(PARTITION_FILE_NAME)
    }

    /// Appends an event to the partition named after its timestamp's date.
    ///
    /// Assigns a fresh id when the event has none and returns the record as
    /// stored.
    pub fn write(&self, event: &Event) -> Result<Event> {
        let date = timestamp::date_portion(&event.timestamp)
            .ok_or_else(|| Error::InvalidTimestamp(event.timestamp.clone()))?;

        let mut stored = event.clone();
        if stored.id.is_none() {
            stored.id = Some(new_id());
        }

        let path = self.partition_path(date);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        jsonl::append(&path, &stored)?;

        Ok(stored)
    }

    /// Returns one page of events, newest first.
    pub fn list(&self, query: &ListQuery) -> EventPage {
        if query.page == 0 || query.limit == 0 {
            return EventPage::empty(query.page, query.limit);
        }

        let mut events = match &query.date {
            Some(date) => match timestamp::parse_date(date) {
                Some(date) => self.read_partition(date),
                None => return EventPage::empty(query.page, query.limit),
            },
            None => self.read_all(),
        };

        if let Some(session_id) = &query.session_id {
            events.retain(|e| &e.session_id == session_id);
        }
        sort_newest_first(&mut events);

        let total = events.len();
        let start = (query.page - 1).saturating_mul(query.limit);
        let page: Vec<Event> = events
            .into_iter()
            .skip(start)
            .take(query.limit)
            .collect();
        let has_more = start.saturating_add(page.len()) < total;

        EventPage {
            events: page,
            total,
            page: query.page,
            limit: query.limit,
            has_more,
        }
    }

    /// Returns the `count` most recent events, newest first.
    ///
    /// Walks partitions from the newest date backward and stops as soon as
    /// enough events have been collected.
    pub fn tail(&self, count: usize) -> Vec<Event> {
        if count == 0 {
            return Vec::new();
        }

        let mut events = Vec::new();
        for date in self.partitions().into_iter().rev() {
            events.extend(self.read_partition(date));
            if events.len() >= count {
                break;
            }
        }

        sort_newest_first(&mut events);
        events.truncate(count);
        events
    }

    /// Returns every event at or after `since`, oldest first.
    ///
    /// The bound is inclusive so a client re-querying from its watermark sees
    /// the boundary record again rather than missing a same-instant sibling.
    /// Only partitions that can hold such events are read. A `since` that is
    /// not valid RFC 3339 yields nothing.
    pub fn since(&self, since: &str) -> Vec<Event> {
        let Some(bound) = timestamp::parse(since) else {
            return Vec::new();
        };
        // A record written with a UTC offset can sit one calendar day away
        // from its UTC date.
        let first_date = timestamp::date_portion(since)
            .unwrap_or_else(|| bound.date_naive())
            .min(bound.date_naive())
            .checked_sub_days(Days::new(1))
            .unwrap_or(NaiveDate::MIN);

        let mut events: Vec<Event> = self
            .partitions()
            .into_iter()
            .filter(|date| *date >= first_date)
            .flat_map(|date| self.read_partition(date))
            .filter(|e| timestamp::parse(&e.timestamp).is_some_and(|at| at >= bound))
            .collect();

        events.sort_by_cached_key(|e| SortKey::new(&e.timestamp));
        events
    }

    /// Aggregates counts over one partition, or over all of them.
    pub fn stats(&self, date: Option<&str>) -> EventStats {
        let events = match date {
            Some(date) => match timestamp::parse_date(date) {
                Some(date) => self.read_partition(date),
                None => return EventStats::default(),
            },
            None => self.read_all(),
        };
        EventStats::from_events(&events)
    }

    /// Dates that have a partition directory, oldest first.
    pub fn partitions(&self) -> Vec<NaiveDate> {
        let entries = match fs::read_dir(&self.events_dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("cannot list {}: {}", self.events_dir.display(), e);
                }
                return Vec::new();
            }
        };

        let mut dates: Vec<NaiveDate> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| timestamp::parse_date(&entry.file_name().to_string_lossy()))
            .collect();
        dates.sort();
        dates
    }

    fn read_all(&self) -> Vec<Event> {
        self.partitions()
            .into_iter()
            .flat_map(|date| self.read_partition(date))
            .collect()
    }

    fn read_partition(&self, date: NaiveDate) -> Vec<Event> {
        let mut events = Vec::new();
        jsonl::read_lenient(&self.partition_path(date), |mut event: Event, raw| {
            if event.id.is_none() {
                event.id = Some(derived_id(raw));
            }
            events.push(event);
        });
        events
    }
}

fn sort_newest_first(events: &mut [Event]) {
    events.sort_by_cached_key(|e| std::cmp::Reverse(SortKey::new(&e.timestamp)));
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
