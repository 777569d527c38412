// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp helpers shared by the store and the client cache.
//!
//! Records carry their timestamp as an ISO-8601 string. Ordering is temporal
//! when the string parses as RFC 3339; strings that do not parse sort before
//! every parseable one, then lexically among themselves. That keeps the
//! ordering total so it is safe to hand to `sort_by`.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format used for partition directory names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current time in the canonical wire format (UTC, millisecond precision, `Z`).
pub fn now() -> String {
    format(Utc::now())
}

/// Formats a UTC instant in the canonical wire format.
pub fn format(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp into UTC.
pub fn parse(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Returns the calendar date portion of a timestamp (the text before `T`).
///
/// This is the partition key: a record lands in the directory named after
/// the date it was written with, not after its UTC date.
pub fn date_portion(ts: &str) -> Option<NaiveDate> {
    let date = ts.split(['T', 't', ' ']).next()?;
    parse_date(date)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// Total-order sort key for a timestamp string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    instant: Option<DateTime<Utc>>,
    raw: String,
}

impl SortKey {
    pub fn new(ts: &str) -> Self {
        SortKey {
            instant: parse(ts),
            raw: ts.to_string(),
        }
    }

    /// The parsed instant, if the timestamp was valid RFC 3339.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.instant
    }
}

/// Compares two timestamp strings with the same ordering as [`SortKey`].
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
