// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Merge rules for the client cache.
//!
//! A cache is a `Vec` kept newest-first with no two records sharing a key.
//! [`merge`] is the only way records enter it.

use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::HashSet;

use cage_core::timestamp::SortKey;
use cage_core::{DebugLogEntry, Event};

/// A record the cache can hold.
pub trait CacheRecord: Clone {
    /// Identity used for deduplication.
    fn key(&self) -> Cow<'_, str>;

    fn timestamp(&self) -> &str;
}

impl CacheRecord for Event {
    /// The id, or the record's own JSON when it has none, so identical
    /// id-less records still collapse.
    fn key(&self) -> Cow<'_, str> {
        match &self.id {
            Some(id) => Cow::Borrowed(id),
            None => Cow::Owned(self.to_json().unwrap_or_default()),
        }
    }

    fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

impl CacheRecord for DebugLogEntry {
    fn key(&self) -> Cow<'_, str> {
        match &self.id {
            Some(id) => Cow::Borrowed(id),
            None => Cow::Owned(serde_json::to_string(self).unwrap_or_default()),
        }
    }

    fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Merges `incoming` into `existing`.
///
/// Records whose key is already present are dropped, the union is sorted
/// newest-first (ties broken by key), then truncated to `cap` keeping the
/// newest. Merging the same batch twice changes nothing the second time.
pub fn merge<T: CacheRecord>(existing: Vec<T>, incoming: Vec<T>, cap: usize) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut merged: Vec<T> = existing
        .into_iter()
        .chain(incoming)
        .filter(|r| seen.insert(r.key().into_owned()))
        .collect();

    merged.sort_by_cached_key(|r| (Reverse(SortKey::new(r.timestamp())), r.key().into_owned()));
    merged.truncate(cap);
    merged
}

/// Timestamp of the newest record, if any.
pub fn newest_timestamp<T: CacheRecord>(records: &[T]) -> Option<&str> {
    records
        .iter()
        .map(CacheRecord::timestamp)
        .max_by_key(|ts| SortKey::new(ts))
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
