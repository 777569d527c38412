// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) file utilities.
//!
//! Append-only storage for JSON-serializable records. Writers never read the
//! file first; readers are lenient and skip lines they cannot parse.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Appends a record to a JSONL file with fsync for durability.
///
/// The line and its newline go out in a single `write_all` on a file opened
/// with `O_APPEND`, so concurrent appenders never interleave within a line.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.sync_all()?;

    Ok(())
}

/// Reads every parseable record from a JSONL file.
///
/// `visit` receives each record together with its raw line. Empty lines are
/// ignored; lines that fail to read or parse are skipped with a warning. A
/// missing file reads as empty. Returns the number of skipped lines.
pub fn read_lenient<T, F>(path: &Path, mut visit: F) -> usize
where
    T: DeserializeOwned,
    F: FnMut(T, &str),
{
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!("cannot open {}: {}", path.display(), e);
            return 0;
        }
    };

    let mut skipped = 0;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("{}:{}: unreadable line: {}", path.display(), index + 1, e);
                skipped += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(record) => visit(record, &line),
            Err(e) => {
                tracing::warn!("{}:{}: skipping malformed record: {}", path.display(), index + 1, e);
                skipped += 1;
            }
        }
    }

    skipped
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
