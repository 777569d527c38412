// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for cage-core operations.

use thiserror::Error;

/// All possible errors that can occur in cage-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid timestamp: '{0}'\n  hint: timestamps must be RFC 3339, e.g. 2025-01-15T10:01:00Z")]
    InvalidTimestamp(String),

    #[error("invalid log level: '{0}'\n  hint: valid levels are: debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("notification too large: {0} bytes (limit {limit})", limit = crate::notification::MAX_NOTIFICATION_BYTES)]
    NotificationTooLarge(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for cage-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
