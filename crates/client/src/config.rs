// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the server, without a trailing slash.
    pub base_url: String,
    /// Events kept in the cache; the oldest are dropped first.
    pub max_events_in_memory: usize,
    /// Debug log entries kept in the cache.
    pub max_debug_logs: usize,
    /// Page size requested by the initial load.
    pub initial_page_size: usize,
    /// Maximum reconnection attempts.
    pub max_retries: u32,
    /// Initial delay for exponential backoff (milliseconds).
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts (seconds).
    pub max_delay_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            base_url: "http://127.0.0.1:3790".to_string(),
            max_events_in_memory: 1000,
            max_debug_logs: 1000,
            initial_page_size: 1000,
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_secs: 30,
        }
    }
}
