// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server configuration.
//!
//! Loaded from `.cage/config.toml` under the project root. Every field is
//! optional; a missing file yields the defaults.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::log_buffer::DEFAULT_MAX_LOGS;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Seconds between heartbeats on each stream. 0 disables them.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Capacity of the debug log ring buffer.
    #[serde(default = "default_max_logs")]
    pub max_logs: usize,
    /// Frames buffered per stream before the connection counts as failed.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3790))
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_max_logs() -> usize {
    DEFAULT_MAX_LOGS
}

fn default_stream_buffer() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            max_logs: default_max_logs(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

impl ServerConfig {
    /// Loads `config.toml` from `state_dir`, falling back to defaults when absent.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(CONFIG_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content).map_err(|e| ServerError::Config {
            path,
            message: e.to_string(),
        })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
