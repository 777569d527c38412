// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side synchronization for a cage server.
//!
//! Keeps a bounded, deduplicated, newest-first view of a server's events and
//! debug logs. The server pushes small notifications; the engine answers each
//! one by pulling the new records and merging them into the cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ SyncEngine  │────►│ EventSource │────►│ cage-server │
//! │             │◄────│   (trait)   │◄────│  (HTTP/SSE) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ ClientStore │  (pure reducer over ClientState)
//! └─────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod transport;

pub use cache::CacheRecord;
pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult, TransportError, TransportResult};
pub use state::{Action, ClientState, ClientStore, ConnectionState, RecordKind};
pub use transport::{EventSource, HttpTransport, NotificationStream};

#[cfg(test)]
mod test_helpers;
