// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync engine.
//!
//! Turns "something changed" notifications into incremental fetches and
//! merges the results into the client store.
//!
//! On `event_added` / `debug_log_added` the matching watermark moves forward
//! at once and a fetch from the fetch bound is spawned. Fetches are never
//! cancelled; overlapping ones merge harmlessly because merge dedups by id.
//! A failed fetch leaves a retry floor behind so the next fetch of that kind
//! starts low enough to pick up what was missed.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cage_core::timestamp;
use cage_core::Notification;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult, TransportError};
use crate::state::{Action, CacheLimits, ClientStore, RecordKind};
use crate::transport::{EventSource, HttpTransport, NotificationStream};

/// Keeps a [`ClientStore`] in sync with a server.
pub struct SyncEngine<S: EventSource + 'static = HttpTransport> {
    config: SyncConfig,
    source: Arc<S>,
    store: ClientStore,
}

impl SyncEngine<HttpTransport> {
    /// Create an engine talking HTTP to `config.base_url`.
    pub fn new(config: SyncConfig) -> Self {
        let transport = HttpTransport::new(config.base_url.clone());
        Self::with_source(config, transport)
    }
}

impl<S: EventSource + 'static> SyncEngine<S> {
    /// Create an engine over a custom source (for testing).
    pub fn with_source(config: SyncConfig, source: S) -> Self {
        let store = ClientStore::new(CacheLimits {
            max_events: config.max_events_in_memory,
            max_debug_logs: config.max_debug_logs,
        });
        SyncEngine {
            config,
            source: Arc::new(source),
            store,
        }
    }

    pub fn store(&self) -> &ClientStore {
        &self.store
    }

    /// Pulls the newest page of events and the newest debug logs, replacing
    /// whatever the cache held.
    pub async fn initial_load(&self) -> SyncResult<()> {
        let page = self
            .source
            .list(1, self.config.initial_page_size)
            .await?;
        let logs = self
            .source
            .recent_debug_logs(self.config.max_debug_logs)
            .await?;

        info!(
            "initial load: {} of {} events, {} debug logs",
            page.events.len(),
            page.total,
            logs.len()
        );
        self.store.dispatch(Action::EventsLoaded(page.events));
        self.store.dispatch(Action::DebugLogsLoaded(logs));
        Ok(())
    }

    /// Opens the notification stream once.
    pub async fn connect(&self) -> SyncResult<NotificationStream> {
        self.store.dispatch(Action::Connecting);
        match self.source.subscribe().await {
            Ok(stream) => {
                self.store.dispatch(Action::Opened);
                Ok(stream)
            }
            Err(e) => {
                self.store.dispatch(Action::Errored);
                self.store.dispatch(Action::Disconnected);
                Err(e.into())
            }
        }
    }

    /// Connect with exponential backoff retry.
    pub async fn connect_with_retry(&self) -> SyncResult<NotificationStream> {
        let mut attempt = 0;
        let mut delay_ms = self.config.initial_delay_ms;

        loop {
            attempt += 1;
            match self.connect().await {
                Ok(stream) => return Ok(stream),
                Err(e) if attempt >= self.config.max_retries => {
                    warn!("giving up after {} attempts: {}", attempt, e);
                    return Err(SyncError::MaxRetriesExceeded);
                }
                Err(e) => {
                    debug!("connect attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = std::cmp::min(
                        delay_ms.saturating_mul(2),
                        self.config.max_delay_secs.saturating_mul(1000),
                    );
                }
            }
        }
    }

    /// Reacts to one notification.
    ///
    /// Returns the spawned fetch, if the notification triggered one.
    pub fn handle_notification(&self, notification: Notification) -> Option<JoinHandle<()>> {
        let (kind, at) = match notification {
            Notification::EventAdded { timestamp, .. } => (RecordKind::Events, timestamp),
            Notification::DebugLogAdded { timestamp, .. } => (RecordKind::DebugLogs, timestamp),
            Notification::Connected | Notification::Heartbeat | Notification::Unknown => {
                return None;
            }
        };
        if timestamp::parse(&at).is_none() {
            debug!("ignoring {:?} notification with timestamp {:?}", kind, at);
            return None;
        }

        self.store.dispatch(Action::Notified {
            kind,
            timestamp: at,
        });
        let bound = self.store.fetch_bound(kind)?;
        Some(self.spawn_fetch(kind, bound))
    }

    /// Spawns an incremental fetch of `kind` from `bound`.
    ///
    /// The bound is fixed by the caller so that a burst of notifications
    /// handled before any fetch runs still fetches from each one's watermark.
    fn spawn_fetch(&self, kind: RecordKind, bound: String) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let store = self.store.clone();
        let limit = self.config.max_debug_logs;
        tokio::spawn(fetch_and_merge(source, store, kind, bound, limit))
    }

    /// Reads notifications until the stream ends or breaks.
    pub async fn consume(&self, mut stream: NotificationStream) {
        while let Some(item) = stream.next().await {
            match item {
                Ok(notification) => {
                    self.handle_notification(notification);
                }
                Err(TransportError::SerializationError(e)) => {
                    warn!("skipping unreadable notification: {}", e);
                }
                Err(e) => {
                    warn!("notification stream failed: {}", e);
                    self.store.dispatch(Action::Errored);
                    self.store.dispatch(Action::Disconnected);
                    return;
                }
            }
        }
        info!("notification stream closed");
        self.store.dispatch(Action::Closed);
        self.store.dispatch(Action::Disconnected);
    }

    /// Keeps the subscription alive until reconnecting gives up.
    ///
    /// After every (re)connect, both kinds are fetched from their bounds to
    /// cover anything announced while the stream was down.
    pub async fn run(&self) -> SyncResult<()> {
        loop {
            let stream = self.connect_with_retry().await?;
            for kind in [RecordKind::Events, RecordKind::DebugLogs] {
                if let Some(bound) = self.store.fetch_bound(kind) {
                    self.spawn_fetch(kind, bound);
                }
            }
            self.consume(stream).await;
        }
    }
}

async fn fetch_and_merge<S: EventSource>(
    source: Arc<S>,
    store: ClientStore,
    kind: RecordKind,
    bound: String,
    debug_log_limit: usize,
) {
    let outcome = match kind {
        RecordKind::Events => source
            .events_since(&bound)
            .await
            .map(|events| Action::EventsFetched {
                events,
                bound: bound.clone(),
            }),
        RecordKind::DebugLogs => source
            .debug_logs_since(&bound, debug_log_limit)
            .await
            .map(|logs| Action::DebugLogsFetched {
                logs,
                bound: bound.clone(),
            }),
    };

    match outcome {
        Ok(action) => store.dispatch(action),
        Err(e) => {
            warn!("fetch of {:?} since {} failed: {}", kind, bound, e);
            store.dispatch(Action::FetchFailed { kind, bound });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
