// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state.
//!
//! Built once at startup and handed to every request handler. Owns the
//! event store, the hub, the bus and the debug log buffer.

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;

use cage_core::EventStore;

use crate::bus::{self, EventBus};
use crate::capture::CaptureService;
use crate::config::ServerConfig;
use crate::hub::Hub;
use crate::log_buffer::DebugLogBuffer;

/// Messages the bus holds for a lagging subscriber before it skips ahead.
const BUS_CAPACITY: usize = 1024;

/// Shared server state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: EventStore,
    hub: Hub,
    bus: EventBus,
    logs: Arc<DebugLogBuffer>,
    capture: CaptureService,
}

impl AppState {
    /// Creates the state for the project rooted at `project_root`.
    pub fn new(project_root: &Path, config: ServerConfig) -> Self {
        let store = EventStore::new(project_root);
        let hub = Hub::new(config.heartbeat_interval());
        let bus = EventBus::new(BUS_CAPACITY);
        let logs = Arc::new(DebugLogBuffer::new(config.max_logs));
        let capture = CaptureService::new(store.clone(), bus.clone(), logs.clone());

        AppState {
            inner: Arc::new(AppStateInner {
                config,
                store,
                hub,
                bus,
                logs,
                capture,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &EventStore {
        &self.inner.store
    }

    pub fn hub(&self) -> &Hub {
        &self.inner.hub
    }

    pub fn logs(&self) -> &DebugLogBuffer {
        &self.inner.logs
    }

    pub fn capture(&self) -> &CaptureService {
        &self.inner.capture
    }

    /// Starts forwarding bus messages to the hub's connections.
    pub fn start_forwarder(&self) -> JoinHandle<()> {
        bus::spawn_hub_forwarder(&self.inner.bus, self.inner.hub.clone())
    }
}
