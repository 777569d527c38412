// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Notification hub: registry of open subscriber connections.
//!
//! Each connection gets a `connected` message on subscribe and a periodic
//! `heartbeat` until it goes away. [`Hub::broadcast`] serializes once and
//! writes to every connection without waiting on any of them. There is no
//! queueing, retry or acknowledgement: a connection whose write fails is
//! dropped from the registry after the loop, and that is the only way a dead
//! connection is noticed besides an explicit [`Hub::disconnect`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use cage_core::Notification;

/// Identifier of a registered connection.
pub type ConnectionId = u64;

/// Error writing a frame to a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The other end went away.
    #[error("connection closed")]
    Closed,

    /// The connection is not draining its frames.
    #[error("connection backlog full")]
    Full,
}

/// Outbound half of a subscriber connection.
///
/// `write` must not block: the hub calls it while holding the registry.
pub trait NotificationSink: Send {
    fn write(&mut self, frame: &str) -> Result<(), SinkError>;
}

/// Sink that hands frames to a bounded channel drained by the transport.
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    /// Creates a sink and the receiver the transport reads frames from.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (ChannelSink { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn write(&mut self, frame: &str) -> Result<(), SinkError> {
        self.tx.try_send(frame.to_string()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

struct Connection {
    sink: Box<dyn NotificationSink>,
    heartbeat: Option<JoinHandle<()>>,
}

impl Connection {
    fn stop(self) {
        if let Some(heartbeat) = self.heartbeat {
            heartbeat.abort();
        }
    }
}

struct HubInner {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
    heartbeat_interval: Duration,
}

/// Shared handle to the connection registry. Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    /// Creates an empty hub. A zero interval disables heartbeats.
    pub fn new(heartbeat_interval: Duration) -> Self {
        Hub {
            inner: Arc::new(HubInner {
                connections: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                heartbeat_interval,
            }),
        }
    }

    fn connections(&self) -> MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        self.inner
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a connection and greets it with `connected`.
    ///
    /// A sink that cannot take the greeting is never registered. Heartbeats
    /// need a tokio runtime; outside one the connection simply has none.
    pub fn subscribe(&self, mut sink: Box<dyn NotificationSink>) -> Result<ConnectionId, SinkError> {
        let greeting = frame(&Notification::connected()).ok_or(SinkError::Closed)?;
        sink.write(&greeting)?;

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let heartbeat = self.spawn_heartbeat(id);
        self.connections().insert(id, Connection { sink, heartbeat });

        tracing::info!("connection {} subscribed", id);
        Ok(id)
    }

    fn spawn_heartbeat(&self, id: ConnectionId) -> Option<JoinHandle<()>> {
        let period = self.inner.heartbeat_interval;
        if period.is_zero() {
            return None;
        }
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let hub = Arc::downgrade(&self.inner);
        // Anchored at subscribe time, not at the task's first poll.
        let start = Instant::now() + period;

        Some(runtime.spawn(heartbeat_loop(hub, id, start, period)))
    }

    /// Writes `notification` to every registered connection.
    ///
    /// Returns how many connections accepted it. Connections whose write
    /// failed are removed once the loop is done.
    pub fn broadcast(&self, notification: &Notification) -> usize {
        let Some(frame) = frame(notification) else {
            return 0;
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        let removed: Vec<Connection> = {
            let mut connections = self.connections();
            for (id, connection) in connections.iter_mut() {
                match connection.sink.write(&frame) {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        tracing::warn!("dropping connection {}: {}", id, e);
                        failed.push(*id);
                    }
                }
            }
            failed
                .iter()
                .filter_map(|id| connections.remove(id))
                .collect()
        };
        removed.into_iter().for_each(Connection::stop);

        delivered
    }

    /// Writes a frame to one connection, removing it if the write fails.
    ///
    /// Returns false if the connection is gone afterwards.
    fn send_to(&self, id: ConnectionId, frame: &str) -> bool {
        let removed = {
            let mut connections = self.connections();
            let Some(connection) = connections.get_mut(&id) else {
                return false;
            };
            match connection.sink.write(frame) {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!("dropping connection {}: {}", id, e);
                    connections.remove(&id)
                }
            }
        };
        removed.into_iter().for_each(Connection::stop);
        false
    }

    /// Removes a connection after its transport closed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.connections().remove(&id);
        match removed {
            Some(connection) => {
                connection.stop();
                tracing::info!("connection {} disconnected", id);
                true
            }
            None => false,
        }
    }

    /// Drops every connection. Their transports see end-of-stream.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Connection> = self.connections().drain().map(|(_, c)| c).collect();
        let count = drained.len();
        drained.into_iter().for_each(Connection::stop);
        count
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections().contains_key(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections().len()
    }
}

async fn heartbeat_loop(
    hub: Weak<HubInner>,
    id: ConnectionId,
    start: Instant,
    period: Duration,
) {
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let Some(beat) = frame(&Notification::heartbeat()) else {
        return;
    };

    loop {
        ticker.tick().await;
        let Some(inner) = hub.upgrade() else {
            return;
        };
        if !(Hub { inner }).send_to(id, &beat) {
            return;
        }
    }
}

fn frame(notification: &Notification) -> Option<String> {
    match notification.to_json() {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("refusing to send notification: {}", e);
            None
        }
    }
}

/// Disconnects a connection when dropped.
///
/// Held by the transport for as long as the connection is open.
pub struct ConnectionGuard {
    hub: Hub,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn new(hub: Hub, id: ConnectionId) -> Self {
        ConnectionGuard { hub, id }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.hub.disconnect(self.id);
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
