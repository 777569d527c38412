// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus with typed topics.
//!
//! Persistence publishes here once a record is stored; fan-out and any other
//! in-process listener subscribe independently. Backed by a tokio broadcast
//! channel, so a slow subscriber lags (and is told so) instead of blocking
//! publishers.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use cage_core::{DebugLogEntry, Event, Notification};

use crate::hub::Hub;

/// Topics a subscriber can listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    EventAdded,
    DebugLogAdded,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::EventAdded, Topic::DebugLogAdded];
}

/// A message published on the bus. Carries the full record.
#[derive(Debug, Clone)]
pub enum BusMessage {
    EventAdded(Event),
    DebugLogAdded(DebugLogEntry),
}

impl BusMessage {
    pub fn topic(&self) -> Topic {
        match self {
            BusMessage::EventAdded(_) => Topic::EventAdded,
            BusMessage::DebugLogAdded(_) => Topic::DebugLogAdded,
        }
    }

    /// The size-bounded notification announcing this message to clients.
    pub fn notification(&self) -> Notification {
        match self {
            BusMessage::EventAdded(event) => Notification::event_added(event),
            BusMessage::DebugLogAdded(entry) => Notification::debug_log_added(entry),
        }
    }
}

/// Publish/subscribe hub for in-process listeners.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusMessage>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    /// Publishes a message. Returns how many subscribers will see it.
    pub fn publish(&self, msg: BusMessage) -> usize {
        self.tx.send(msg).unwrap_or_default()
    }

    /// Subscribes to the given topics.
    pub fn subscribe(&self, topics: &[Topic]) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            topics: topics.to_vec(),
        }
    }
}

/// Receiving half of a bus subscription.
pub struct Subscription {
    rx: broadcast::Receiver<BusMessage>,
    topics: Vec<Topic>,
}

impl Subscription {
    /// Waits for the next message on a subscribed topic.
    ///
    /// Returns `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.rx.recv().await {
                Ok(msg) if self.topics.contains(&msg.topic()) => return Some(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("bus subscriber lagged by {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Forwards every bus message to the hub as a notification.
pub fn spawn_hub_forwarder(bus: &EventBus, hub: Hub) -> JoinHandle<()> {
    let mut subscription = bus.subscribe(&Topic::ALL);
    tokio::spawn(async move {
        while let Some(msg) = subscription.recv().await {
            let delivered = hub.broadcast(&msg.notification());
            tracing::debug!("{:?} delivered to {} connections", msg.topic(), delivered);
        }
    })
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
