//! Publish/subscribe fan-out to external consumers.
//!
//! UI-layer collaborators register callbacks per topic; the engine publishes
//! synchronously in registration order. A panicking callback is isolated and
//! logged, never allowed to starve later subscribers or reach the publisher.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;
use uuid::Uuid;

use crate::domain::{Order, OrderId};

/// Notification published by the engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    OrderCreated(Order),
    OrderFilled(Order),
    OrderCanceled(Order),
    OrderCleanedUp(OrderId),
    OrderRetried { old_id: OrderId, order: Order },
    /// Bulk change: a resync installed a fresh snapshot or a metrics refresh
    /// touched many orders at once.
    OrdersUpdated,
    SyncComplete { loaded: usize, skipped: usize },
    ConnectionError { message: String },
}

impl EngineEvent {
    /// The topic this event is published under.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::OrderCreated(_) => Topic::OrderCreated,
            Self::OrderFilled(_) => Topic::OrderFilled,
            Self::OrderCanceled(_) => Topic::OrderCanceled,
            Self::OrderCleanedUp(_) => Topic::OrderCleanedUp,
            Self::OrderRetried { .. } => Topic::OrderRetried,
            Self::OrdersUpdated => Topic::OrdersUpdated,
            Self::SyncComplete { .. } => Topic::SyncComplete,
            Self::ConnectionError { .. } => Topic::ConnectionError,
        }
    }
}

/// Subscription topics exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    OrderCreated,
    OrderFilled,
    OrderCanceled,
    OrderCleanedUp,
    OrderRetried,
    OrdersUpdated,
    SyncComplete,
    ConnectionError,
}

impl Topic {
    /// Stable name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "order-created",
            Self::OrderFilled => "order-filled",
            Self::OrderCanceled => "order-canceled",
            Self::OrderCleanedUp => "order-cleaned-up",
            Self::OrderRetried => "order-retried",
            Self::OrdersUpdated => "orders-updated",
            Self::SyncComplete => "sync-complete",
            Self::ConnectionError => "connection-error",
        }
    }
}

/// Handle identifying one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

type Listener = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Registry of per-topic subscriber callbacks.
pub struct SubscriptionHub {
    listeners: RwLock<HashMap<Topic, Vec<(SubscriptionId, Listener)>>>,
}

impl SubscriptionHub {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Register a callback for a topic. Multiple callbacks per topic are
    /// allowed and invoked in registration order.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        self.listeners
            .write()
            .entry(topic)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a previously registered callback. Returns whether anything was
    /// removed.
    pub fn unsubscribe(&self, topic: Topic, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        match listeners.get_mut(&topic) {
            Some(entries) => {
                let before = entries.len();
                entries.retain(|(entry_id, _)| *entry_id != id);
                entries.len() != before
            }
            None => false,
        }
    }

    /// Invoke every subscriber of the event's topic, in registration order.
    ///
    /// The listener list is snapshotted first, so callbacks may subscribe or
    /// unsubscribe reentrantly. A panic in one callback is caught and logged;
    /// the remaining callbacks still run.
    pub fn publish(&self, event: &EngineEvent) {
        let topic = event.topic();
        let snapshot: Vec<Listener> = match self.listeners.read().get(&topic) {
            Some(entries) => entries.iter().map(|(_, l)| l.clone()).collect(),
            None => return,
        };

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(topic = topic.as_str(), "Subscriber panicked during publish");
            }
        }
    }

    /// Number of callbacks registered for a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.listeners
            .read()
            .get(&topic)
            .map_or(0, std::vec::Vec::len)
    }
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new()
    }
}
