//! The order synchronization & cache engine.
//!
//! Wires the request governor, ledger gateway, order cache, connection
//! supervisor, deal-metrics calculator, and subscription hub into one
//! facade. External collaborators (the UI layer) only ever touch
//! [`SyncEngine`]: query methods, fill/cancel predicates, and the
//! subscribe/unsubscribe surface.

pub mod cache;
pub mod gateway;
pub mod governor;
pub mod hub;
pub mod metrics;
pub mod supervisor;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::domain::{Address, DisplayStatus, LedgerConstants, Order, OrderId, OrderStatus};
use crate::port::{LedgerEventStream, LedgerReader, PriceFeed, TokenDirectory};

pub use cache::{CacheChange, OrderCache};
pub use gateway::{BulkLoadReport, LedgerGateway};
pub use governor::{GovernorConfig, RequestGovernor};
pub use hub::{EngineEvent, SubscriptionHub, SubscriptionId, Topic};
pub use metrics::DealMetricsCalculator;
pub use supervisor::{ConnectionState, ConnectionSupervisor, ReconnectionConfig, SyncConfig};

/// Combined engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub governor: GovernorConfig,
    pub reconnect: ReconnectionConfig,
    pub sync: SyncConfig,
}

/// The engine facade: one instance per ledger connection.
///
/// `start()` spawns the supervisor task (the cache's single writer);
/// everything else is a synchronous read over in-memory state. The lifecycle
/// is single-use: after `stop()` a fresh engine must be constructed.
pub struct SyncEngine {
    cache: Arc<OrderCache>,
    hub: Arc<SubscriptionHub>,
    calculator: Arc<DealMetricsCalculator>,
    gateway: Arc<LedgerGateway>,
    governor: Arc<RequestGovernor>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    supervisor: Mutex<Option<ConnectionSupervisor>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Build an engine over the given ledger backend and feeds.
    #[must_use]
    pub fn new(
        reader: Arc<dyn LedgerReader>,
        stream: Box<dyn LedgerEventStream>,
        prices: Arc<dyn PriceFeed>,
        tokens: Arc<dyn TokenDirectory>,
        config: EngineConfig,
    ) -> Self {
        let governor = Arc::new(RequestGovernor::new(config.governor));
        let gateway = Arc::new(LedgerGateway::new(reader, governor.clone()));
        let cache = Arc::new(OrderCache::new());
        let hub = Arc::new(SubscriptionHub::new());
        let calculator = Arc::new(DealMetricsCalculator::new(tokens, prices));

        let (supervisor, state_rx) = ConnectionSupervisor::new(
            gateway.clone(),
            cache.clone(),
            hub.clone(),
            calculator.clone(),
            stream,
            config.reconnect,
            config.sync,
        );
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            cache,
            hub,
            calculator,
            gateway,
            governor,
            state_rx,
            shutdown_tx,
            supervisor: Mutex::new(Some(supervisor)),
            task: Mutex::new(None),
        }
    }

    /// Spawn the supervisor task. Returns `false` if already started.
    pub fn start(&self) -> bool {
        let Some(supervisor) = self.supervisor.lock().take() else {
            warn!("Engine already started");
            return false;
        };
        let shutdown_rx = self.shutdown_tx.subscribe();
        *self.task.lock() = Some(tokio::spawn(supervisor.run(shutdown_rx)));
        true
    }

    /// Tear down the live feed and stop the supervisor.
    ///
    /// Results of reads still in flight are discarded; the cache stops
    /// changing before this returns.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// A watch receiver for observing state transitions.
    #[must_use]
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Snapshot of cached orders with deal metrics attached, optionally
    /// filtered by ledger status.
    #[must_use]
    pub fn orders(&self, filter: Option<OrderStatus>) -> Vec<Order> {
        self.cache.list(filter)
    }

    /// Look up one order.
    #[must_use]
    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.cache.get(id)
    }

    /// Session constants, once the first sync has fetched them.
    #[must_use]
    pub fn constants(&self) -> Option<LedgerConstants> {
        self.gateway.constants_cached()
    }

    /// Whether `account` may fill `order` right now.
    ///
    /// Answers `false` until the first sync has fetched the session
    /// constants.
    #[must_use]
    pub fn can_fill(&self, order: &Order, account: &Address) -> bool {
        self.constants()
            .is_some_and(|c| order.can_fill(account, &c, unix_now()))
    }

    /// Whether `account` may cancel `order` right now.
    #[must_use]
    pub fn can_cancel(&self, order: &Order, account: &Address) -> bool {
        self.constants()
            .is_some_and(|c| order.can_cancel(account, &c, unix_now()))
    }

    /// The status to display for `order`, deriving `Expired` once the
    /// session constants are known.
    #[must_use]
    pub fn status_label(&self, order: &Order) -> DisplayStatus {
        match self.constants() {
            Some(constants) => order.display_status(&constants, unix_now()),
            None => match order.status {
                OrderStatus::Active => DisplayStatus::Active,
                OrderStatus::Filled => DisplayStatus::Filled,
                OrderStatus::Canceled => DisplayStatus::Canceled,
            },
        }
    }

    /// Register a callback for an engine topic.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.hub.subscribe(topic, callback)
    }

    /// Remove a previously registered callback.
    pub fn unsubscribe(&self, topic: Topic, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(topic, id)
    }

    /// Recompute deal metrics for every cached order, then notify
    /// subscribers of the bulk change. Hooked to the price feed's refresh.
    pub fn refresh_deal_metrics(&self) -> usize {
        let touched = self.calculator.refresh_all(&self.cache);
        self.hub.publish(&EngineEvent::OrdersUpdated);
        touched
    }

    /// Drop several orders a consumer confirmed were cleaned up in one
    /// ledger transaction.
    pub fn remove_orders(&self, ids: &[OrderId]) -> usize {
        let removed = self.cache.remove(ids);
        if removed > 0 {
            self.hub.publish(&EngineEvent::OrdersUpdated);
        }
        removed
    }

    /// The shared request governor, for driving auxiliary reads (e.g. the
    /// price feed refresh loop) under the same pacing policy.
    #[must_use]
    pub fn governor(&self) -> Arc<RequestGovernor> {
        self.governor.clone()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
