//! Connection lifecycle state machine.
//!
//! Drives the gateway through bulk resynchronization, arms the live event
//! feed, and recovers from failures with exponential backoff. The run loop
//! is the cache's single writer; stopping the supervisor deterministically
//! ceases all cache effects, discarding any in-flight read results.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::domain::{LedgerEvent, Order};
use crate::engine::cache::{CacheChange, OrderCache};
use crate::engine::gateway::LedgerGateway;
use crate::engine::hub::{EngineEvent, SubscriptionHub};
use crate::engine::metrics::DealMetricsCalculator;
use crate::error::LedgerError;
use crate::port::LedgerEventStream;

/// Lifecycle state of the engine's ledger connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Syncing,
    Live,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    /// Stable name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Syncing => "syncing",
            Self::Live => "live",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }
}

/// Reconnection backoff configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconnectionConfig {
    /// First reconnection delay, in milliseconds.
    pub initial_delay_ms: u64,
    /// Delay ceiling, in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each failure.
    pub backoff_multiplier: f64,
    /// Consecutive failures tolerated before entering `Failed`.
    pub max_attempts: u32,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            max_attempts: 10,
        }
    }
}

/// Bulk resynchronization configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Slots read per governed batch during resync.
    pub batch_size: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

enum BackoffOutcome {
    Retry,
    GiveUp,
    Shutdown,
}

enum LiveStep {
    Shutdown,
    Event(Option<LedgerEvent>),
}

/// Owns the connection lifecycle and is the cache's only writer.
pub struct ConnectionSupervisor {
    gateway: Arc<LedgerGateway>,
    cache: Arc<OrderCache>,
    hub: Arc<SubscriptionHub>,
    calculator: Arc<DealMetricsCalculator>,
    stream: Box<dyn LedgerEventStream>,
    reconnect: ReconnectionConfig,
    sync: SyncConfig,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionSupervisor {
    /// Create a supervisor and the receiver observing its connection state.
    pub fn new(
        gateway: Arc<LedgerGateway>,
        cache: Arc<OrderCache>,
        hub: Arc<SubscriptionHub>,
        calculator: Arc<DealMetricsCalculator>,
        stream: Box<dyn LedgerEventStream>,
        reconnect: ReconnectionConfig,
        sync: SyncConfig,
    ) -> (Self, watch::Receiver<ConnectionState>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        (
            Self {
                gateway,
                cache,
                hub,
                calculator,
                stream,
                reconnect,
                sync,
                state_tx,
            },
            state_rx,
        )
    }

    /// Run the lifecycle until shutdown or the reconnection ceiling.
    ///
    /// After entering `Failed` the loop parks until `stop()` so that the
    /// terminal state stays observable; the final state on return is always
    /// `Disconnected`, except that the park preserves `Failed` until the
    /// shutdown actually arrives.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut failures: u32 = 0;
        let mut delay_ms = self.reconnect.initial_delay_ms;

        'lifecycle: loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(ConnectionState::Connecting);
            let connected = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break 'lifecycle,
                result = self.stream.connect() => result,
            };
            if let Err(err) = connected {
                warn!(error = %err, venue = self.stream.venue(), "Failed to reach the ledger feed");
                self.set_state(ConnectionState::Reconnecting);
                match self.backoff(&mut shutdown, &mut failures, &mut delay_ms).await {
                    BackoffOutcome::Retry => continue,
                    BackoffOutcome::GiveUp => {
                        wait_for_shutdown(&mut shutdown).await;
                        break 'lifecycle;
                    }
                    BackoffOutcome::Shutdown => break 'lifecycle,
                }
            }

            self.set_state(ConnectionState::Syncing);
            let synced = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break 'lifecycle,
                result = self.resync() => result,
            };
            match synced {
                Ok((loaded, skipped)) => {
                    failures = 0;
                    delay_ms = self.reconnect.initial_delay_ms;
                    self.set_state(ConnectionState::Live);
                    self.hub
                        .publish(&EngineEvent::SyncComplete { loaded, skipped });
                }
                Err(err) => {
                    warn!(error = %err, "Bulk resync failed");
                    self.set_state(ConnectionState::Reconnecting);
                    match self.backoff(&mut shutdown, &mut failures, &mut delay_ms).await {
                        BackoffOutcome::Retry => continue,
                        BackoffOutcome::GiveUp => {
                            wait_for_shutdown(&mut shutdown).await;
                            break 'lifecycle;
                        }
                        BackoffOutcome::Shutdown => break 'lifecycle,
                    }
                }
            }

            // Live: apply events in arrival order until the feed drops.
            loop {
                let step = tokio::select! {
                    _ = wait_for_shutdown(&mut shutdown) => LiveStep::Shutdown,
                    event = self.stream.next_event() => LiveStep::Event(event),
                };
                match step {
                    LiveStep::Shutdown => break 'lifecycle,
                    LiveStep::Event(None) => {
                        warn!("Ledger event stream ended unexpectedly");
                        break;
                    }
                    LiveStep::Event(Some(LedgerEvent::Disconnected { reason })) => {
                        warn!(reason = %reason, "Ledger feed disconnected");
                        break;
                    }
                    LiveStep::Event(Some(event)) => self.apply_live_event(event),
                }
            }

            self.set_state(ConnectionState::Reconnecting);
            match self.backoff(&mut shutdown, &mut failures, &mut delay_ms).await {
                BackoffOutcome::Retry => {}
                BackoffOutcome::GiveUp => {
                    wait_for_shutdown(&mut shutdown).await;
                    break 'lifecycle;
                }
                BackoffOutcome::Shutdown => break 'lifecycle,
            }
        }

        // Dropping `self.stream` on return removes the live subscription.
        self.set_state(ConnectionState::Disconnected);
    }

    /// Fetch constants, bulk-load the full id range, and install the fresh
    /// snapshot. Returns `(loaded, skipped)` for the sync-complete metadata.
    async fn resync(&self) -> Result<(usize, usize), LedgerError> {
        let constants = self.gateway.constants().await?;
        debug!(
            order_expiry_secs = constants.order_expiry_secs,
            grace_period_secs = constants.grace_period_secs,
            "Ledger constants loaded"
        );

        let count = self.gateway.order_count().await?;
        let report = self
            .gateway
            .bulk_load(0, count, self.sync.batch_size)
            .await;

        let orders: Vec<Order> = report
            .orders
            .into_iter()
            .map(|mut order| {
                order.deal_metrics = Some(self.calculator.compute(&order));
                order
            })
            .collect();
        let loaded = orders.len();
        self.cache.replace_all(orders);

        info!(
            loaded,
            skipped = report.skipped_slots,
            failed_batches = report.failed_batches,
            "Resync complete"
        );
        Ok((loaded, report.skipped_slots))
    }

    /// Apply one live event: cache transition, metrics recompute for the
    /// touched order, then per-kind publication.
    fn apply_live_event(&self, event: LedgerEvent) {
        let kind = event.kind();
        match self.cache.apply(event) {
            None => debug!(kind, "Ledger event had no cache effect"),
            Some(CacheChange::Created(order)) => {
                debug!(order_id = %order.id, "Order created");
                let order = self.attach_metrics(order);
                self.hub.publish(&EngineEvent::OrderCreated(order));
            }
            Some(CacheChange::Filled(order)) => {
                debug!(order_id = %order.id, "Order filled");
                let order = self.attach_metrics(order);
                self.hub.publish(&EngineEvent::OrderFilled(order));
            }
            Some(CacheChange::Canceled(order)) => {
                debug!(order_id = %order.id, "Order canceled");
                let order = self.attach_metrics(order);
                self.hub.publish(&EngineEvent::OrderCanceled(order));
            }
            Some(CacheChange::Removed(id)) => {
                debug!(order_id = %id, "Order cleaned up");
                self.hub.publish(&EngineEvent::OrderCleanedUp(id));
            }
            Some(CacheChange::Retried { old_id, order }) => {
                debug!(old_id = %old_id, new_id = %order.id, "Order re-issued");
                let order = self.attach_metrics(order);
                self.hub
                    .publish(&EngineEvent::OrderRetried { old_id, order });
            }
        }
    }

    fn attach_metrics(&self, mut order: Order) -> Order {
        let metrics = self.calculator.compute(&order);
        self.cache.set_deal_metrics(order.id, metrics.clone());
        order.deal_metrics = Some(metrics);
        order
    }

    /// Record a failure and wait out the backoff delay.
    async fn backoff(
        &self,
        shutdown: &mut watch::Receiver<bool>,
        failures: &mut u32,
        delay_ms: &mut u64,
    ) -> BackoffOutcome {
        *failures += 1;
        if *failures >= self.reconnect.max_attempts {
            error!(
                failures = *failures,
                "Reconnection ceiling reached, giving up"
            );
            self.set_state(ConnectionState::Failed);
            self.hub.publish(&EngineEvent::ConnectionError {
                message: format!("connection failed after {} attempts", *failures),
            });
            return BackoffOutcome::GiveUp;
        }

        let delay = Duration::from_millis(*delay_ms + jitter_ms(*delay_ms));
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = *failures,
            "Reconnecting after delay"
        );
        let slept = tokio::select! {
            _ = wait_for_shutdown(shutdown) => false,
            () = sleep(delay) => true,
        };

        let next = (*delay_ms as f64 * self.reconnect.backoff_multiplier) as u64;
        *delay_ms = next.min(self.reconnect.max_delay_ms);

        if slept {
            BackoffOutcome::Retry
        } else {
            BackoffOutcome::Shutdown
        }
    }

    fn set_state(&self, state: ConnectionState) {
        if *self.state_tx.borrow() != state {
            info!(state = state.as_str(), "Connection state changed");
        }
        let _ = self.state_tx.send(state);
    }
}

/// Resolve only once shutdown has been requested (or the engine dropped).
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Deterministic-enough jitter without a RNG dependency: a fifth of the base
/// delay, derived from the clock's subsecond nanos.
fn jitter_ms(base_ms: u64) -> u64 {
    let range = base_ms / 5;
    if range == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % (range + 1)
}
