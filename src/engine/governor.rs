//! Rate-limiting and retrying request governor.
//!
//! Every outbound read against the ledger or price feed funnels through
//! [`RequestGovernor::enqueue`]. The governor enforces a minimum
//! inter-dispatch interval and a cap on concurrently in-flight operations,
//! retries rate-limited calls after a fixed cooldown, and retries other
//! transient failures with exponential backoff before surfacing the last
//! error. It knows nothing about orders.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tracing::{debug, warn};

use crate::error::LedgerError;

/// Tuning knobs for the request governor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Minimum spacing between any two dispatches, in milliseconds.
    pub min_interval_ms: u64,
    /// Maximum number of concurrently in-flight operations.
    pub max_in_flight: usize,
    /// Hard-failure budget per operation (attempts, not retries).
    pub max_attempts: u32,
    /// First backoff delay after a transient failure, in milliseconds.
    pub base_backoff_ms: u64,
    /// Backoff ceiling, in milliseconds.
    pub max_backoff_ms: u64,
    /// Cooldown before re-issuing a rate-limited call, in milliseconds.
    pub rate_limit_cooldown_ms: u64,
    /// Rate-limited re-issues that do not consume the hard-failure budget.
    pub rate_limit_retries: u32,
    /// Per-attempt timeout, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 50,
            max_in_flight: 4,
            max_attempts: 3,
            base_backoff_ms: 250,
            max_backoff_ms: 4_000,
            rate_limit_cooldown_ms: 1_000,
            rate_limit_retries: 5,
            request_timeout_ms: 10_000,
        }
    }
}

impl GovernorConfig {
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Throttles and retries outbound provider calls.
///
/// Callers suspend until both an in-flight slot and the minimum time spacing
/// are available; the semaphore is fair, so waiters are admitted roughly in
/// arrival order.
pub struct RequestGovernor {
    config: GovernorConfig,
    slots: Semaphore,
    /// Earliest instant the next dispatch may go out.
    next_dispatch: Mutex<Instant>,
}

impl RequestGovernor {
    #[must_use]
    pub fn new(config: GovernorConfig) -> Self {
        let permits = config.max_in_flight.max(1);
        Self {
            config,
            slots: Semaphore::new(permits),
            next_dispatch: Mutex::new(Instant::now()),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Run `op` under the governor's pacing, concurrency, and retry policy.
    ///
    /// `op` is called once per attempt and must be repeatable. Rate-limited
    /// failures are re-issued after a fixed cooldown without counting against
    /// the hard-failure budget (up to an internal cap); other retryable
    /// failures back off exponentially. After the budget is exhausted the
    /// last error is surfaced.
    pub async fn enqueue<T, F, Fut>(&self, op: F) -> Result<T, LedgerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let _permit = self
            .slots
            .acquire()
            .await
            .expect("governor semaphore closed");

        let mut rate_limit_retries = 0u32;
        let mut attempts = 0u32;
        let mut backoff = Duration::from_millis(self.config.base_backoff_ms);
        let max_backoff = Duration::from_millis(self.config.max_backoff_ms);

        loop {
            self.pace().await;

            let err = match timeout(self.config.request_timeout(), op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => LedgerError::Timeout(self.config.request_timeout()),
            };

            if err.is_rate_limited() && rate_limit_retries < self.config.rate_limit_retries {
                rate_limit_retries += 1;
                debug!(
                    retry = rate_limit_retries,
                    cooldown_ms = self.config.rate_limit_cooldown_ms,
                    "Rate limited, cooling down"
                );
                sleep(Duration::from_millis(self.config.rate_limit_cooldown_ms)).await;
                continue;
            }

            attempts += 1;
            if !err.is_retryable() || attempts >= self.config.max_attempts {
                return Err(err);
            }

            warn!(
                error = %err,
                attempt = attempts,
                delay_ms = backoff.as_millis() as u64,
                "Provider call failed, backing off"
            );
            sleep(backoff).await;
            backoff = (backoff * 2).min(max_backoff);
        }
    }

    /// Suspend until the minimum inter-dispatch spacing is satisfied, then
    /// claim the next dispatch slot.
    async fn pace(&self) {
        let mut next = self.next_dispatch.lock().await;
        let now = Instant::now();
        if *next > now {
            sleep_until(*next).await;
        }
        *next = Instant::now() + self.config.min_interval();
    }
}
