//! App orchestration module.
//!
//! Wires the configured adapters into a [`SyncEngine`], starts it, and
//! drives the price-refresh loop through the shared request governor. The
//! caller owns signal handling; `run` returns only when the engine gives up
//! on the ledger connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::adapter::{ConfigTokenDirectory, HttpLedgerReader, HttpPriceFeed, WsLedgerStream};
use crate::config::Config;
use crate::engine::{ConnectionState, SyncEngine};
use crate::error::{Error, Result};

/// Main application struct.
pub struct App;

impl App {
    /// Run the synchronization engine until it permanently fails.
    pub async fn run(config: Config) -> Result<()> {
        let client = reqwest::Client::new();

        let reader = Arc::new(HttpLedgerReader::new(
            client.clone(),
            &config.network.rpc_url,
            config.ledger.escrow_contract.clone(),
        )?);
        let stream = Box::new(WsLedgerStream::new(
            config.network.ws_url.clone(),
            config.ledger.escrow_contract.clone(),
        ));
        let prices = Arc::new(HttpPriceFeed::new(
            client,
            config.network.price_url.clone(),
            &config.prices.tokens,
        ));
        let tokens = Arc::new(ConfigTokenDirectory::new(&config.prices.tokens));

        let engine = Arc::new(SyncEngine::new(
            reader,
            stream,
            prices.clone(),
            tokens,
            config.engine(),
        ));
        engine.start();
        info!(
            contract = %config.ledger.escrow_contract,
            tokens = config.prices.tokens.len(),
            "Engine started"
        );

        spawn_price_loop(
            engine.clone(),
            prices,
            Duration::from_secs(config.prices.refresh_secs),
        );

        let mut state = engine.state_watch();
        loop {
            if *state.borrow() == ConnectionState::Failed {
                return Err(Error::Connection(
                    "ledger connection failed permanently".into(),
                ));
            }
            if state.changed().await.is_err() {
                return Ok(());
            }
        }
    }
}

/// Periodically refresh the price cache and recompute deal metrics.
///
/// The fetch goes through the engine's governor so price traffic shares the
/// same pacing budget as ledger reads.
fn spawn_price_loop(engine: Arc<SyncEngine>, feed: Arc<HttpPriceFeed>, period: Duration) {
    let governor = engine.governor();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let fetch = governor.enqueue(|| {
                let feed = feed.clone();
                async move { feed.fetch_once().await }
            });
            match fetch.await {
                Ok(0) => debug!("Price refresh returned no quotes"),
                Ok(updated) => {
                    let touched = engine.refresh_deal_metrics();
                    debug!(updated, touched, "Deal metrics refreshed");
                }
                Err(err) => warn!(error = %err, "Price refresh failed"),
            }
        }
    });
}
