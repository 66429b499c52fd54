//! Shared harness for integration tests.

use std::sync::Arc;

use rust_decimal::Decimal;
use swapdeck::engine::{
    ConnectionState, EngineConfig, GovernorConfig, ReconnectionConfig, SyncConfig, SyncEngine,
};
use swapdeck::port::{LedgerEventStream, LedgerReader};
use swapdeck::testkit::prices::{StaticPriceFeed, StaticTokens};

/// Engine config with short delays suitable for paused-clock tests.
pub fn fast_engine_config() -> EngineConfig {
    EngineConfig {
        governor: GovernorConfig {
            min_interval_ms: 1,
            max_in_flight: 2,
            max_attempts: 3,
            base_backoff_ms: 2,
            max_backoff_ms: 20,
            rate_limit_cooldown_ms: 5,
            rate_limit_retries: 3,
            request_timeout_ms: 1_000,
        },
        reconnect: ReconnectionConfig {
            initial_delay_ms: 10,
            max_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_attempts: 3,
        },
        sync: SyncConfig { batch_size: 2 },
    }
}

/// Static prices: sell token $2, buy token $4; 6 and 18 decimals.
pub fn test_feeds() -> (Arc<StaticPriceFeed>, Arc<StaticTokens>) {
    let prices = StaticPriceFeed::new()
        .with_price("0xsell", Decimal::from(2))
        .with_price("0xbuy", Decimal::from(4));
    let tokens = StaticTokens::new()
        .with_token("0xsell", "SELL", 6)
        .with_token("0xbuy", "BUY", 18);
    (Arc::new(prices), Arc::new(tokens))
}

/// Build an engine over the given mock backend.
pub fn build_engine(
    reader: Arc<dyn LedgerReader>,
    stream: Box<dyn LedgerEventStream>,
) -> SyncEngine {
    let (prices, tokens) = test_feeds();
    SyncEngine::new(reader, stream, prices, tokens, fast_engine_config())
}

/// Await a specific connection state.
pub async fn wait_for_state(engine: &SyncEngine, want: ConnectionState) {
    let mut state = engine.state_watch();
    while *state.borrow() != want {
        state
            .changed()
            .await
            .expect("engine stopped before reaching the expected state");
    }
}
