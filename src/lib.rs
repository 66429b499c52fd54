//! Swapdeck - order synchronization & cache engine for a peer-to-peer
//! token-swap marketplace.
//!
//! The engine keeps a local, consistent view of every order on an on-chain
//! escrow contract by combining a bulk load from the ledger, incremental
//! live change notifications, and a rate-limited, retrying request layer
//! that mediates all outbound calls. A derived valuation (price, rate, deal
//! score) is maintained against an independently refreshing price feed.
//!
//! # Architecture
//!
//! - [`domain`] - Ledger-agnostic types: orders, events, ids, deal metrics
//! - [`port`] - Traits the engine is built against: ledger reader and event
//!   stream, price feed, token directory
//! - [`engine`] - The core: request governor, ledger gateway, order cache,
//!   connection supervisor, deal-metrics calculator, subscription hub, and
//!   the [`engine::SyncEngine`] facade
//! - [`adapter`] - Real backends: HTTP read client, WebSocket event feed,
//!   polling price feed
//! - [`config`] - Configuration loading from TOML files
//! - [`error`] - Error types for the crate
//! - [`app`] - Application orchestration
//!
//! # Example
//!
//! ```no_run
//! use swapdeck::config::Config;
//! use swapdeck::app::App;
//!
//! # async fn run() -> swapdeck::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! App::run(config).await
//! # }
//! ```

pub mod adapter;
pub mod app;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
