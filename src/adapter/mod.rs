//! Implementations of ports (hexagonal adapters).
//!
//! Real backends for the engine's ports: the HTTP read client and WebSocket
//! event feed for the ledger, and the polling price feed plus config-backed
//! token directory for valuation.

pub mod dto;
mod ledger_http;
mod ledger_ws;
mod price;

pub use ledger_http::HttpLedgerReader;
pub use ledger_ws::WsLedgerStream;
pub use price::{ConfigTokenDirectory, HttpPriceFeed};
