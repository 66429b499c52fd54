//! Ledger-agnostic domain types for the order marketplace.

mod event;
mod id;
mod metrics;
mod order;

pub use event::LedgerEvent;
pub use id::{Address, OrderId, TokenId};
pub use metrics::DealMetrics;
pub use order::{DisplayStatus, LedgerConstants, Order, OrderStatus, RawOrderRecord};
