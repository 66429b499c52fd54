//! Price feed boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::TokenId;

/// A single USD quote with its fetch time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub usd: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl PricePoint {
    #[must_use]
    pub fn new(usd: Decimal, fetched_at: DateTime<Utc>) -> Self {
        Self { usd, fetched_at }
    }
}

/// Synchronous view over an adapter-maintained price cache.
///
/// Refreshing the cache is the adapter's job (driven by the app's refresh
/// loop through the request governor); lookups never block on I/O.
pub trait PriceFeed: Send + Sync {
    /// Latest USD quote for a token, if the feed has one.
    fn usd_price(&self, token: &TokenId) -> Option<PricePoint>;

    /// When the cache was last refreshed, if ever.
    fn last_refreshed(&self) -> Option<DateTime<Utc>>;
}
