//! Derived valuation attached to each order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Comparative valuation of an order against current market prices.
///
/// Recomputed whenever the order changes or the price feed refreshes; never
/// persisted authoritatively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealMetrics {
    /// Taker's receive-per-give ratio: buy amount over sell amount, both in
    /// display units.
    pub price: Decimal,
    /// Market exchange rate: sell-token USD price over buy-token USD price.
    pub rate: Decimal,
    /// Unitless goodness-of-trade score, `price * rate`; higher favors the
    /// taker. No sign or bound guarantees.
    pub deal: Decimal,
    /// Sell amount normalized by the token's decimals.
    pub sell_display: Decimal,
    /// Buy amount normalized by the token's decimals.
    pub buy_display: Decimal,
    /// When the sell-token price was fetched; `None` when the feed had no
    /// quote and the neutral fallback was used.
    pub sell_priced_at: Option<DateTime<Utc>>,
    /// When the buy-token price was fetched; `None` on neutral fallback.
    pub buy_priced_at: Option<DateTime<Utc>>,
}
