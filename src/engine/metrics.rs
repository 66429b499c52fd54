//! Deal metrics derivation.
//!
//! Combines the token directory (decimals) with the price feed (USD quotes)
//! to score each order for the taker. Missing inputs degrade to neutral
//! values; computation never fails.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::{DealMetrics, Order, TokenId};
use crate::engine::cache::OrderCache;
use crate::port::{PriceFeed, PricePoint, TokenDirectory};

/// Derives comparative valuation fields for orders.
pub struct DealMetricsCalculator {
    tokens: Arc<dyn TokenDirectory>,
    prices: Arc<dyn PriceFeed>,
}

impl DealMetricsCalculator {
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenDirectory>, prices: Arc<dyn PriceFeed>) -> Self {
        Self { tokens, prices }
    }

    /// Compute the metrics attachment for one order.
    ///
    /// `price` is the taker's receive-per-give ratio in display units,
    /// `rate` the market exchange rate between the two tokens, and
    /// `deal = price * rate` the unitless goodness-of-trade score. A token
    /// without a USD quote contributes a neutral factor of one; a token with
    /// unknown decimals is treated as having zero (raw base units).
    #[must_use]
    pub fn compute(&self, order: &Order) -> DealMetrics {
        let sell_decimals = self.tokens.decimals(&order.sell_token).unwrap_or(0);
        let buy_decimals = self.tokens.decimals(&order.buy_token).unwrap_or(0);

        let sell_display = scale_down(order.sell_amount, sell_decimals);
        let buy_display = scale_down(order.buy_amount, buy_decimals);

        let price = if sell_display.is_zero() {
            Decimal::ZERO
        } else {
            buy_display / sell_display
        };

        let (sell_usd, sell_priced_at) = self.quote_or_neutral(&order.sell_token);
        let (buy_usd, buy_priced_at) = self.quote_or_neutral(&order.buy_token);

        let rate = if buy_usd.is_zero() {
            Decimal::ONE
        } else {
            sell_usd / buy_usd
        };

        DealMetrics {
            price,
            rate,
            deal: price * rate,
            sell_display,
            buy_display,
            sell_priced_at,
            buy_priced_at,
        }
    }

    /// Recompute the attachment for every cached order; returns how many
    /// orders were touched.
    pub fn refresh_all(&self, cache: &OrderCache) -> usize {
        cache.recompute_metrics(|order| Some(self.compute(order)))
    }

    fn quote_or_neutral(&self, token: &TokenId) -> (Decimal, Option<chrono::DateTime<chrono::Utc>>) {
        match self.prices.usd_price(token) {
            Some(PricePoint { usd, fetched_at }) => (usd, Some(fetched_at)),
            None => (Decimal::ONE, None),
        }
    }
}

/// Normalize a base-unit amount by the token's decimal count.
///
/// Amounts beyond `Decimal`'s 96-bit mantissa fall back to the integer part
/// only; quantities that large are far outside display precision anyway.
fn scale_down(amount: u128, decimals: u32) -> Decimal {
    let scale = decimals.min(28);
    if let Ok(mantissa) = i128::try_from(amount) {
        if let Ok(value) = Decimal::try_from_i128_with_scale(mantissa, scale) {
            return value;
        }
    }

    let divisor = 10u128.pow(scale);
    let whole = amount / divisor;
    i128::try_from(whole)
        .ok()
        .and_then(|w| Decimal::try_from_i128_with_scale(w, 0).ok())
        .unwrap_or(Decimal::MAX)
}
