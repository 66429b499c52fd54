//! Static price and token-metadata sources for deterministic tests.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::TokenId;
use crate::port::{PriceFeed, PricePoint, TokenDirectory};

/// A fixed set of USD quotes.
pub struct StaticPriceFeed {
    prices: HashMap<TokenId, PricePoint>,
    refreshed: Option<DateTime<Utc>>,
}

impl StaticPriceFeed {
    #[must_use]
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            refreshed: None,
        }
    }

    #[must_use]
    pub fn with_price(mut self, token: impl Into<TokenId>, usd: Decimal) -> Self {
        let now = Utc::now();
        self.prices.insert(token.into(), PricePoint::new(usd, now));
        self.refreshed = Some(now);
        self
    }
}

impl Default for StaticPriceFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceFeed for StaticPriceFeed {
    fn usd_price(&self, token: &TokenId) -> Option<PricePoint> {
        self.prices.get(token).copied()
    }

    fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.refreshed
    }
}

/// A fixed token directory.
pub struct StaticTokens {
    entries: HashMap<TokenId, (String, u32)>,
}

impl StaticTokens {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_token(mut self, id: impl Into<TokenId>, symbol: &str, decimals: u32) -> Self {
        self.entries
            .insert(id.into(), (symbol.to_string(), decimals));
        self
    }
}

impl Default for StaticTokens {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenDirectory for StaticTokens {
    fn decimals(&self, token: &TokenId) -> Option<u32> {
        self.entries.get(token).map(|(_, decimals)| *decimals)
    }

    fn symbol(&self, token: &TokenId) -> Option<String> {
        self.entries.get(token).map(|(symbol, _)| symbol.clone())
    }
}
