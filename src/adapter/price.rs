//! HTTP price feed and the config-backed token directory.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use reqwest::StatusCode;
use tracing::debug;

use super::dto::{ErrorEnvelope, PricesDto};
use crate::config::TokenEntry;
use crate::domain::TokenId;
use crate::error::LedgerError;
use crate::port::{PriceFeed, PricePoint, TokenDirectory};

/// Polling USD price feed with an in-memory quote cache.
///
/// [`HttpPriceFeed::fetch_once`] performs exactly one outbound call and is
/// meant to be driven through the request governor by the app's refresh
/// loop; [`PriceFeed`] lookups are synchronous over the cache.
pub struct HttpPriceFeed {
    client: reqwest::Client,
    url: String,
    /// Token id to feed symbol.
    symbols: HashMap<TokenId, String>,
    cache: DashMap<TokenId, PricePoint>,
    refreshed: RwLock<Option<DateTime<Utc>>>,
}

impl HttpPriceFeed {
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>, tokens: &[TokenEntry]) -> Self {
        let symbols = tokens
            .iter()
            .map(|t| (TokenId::new(&t.id), t.symbol.clone()))
            .collect();
        Self {
            client,
            url: url.into(),
            symbols,
            cache: DashMap::new(),
            refreshed: RwLock::new(None),
        }
    }

    /// Fetch quotes for every configured symbol and update the cache.
    /// Returns how many tokens received a fresh quote.
    pub async fn fetch_once(&self) -> Result<usize, LedgerError> {
        if self.symbols.is_empty() {
            return Ok(0);
        }
        let mut wanted: Vec<&str> = self.symbols.values().map(String::as_str).collect();
        wanted.sort_unstable();
        wanted.dedup();

        let response = self
            .client
            .get(&self.url)
            .query(&[("symbols", wanted.join(","))])
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LedgerError::RateLimited {
                code: i64::from(status.as_u16()),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&body) {
            return Err(envelope.error.into_error());
        }
        if !status.is_success() {
            return Err(LedgerError::Provider {
                code: i64::from(status.as_u16()),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let dto: PricesDto = serde_json::from_slice(&body)
            .map_err(|e| LedgerError::Transport(format!("invalid price response: {e}")))?;

        let now = Utc::now();
        let mut updated = 0;
        for (token, symbol) in &self.symbols {
            if let Some(usd) = dto.prices.get(symbol) {
                self.cache.insert(token.clone(), PricePoint::new(*usd, now));
                updated += 1;
            }
        }
        *self.refreshed.write() = Some(now);
        debug!(updated, "Price cache refreshed");
        Ok(updated)
    }
}

impl PriceFeed for HttpPriceFeed {
    fn usd_price(&self, token: &TokenId) -> Option<PricePoint> {
        self.cache.get(token).map(|entry| *entry.value())
    }

    fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        *self.refreshed.read()
    }
}

/// Token directory backed by the `[prices]` token table.
pub struct ConfigTokenDirectory {
    entries: HashMap<TokenId, TokenEntry>,
}

impl ConfigTokenDirectory {
    #[must_use]
    pub fn new(tokens: &[TokenEntry]) -> Self {
        let entries = tokens
            .iter()
            .map(|t| (TokenId::new(&t.id), t.clone()))
            .collect();
        Self { entries }
    }
}

impl TokenDirectory for ConfigTokenDirectory {
    fn decimals(&self, token: &TokenId) -> Option<u32> {
        self.entries.get(token).map(|t| t.decimals)
    }

    fn symbol(&self, token: &TokenId) -> Option<String> {
        self.entries.get(token).map(|t| t.symbol.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<TokenEntry> {
        vec![
            TokenEntry {
                id: "0xaaa1".into(),
                symbol: "WETH".into(),
                decimals: 18,
            },
            TokenEntry {
                id: "0xbbb2".into(),
                symbol: "USDC".into(),
                decimals: 6,
            },
        ]
    }

    #[test]
    fn directory_serves_decimals_and_symbols() {
        let directory = ConfigTokenDirectory::new(&entries());
        let weth = TokenId::new("0xaaa1");
        assert_eq!(directory.decimals(&weth), Some(18));
        assert_eq!(directory.symbol(&weth), Some("WETH".into()));
        assert_eq!(directory.decimals(&TokenId::new("0xother")), None);
    }

    #[test]
    fn feed_starts_empty() {
        let feed = HttpPriceFeed::new(
            reqwest::Client::new(),
            "https://prices.example.org/v1",
            &entries(),
        );
        assert!(feed.usd_price(&TokenId::new("0xaaa1")).is_none());
        assert!(feed.last_refreshed().is_none());
    }
}
