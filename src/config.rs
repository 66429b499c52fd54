use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::engine::EngineConfig;
use crate::error::{ConfigError, Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub governor: crate::engine::GovernorConfig,
    #[serde(default)]
    pub reconnect: crate::engine::ReconnectionConfig,
    #[serde(default)]
    pub sync: crate::engine::SyncConfig,
    #[serde(default)]
    pub prices: PriceSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Request/response read endpoint for the ledger.
    pub rpc_url: String,
    /// Push event feed endpoint.
    pub ws_url: String,
    /// Price feed endpoint.
    pub price_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerSettings {
    /// Address of the escrow contract whose orders are synchronized.
    pub escrow_contract: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriceSettings {
    /// Seconds between price feed refreshes.
    pub refresh_secs: u64,
    /// Known tokens: decimals and symbols for valuation.
    pub tokens: Vec<TokenEntry>,
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            refresh_secs: 30,
            tokens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub id: String,
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        require_url("network.rpc_url", &self.network.rpc_url, &["http", "https"])?;
        require_url("network.ws_url", &self.network.ws_url, &["ws", "wss"])?;
        require_url("network.price_url", &self.network.price_url, &["http", "https"])?;

        if self.ledger.escrow_contract.is_empty() {
            return Err(Error::Config(ConfigError::MissingField {
                field: "ledger.escrow_contract",
            }));
        }
        if self.sync.batch_size == 0 {
            return Err(invalid("sync.batch_size", "must be positive"));
        }
        if self.governor.max_in_flight == 0 {
            return Err(invalid("governor.max_in_flight", "must be positive"));
        }
        if self.governor.max_attempts == 0 {
            return Err(invalid("governor.max_attempts", "must be positive"));
        }
        if self.reconnect.backoff_multiplier < 1.0 {
            return Err(invalid("reconnect.backoff_multiplier", "must be >= 1.0"));
        }
        if self.prices.refresh_secs == 0 {
            return Err(invalid("prices.refresh_secs", "must be positive"));
        }
        for token in &self.prices.tokens {
            if token.decimals > 28 {
                return Err(invalid("prices.tokens.decimals", "must be <= 28"));
            }
        }
        Ok(())
    }

    /// The engine's slice of this configuration.
    #[must_use]
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            governor: self.governor.clone(),
            reconnect: self.reconnect.clone(),
            sync: self.sync.clone(),
        }
    }

    /// Initialize the global tracing subscriber from the logging section.
    ///
    /// `RUST_LOG` overrides the configured level when set.
    pub fn init_logging(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.logging.level));
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        if self.logging.format == "json" {
            builder.json().init();
        } else {
            builder.init();
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                rpc_url: "https://ledger.swapdeck.io/api".into(),
                ws_url: "wss://ledger.swapdeck.io/feed".into(),
                price_url: "https://prices.swapdeck.io/v1".into(),
            },
            ledger: LedgerSettings::default(),
            governor: crate::engine::GovernorConfig::default(),
            reconnect: crate::engine::ReconnectionConfig::default(),
            sync: crate::engine::SyncConfig::default(),
            prices: PriceSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn require_url(field: &'static str, value: &str, schemes: &[&str]) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Config(ConfigError::MissingField { field }));
    }
    let url = Url::parse(value)
        .map_err(|e| Error::Config(ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        }))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(field, &format!("unsupported scheme {}", url.scheme())));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &str) -> Error {
    Error::Config(ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
            [network]
            rpc_url = "https://ledger.example.org/api"
            ws_url = "wss://ledger.example.org/feed"
            price_url = "https://prices.example.org/v1"

            [ledger]
            escrow_contract = "0x1111111111111111111111111111111111111111"
        "#
    }

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: Config = toml::from_str(minimal_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.sync.batch_size, 100);
        assert_eq!(config.governor.max_attempts, 3);
        assert_eq!(config.prices.refresh_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn token_table_parses() {
        let toml = format!(
            "{}\n{}",
            minimal_toml(),
            r#"
            [prices]
            refresh_secs = 15

            [[prices.tokens]]
            id = "0xaaa1"
            symbol = "WETH"
            decimals = 18
            "#
        );
        let config: Config = toml::from_str(&toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.prices.tokens.len(), 1);
        assert_eq!(config.prices.tokens[0].symbol, "WETH");
    }

    #[test]
    fn missing_contract_fails_validation() {
        let toml = r#"
            [network]
            rpc_url = "https://ledger.example.org/api"
            ws_url = "wss://ledger.example.org/feed"
            price_url = "https://prices.example.org/v1"

            [ledger]
            escrow_contract = ""
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn http_scheme_rejected_for_feed() {
        let toml = r#"
            [network]
            rpc_url = "https://ledger.example.org/api"
            ws_url = "https://ledger.example.org/feed"
            price_url = "https://prices.example.org/v1"

            [ledger]
            escrow_contract = "0x1111111111111111111111111111111111111111"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let toml = format!("{}\n[sync]\nbatch_size = 0\n", minimal_toml());
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn engine_slice_mirrors_sections() {
        let config: Config = toml::from_str(minimal_toml()).unwrap();
        let engine = config.engine();
        assert_eq!(engine.governor, config.governor);
        assert_eq!(engine.sync, config.sync);
    }
}
