use std::time::Duration;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors crossing the ledger / price-feed boundary.
///
/// The request governor classifies these: [`LedgerError::RateLimited`] is
/// retried after a cooldown without consuming the hard-failure budget,
/// transient transport failures are retried with exponential backoff, and
/// everything else propagates to the caller immediately.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("provider rate limit hit (code {code})")]
    RateLimited { code: i64 },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider error {code}: {message}")]
    Provider { code: i64, message: String },

    #[error("malformed record at slot {slot}: {reason}")]
    MalformedRecord { slot: u64, reason: String },

    #[error("not connected to the ledger")]
    NotConnected,

    #[error("missing ledger configuration: {0}")]
    NotConfigured(&'static str),
}

impl LedgerError {
    /// True for the reserved provider rate-limit class.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// True for failures worth retrying with backoff.
    ///
    /// Malformed records and missing configuration are deterministic and
    /// never retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Timeout(_)
                | Self::Transport(_)
                | Self::Provider { .. }
                | Self::NotConnected
        )
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_its_own_class() {
        let err = LedgerError::RateLimited { code: 429 };
        assert!(err.is_rate_limited());
        assert!(err.is_retryable());
    }

    #[test]
    fn malformed_records_are_not_retryable() {
        let err = LedgerError::MalformedRecord {
            slot: 7,
            reason: "bad status".into(),
        };
        assert!(!err.is_rate_limited());
        assert!(!err.is_retryable());
    }

    #[test]
    fn transport_errors_are_retryable_but_not_rate_limited() {
        let err = LedgerError::Transport("connection reset".into());
        assert!(err.is_retryable());
        assert!(!err.is_rate_limited());
    }
}
