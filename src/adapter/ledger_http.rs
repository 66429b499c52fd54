//! HTTP adapter for the ledger's read endpoint.
//!
//! Speaks the marketplace's JSON request/response protocol over `reqwest`.
//! Every provider failure is mapped into the [`LedgerError`] taxonomy so the
//! request governor can classify it; this adapter never retries on its own.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::warn;
use url::Url;

use super::dto::{ConstantsDto, ErrorEnvelope, OrderCountDto, SlotsDto};
use crate::domain::{LedgerConstants, RawOrderRecord};
use crate::error::{Error, LedgerError};
use crate::port::LedgerReader;

/// Read client for the escrow contract's order state.
pub struct HttpLedgerReader {
    client: reqwest::Client,
    base: Url,
    contract: String,
}

impl HttpLedgerReader {
    /// Create a reader against `base_url`, scoped to one escrow contract.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        contract: impl Into<String>,
    ) -> Result<Self, Error> {
        let mut base = Url::parse(base_url)?;
        // Url::join treats a path without a trailing slash as a file.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            client,
            base,
            contract: contract.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LedgerError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| LedgerError::Transport(format!("bad endpoint path: {e}")))?;

        let response = self
            .client
            .get(url)
            .query(&[("contract", self.contract.as_str())])
            .query(query)
            .send()
            .await
            .map_err(to_transport)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LedgerError::RateLimited {
                code: i64::from(status.as_u16()),
            });
        }

        let body = response.bytes().await.map_err(to_transport)?;

        // Both failed statuses and 200-with-error-envelope responses carry
        // the provider's error object.
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&body) {
            return Err(envelope.error.into_error());
        }
        if !status.is_success() {
            return Err(LedgerError::Provider {
                code: i64::from(status.as_u16()),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        serde_json::from_slice(&body)
            .map_err(|e| LedgerError::Transport(format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl LedgerReader for HttpLedgerReader {
    async fn fetch_constants(&self) -> Result<LedgerConstants, LedgerError> {
        let dto: ConstantsDto = self.get_json("constants", &[]).await?;
        Ok(dto.into())
    }

    async fn order_count(&self) -> Result<u64, LedgerError> {
        let dto: OrderCountDto = self.get_json("orders/count", &[]).await?;
        Ok(dto.count)
    }

    async fn load_slots(&self, start: u64, end: u64) -> Result<Vec<RawOrderRecord>, LedgerError> {
        let dto: SlotsDto = self
            .get_json(
                "orders",
                &[("start", start.to_string()), ("end", end.to_string())],
            )
            .await?;

        // A slot that cannot be parsed is a data-integrity gap: drop it and
        // keep the batch.
        let mut records = Vec::with_capacity(dto.orders.len());
        for slot in dto.orders {
            match slot.into_record() {
                Ok(record) => records.push(record),
                Err(err) => warn!(error = %err, "Dropping unparseable order slot"),
            }
        }
        Ok(records)
    }
}

fn to_transport(err: reqwest::Error) -> LedgerError {
    LedgerError::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let reader =
            HttpLedgerReader::new(reqwest::Client::new(), "https://ledger.example.org/api", "0x1")
                .unwrap();
        assert_eq!(reader.base.as_str(), "https://ledger.example.org/api/");
        assert_eq!(
            reader.base.join("orders/count").unwrap().as_str(),
            "https://ledger.example.org/api/orders/count"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpLedgerReader::new(reqwest::Client::new(), "not a url", "0x1").is_err());
    }
}
