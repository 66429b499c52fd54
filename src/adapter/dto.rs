//! Wire DTOs for the marketplace's read endpoint and event feed.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Address, LedgerConstants, LedgerEvent, OrderId, RawOrderRecord, TokenId};
use crate::error::LedgerError;

/// Reserved provider error code for rate limiting.
pub const RATE_LIMIT_CODE: i64 = -32005;

/// Error envelope the provider wraps failures in.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ProviderErrorDto,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorDto {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl ProviderErrorDto {
    /// Classify into the ledger error taxonomy.
    #[must_use]
    pub fn into_error(self) -> LedgerError {
        if self.code == RATE_LIMIT_CODE {
            LedgerError::RateLimited { code: self.code }
        } else {
            LedgerError::Provider {
                code: self.code,
                message: self.message,
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConstantsDto {
    pub order_expiry_secs: u64,
    pub grace_period_secs: u64,
}

impl From<ConstantsDto> for LedgerConstants {
    fn from(dto: ConstantsDto) -> Self {
        Self {
            order_expiry_secs: dto.order_expiry_secs,
            grace_period_secs: dto.grace_period_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderCountDto {
    pub count: u64,
}

/// One order slot on the wire. Amounts travel as base-10 strings because
/// they exceed JSON's safe integer range.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotDto {
    pub id: u64,
    pub maker: String,
    pub taker: String,
    pub sell_token: String,
    pub buy_token: String,
    pub sell_amount: String,
    pub buy_amount: String,
    pub created_at: u64,
    pub status: u8,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "zero_amount")]
    pub creation_fee: String,
}

fn zero_amount() -> String {
    "0".to_string()
}

impl SlotDto {
    /// Parse into a raw domain record.
    pub fn into_record(self) -> Result<RawOrderRecord, LedgerError> {
        let slot = self.id;
        let parse = |field: &'static str, value: &str| {
            value.parse::<u128>().map_err(|_| LedgerError::MalformedRecord {
                slot,
                reason: format!("{field} is not an unsigned amount"),
            })
        };
        Ok(RawOrderRecord {
            id: self.id,
            maker: Address::new(self.maker),
            taker: Address::new(self.taker),
            sell_token: TokenId::new(self.sell_token),
            buy_token: TokenId::new(self.buy_token),
            sell_amount: parse("sell_amount", &self.sell_amount)?,
            buy_amount: parse("buy_amount", &self.buy_amount)?,
            created_at: self.created_at,
            status_code: self.status,
            retry_count: self.retry_count,
            creation_fee: parse("creation_fee", &self.creation_fee)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SlotsDto {
    pub orders: Vec<SlotDto>,
}

/// Subscription request sent after the feed connects.
#[derive(Debug, Serialize)]
pub struct SubscribeMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    channel: &'static str,
    contract: &'a str,
}

impl<'a> SubscribeMessage<'a> {
    #[must_use]
    pub fn orders(contract: &'a str) -> Self {
        Self {
            kind: "subscribe",
            channel: "orders",
            contract,
        }
    }
}

/// Inbound feed frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedFrame {
    OrderCreated {
        order: SlotDto,
    },
    OrderFilled {
        id: u64,
    },
    OrderCanceled {
        id: u64,
    },
    OrderCleanedUp {
        id: u64,
    },
    OrderRetried {
        old_id: u64,
        new_id: u64,
        retry_count: u32,
        created_at: u64,
    },
    Subscribed {},
    #[serde(other)]
    Unknown,
}

impl FeedFrame {
    /// Map into a ledger event; acknowledgements and unknown frames map to
    /// `Ok(None)`, a malformed creation payload surfaces its parse error.
    pub fn into_event(self) -> Result<Option<LedgerEvent>, LedgerError> {
        Ok(match self {
            Self::OrderCreated { order } => Some(LedgerEvent::Created(order.into_record()?)),
            Self::OrderFilled { id } => Some(LedgerEvent::Filled(OrderId::new(id))),
            Self::OrderCanceled { id } => Some(LedgerEvent::Canceled(OrderId::new(id))),
            Self::OrderCleanedUp { id } => Some(LedgerEvent::CleanedUp(OrderId::new(id))),
            Self::OrderRetried {
                old_id,
                new_id,
                retry_count,
                created_at,
            } => Some(LedgerEvent::Retried {
                old_id: OrderId::new(old_id),
                new_id: OrderId::new(new_id),
                retry_count,
                created_at,
            }),
            Self::Subscribed {} | Self::Unknown => None,
        })
    }
}

/// Price feed response: USD quotes keyed by feed symbol.
#[derive(Debug, Deserialize)]
pub struct PricesDto {
    pub prices: HashMap<String, Decimal>,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::OrderStatus;

    fn slot_json() -> &'static str {
        r#"{
            "id": 3,
            "maker": "0xAbC0000000000000000000000000000000000001",
            "taker": "0x0000000000000000000000000000000000000000",
            "sell_token": "0xaaa1",
            "buy_token": "0xbbb2",
            "sell_amount": "340282366920938463463374607431768211455",
            "buy_amount": "2000",
            "created_at": 1700000000,
            "status": 0,
            "retry_count": 1,
            "creation_fee": "10"
        }"#
    }

    #[test]
    fn slot_parses_huge_amounts() {
        let dto: SlotDto = serde_json::from_str(slot_json()).unwrap();
        let record = dto.into_record().unwrap();
        assert_eq!(record.sell_amount, u128::MAX);
        assert_eq!(record.maker.as_str(), "0xabc0000000000000000000000000000000000001");
        assert!(record.taker.is_zero());
        assert_eq!(OrderStatus::from_code(record.status_code), Some(OrderStatus::Active));
    }

    #[test]
    fn bad_amount_is_a_malformed_record() {
        let mut dto: SlotDto = serde_json::from_str(slot_json()).unwrap();
        dto.sell_amount = "-5".into();
        let err = dto.into_record().unwrap_err();
        assert!(matches!(err, LedgerError::MalformedRecord { slot: 3, .. }));
    }

    #[test]
    fn created_frame_maps_to_event() {
        let json = format!(r#"{{"type": "order_created", "order": {}}}"#, slot_json());
        let frame: FeedFrame = serde_json::from_str(&json).unwrap();
        let event = frame.into_event().unwrap().unwrap();
        assert!(matches!(event, LedgerEvent::Created(_)));
    }

    #[test]
    fn retried_frame_carries_both_ids() {
        let json = r#"{
            "type": "order_retried",
            "old_id": 3, "new_id": 9, "retry_count": 1, "created_at": 1700000100
        }"#;
        let frame: FeedFrame = serde_json::from_str(json).unwrap();
        match frame.into_event().unwrap().unwrap() {
            LedgerEvent::Retried {
                old_id,
                new_id,
                retry_count,
                created_at,
            } => {
                assert_eq!(old_id, OrderId::new(3));
                assert_eq!(new_id, OrderId::new(9));
                assert_eq!(retry_count, 1);
                assert_eq!(created_at, 1_700_000_100);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_frames_are_ignored() {
        let frame: FeedFrame = serde_json::from_str(r#"{"type": "heartbeat"}"#).unwrap();
        assert!(frame.into_event().unwrap().is_none());
    }

    #[test]
    fn rate_limit_code_classifies() {
        let envelope: ErrorEnvelope =
            serde_json::from_str(r#"{"error": {"code": -32005, "message": "slow down"}}"#).unwrap();
        assert!(envelope.error.into_error().is_rate_limited());
    }

    #[test]
    fn other_codes_stay_provider_errors() {
        let envelope: ErrorEnvelope =
            serde_json::from_str(r#"{"error": {"code": -32000, "message": "oops"}}"#).unwrap();
        assert!(matches!(
            envelope.error.into_error(),
            LedgerError::Provider { code: -32000, .. }
        ));
    }

    #[test]
    fn prices_parse_decimal_strings() {
        let dto: PricesDto =
            serde_json::from_str(r#"{"prices": {"WETH": "2512.34", "USDC": "1.0"}}"#).unwrap();
        assert_eq!(dto.prices["WETH"], dec!(2512.34));
    }

    #[test]
    fn subscribe_message_shape() {
        let msg = SubscribeMessage::orders("0xdeadbeef");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "subscribe");
        assert_eq!(json["channel"], "orders");
        assert_eq!(json["contract"], "0xdeadbeef");
    }
}
