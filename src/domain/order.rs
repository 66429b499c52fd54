//! Escrow order records and the pure rules derived from them.

use serde::{Deserialize, Serialize};

use super::id::{Address, OrderId, TokenId};
use super::metrics::DealMetrics;

/// Ledger status of an order.
///
/// Transitions are monotone: `Active` may become `Filled` or `Canceled`,
/// terminal states never revert. Cleanup removes the record entirely rather
/// than introducing a fourth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Active,
    Filled,
    Canceled,
}

impl OrderStatus {
    /// Map the ledger's numeric status enum.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Active),
            1 => Some(Self::Filled),
            2 => Some(Self::Canceled),
            _ => None,
        }
    }

    /// True once the ledger has recorded a final outcome.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Ledger-wide constants, fetched once at startup and immutable for the
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConstants {
    /// Seconds from creation until an order stops being fillable.
    pub order_expiry_secs: u64,
    /// Seconds after expiry during which the maker may still cancel.
    pub grace_period_secs: u64,
}

/// A raw order slot as read from the ledger, before status mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOrderRecord {
    pub id: u64,
    pub maker: Address,
    pub taker: Address,
    pub sell_token: TokenId,
    pub buy_token: TokenId,
    pub sell_amount: u128,
    pub buy_amount: u128,
    pub created_at: u64,
    pub status_code: u8,
    pub retry_count: u32,
    pub creation_fee: u128,
}

/// One maker's deposit-and-ask record, fillable by a taker.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub maker: Address,
    /// Counterparty restriction; the zero address means anyone may fill.
    pub taker: Address,
    pub sell_token: TokenId,
    pub buy_token: TokenId,
    /// Deposited quantity in token base units.
    pub sell_amount: u128,
    /// Asked quantity in token base units.
    pub buy_amount: u128,
    /// Unix seconds, set once at creation.
    pub created_at: u64,
    pub status: OrderStatus,
    /// Times this logical order was re-issued under a new id after a failed
    /// cleanup-return of funds.
    pub retry_count: u32,
    /// Fee paid at creation; interpreted by the cleanup collaborator, carried
    /// verbatim here.
    pub creation_fee: u128,
    /// Derived valuation, recomputed from the price feed; never authoritative.
    pub deal_metrics: Option<DealMetrics>,
}

impl Order {
    /// Build an order from a raw ledger record with an already-mapped status.
    #[must_use]
    pub fn from_record(record: RawOrderRecord, status: OrderStatus) -> Self {
        Self {
            id: OrderId::new(record.id),
            maker: record.maker,
            taker: record.taker,
            sell_token: record.sell_token,
            buy_token: record.buy_token,
            sell_amount: record.sell_amount,
            buy_amount: record.buy_amount,
            created_at: record.created_at,
            status,
            retry_count: record.retry_count,
            creation_fee: record.creation_fee,
            deal_metrics: None,
        }
    }

    /// Re-issue this order under a new id after a failed cleanup-return,
    /// carrying forward the maker, tokens, and amounts.
    #[must_use]
    pub fn reissued(&self, new_id: OrderId, retry_count: u32, created_at: u64) -> Self {
        Self {
            id: new_id,
            created_at,
            retry_count,
            status: OrderStatus::Active,
            deal_metrics: None,
            ..self.clone()
        }
    }

    /// Unix second at which the order stops being fillable.
    #[must_use]
    pub const fn expires_at(&self, constants: &LedgerConstants) -> u64 {
        self.created_at + constants.order_expiry_secs
    }

    /// Unix second at which the maker's cancellation window closes and the
    /// order becomes cleanup-eligible.
    #[must_use]
    pub const fn grace_ends_at(&self, constants: &LedgerConstants) -> u64 {
        self.expires_at(constants) + constants.grace_period_secs
    }

    /// Whether `account` may fill this order at `now`.
    ///
    /// Requires an active, unexpired order whose taker restriction admits
    /// the account; makers never fill their own orders. Exactly at
    /// `expires_at` the order is no longer fillable.
    #[must_use]
    pub fn can_fill(&self, account: &Address, constants: &LedgerConstants, now: u64) -> bool {
        self.status == OrderStatus::Active
            && now < self.expires_at(constants)
            && *account != self.maker
            && (self.taker.is_anyone() || self.taker == *account)
    }

    /// Whether `account` may cancel this order at `now`.
    ///
    /// Only the maker, only while active, and only before the grace window
    /// closes. Exactly at `grace_ends_at` cancellation is no longer allowed.
    #[must_use]
    pub fn can_cancel(&self, account: &Address, constants: &LedgerConstants, now: u64) -> bool {
        self.status == OrderStatus::Active
            && now < self.grace_ends_at(constants)
            && *account == self.maker
    }

    /// The status to display for this order at `now`.
    ///
    /// Derives `Expired` for active orders past their expiry; the ledger
    /// alone decides when such an order becomes terminal or is cleaned up.
    #[must_use]
    pub fn display_status(&self, constants: &LedgerConstants, now: u64) -> DisplayStatus {
        match self.status {
            OrderStatus::Filled => DisplayStatus::Filled,
            OrderStatus::Canceled => DisplayStatus::Canceled,
            OrderStatus::Active if now >= self.expires_at(constants) => DisplayStatus::Expired,
            OrderStatus::Active => DisplayStatus::Active,
        }
    }
}

/// User-facing order status, including the derived `Expired` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    Active,
    Filled,
    Canceled,
    Expired,
}

impl DisplayStatus {
    /// The label shown to users.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Filled => "Filled",
            Self::Canceled => "Canceled",
            Self::Expired => "Expired",
        }
    }
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
