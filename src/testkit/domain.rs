//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for [`Address`], [`RawOrderRecord`],
//! and related types so tests focus on assertions rather than construction
//! boilerplate.

use crate::domain::{Address, LedgerEvent, RawOrderRecord, TokenId};

/// Create an [`Address`] from a string.
pub fn address(addr: &str) -> Address {
    Address::new(addr)
}

/// Create a [`TokenId`] from a string.
pub fn token(id: &str) -> TokenId {
    TokenId::from(id)
}

/// A live order slot with the given maker, open to any taker.
pub fn active_record(id: u64, maker: &str) -> RawOrderRecord {
    RawOrderRecord {
        id,
        maker: Address::new(maker),
        taker: Address::zero(),
        sell_token: TokenId::new("0xsell"),
        buy_token: TokenId::new("0xbuy"),
        sell_amount: 1_000,
        buy_amount: 2_000,
        created_at: 1_000,
        status_code: 0,
        retry_count: 0,
        creation_fee: 10,
    }
}

/// A never-created slot: zero-address maker, as the ledger returns them.
pub fn empty_record(id: u64) -> RawOrderRecord {
    RawOrderRecord {
        id,
        maker: Address::zero(),
        taker: Address::zero(),
        sell_token: TokenId::new("0x"),
        buy_token: TokenId::new("0x"),
        sell_amount: 0,
        buy_amount: 0,
        created_at: 0,
        status_code: 0,
        retry_count: 0,
        creation_fee: 0,
    }
}

/// Create a [`Disconnected`](LedgerEvent::Disconnected) event.
pub fn disconnect_event(reason: &str) -> LedgerEvent {
    LedgerEvent::Disconnected {
        reason: reason.to_string(),
    }
}
