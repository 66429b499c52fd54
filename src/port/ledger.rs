//! Ledger boundary traits.
//!
//! These traits define the interface any ledger backend must provide: a
//! request/response reader for bulk state and a push stream for live change
//! notifications. The engine only ever talks to the ledger through them.

use async_trait::async_trait;

use crate::domain::{LedgerConstants, LedgerEvent, RawOrderRecord};
use crate::error::LedgerError;

/// Request/response reads against the escrow contract.
///
/// Implementations perform one outbound call per method and surface raw
/// provider failures; pacing, retries, and rate-limit handling belong to the
/// request governor, never here.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Fetch the ledger-wide expiry and grace constants.
    async fn fetch_constants(&self) -> Result<LedgerConstants, LedgerError>;

    /// Total number of order slots ever issued (exclusive id range end).
    async fn order_count(&self) -> Result<u64, LedgerError>;

    /// Read the contiguous slot range `[start, end)`.
    ///
    /// Never-created slots come back with a zero-address maker; callers
    /// decide what to skip.
    async fn load_slots(&self, start: u64, end: u64) -> Result<Vec<RawOrderRecord>, LedgerError>;
}

/// Push-based feed of ledger change notifications.
#[async_trait]
pub trait LedgerEventStream: Send + Sync {
    /// Establish the feed connection and subscribe to order events.
    async fn connect(&mut self) -> Result<(), LedgerError>;

    /// Next event in arrival order.
    ///
    /// Returns `None` when the stream has ended; a dropped connection is
    /// reported in-band as [`LedgerEvent::Disconnected`].
    async fn next_event(&mut self) -> Option<LedgerEvent>;

    /// Backend name for logging/debugging.
    fn venue(&self) -> &'static str;
}
