//! Ledger change notifications.

use super::id::OrderId;
use super::order::RawOrderRecord;

/// A single push notification from the ledger's event feed.
///
/// Events for the same order id arrive in ledger order; there is no ordering
/// guarantee across different ids. `Disconnected` is the stream's in-band
/// termination signal rather than a ledger state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A new order was created; always enters the cache as active.
    Created(RawOrderRecord),
    /// An active order was taken.
    Filled(OrderId),
    /// An active order was canceled by its maker.
    Canceled(OrderId),
    /// The order's escrow was reclaimed; the record disappears.
    CleanedUp(OrderId),
    /// A failed cleanup-return re-issued the order under a new id.
    Retried {
        old_id: OrderId,
        new_id: OrderId,
        retry_count: u32,
        created_at: u64,
    },
    /// The feed connection dropped.
    Disconnected { reason: String },
}

impl LedgerEvent {
    /// Stable name for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "order_created",
            Self::Filled(_) => "order_filled",
            Self::Canceled(_) => "order_canceled",
            Self::CleanedUp(_) => "order_cleaned_up",
            Self::Retried { .. } => "order_retried",
            Self::Disconnected { .. } => "disconnected",
        }
    }
}
