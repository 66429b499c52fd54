//! Governed read access to the ledger.
//!
//! Wraps a [`LedgerReader`] so that every read goes through the request
//! governor, maps raw slots into domain orders, and caches the session
//! constants. Live events are not mediated here; the supervisor arms the
//! push stream directly.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::domain::{LedgerConstants, Order, OrderStatus};
use crate::engine::governor::RequestGovernor;
use crate::error::LedgerError;
use crate::port::LedgerReader;

/// Outcome of a bulk load over an id range.
#[derive(Debug, Default)]
pub struct BulkLoadReport {
    /// Orders mapped from live slots, in read order.
    pub orders: Vec<Order>,
    /// Never-created or malformed slots that were skipped.
    pub skipped_slots: usize,
    /// Batches abandoned after the governor's retry budget.
    pub failed_batches: usize,
}

/// Typed, governed reads against the escrow contract.
pub struct LedgerGateway {
    reader: Arc<dyn LedgerReader>,
    governor: Arc<RequestGovernor>,
    constants: OnceCell<LedgerConstants>,
}

impl LedgerGateway {
    #[must_use]
    pub fn new(reader: Arc<dyn LedgerReader>, governor: Arc<RequestGovernor>) -> Self {
        Self {
            reader,
            governor,
            constants: OnceCell::new(),
        }
    }

    /// The ledger-wide expiry and grace constants, fetched once per session.
    pub async fn constants(&self) -> Result<LedgerConstants, LedgerError> {
        let reader = &self.reader;
        let governor = &self.governor;
        self.constants
            .get_or_try_init(|| async {
                governor
                    .enqueue(|| {
                        let reader = Arc::clone(reader);
                        async move { reader.fetch_constants().await }
                    })
                    .await
            })
            .await
            .copied()
    }

    /// The constants, if a fetch has already succeeded this session.
    #[must_use]
    pub fn constants_cached(&self) -> Option<LedgerConstants> {
        self.constants.get().copied()
    }

    /// Exclusive end of the ledger's order id range.
    pub async fn order_count(&self) -> Result<u64, LedgerError> {
        self.governor
            .enqueue(|| {
                let reader = Arc::clone(&self.reader);
                async move { reader.order_count().await }
            })
            .await
    }

    /// Read the id range `[start, end)` in batches of `batch_size`.
    ///
    /// Never-created slots (zero-address maker) and slots with an unknown
    /// status code are skipped. A batch that still fails after the
    /// governor's retry budget is skipped as a whole: its orders are simply
    /// absent until the next resync, which is not an error.
    pub async fn bulk_load(&self, start: u64, end: u64, batch_size: u64) -> BulkLoadReport {
        let mut report = BulkLoadReport::default();
        let step = batch_size.max(1);

        let mut lo = start;
        while lo < end {
            let hi = (lo + step).min(end);
            let batch = self
                .governor
                .enqueue(|| {
                    let reader = Arc::clone(&self.reader);
                    async move { reader.load_slots(lo, hi).await }
                })
                .await;

            match batch {
                Ok(records) => {
                    for record in records {
                        if record.maker.is_zero() {
                            report.skipped_slots += 1;
                            continue;
                        }
                        match OrderStatus::from_code(record.status_code) {
                            Some(status) => {
                                report.orders.push(Order::from_record(record, status));
                            }
                            None => {
                                warn!(
                                    slot = record.id,
                                    status_code = record.status_code,
                                    "Skipping slot with unknown status code"
                                );
                                report.skipped_slots += 1;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        range_start = lo,
                        range_end = hi,
                        error = %err,
                        "Batch read failed after retries, skipping range"
                    );
                    report.failed_batches += 1;
                }
            }
            lo = hi;
        }

        debug!(
            loaded = report.orders.len(),
            skipped = report.skipped_slots,
            failed_batches = report.failed_batches,
            "Bulk load finished"
        );
        report
    }
}
