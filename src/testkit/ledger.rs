//! Mock ledger backends for testing.
//!
//! Three mock types for different testing needs:
//!
//! - [`ScriptedReader`] — Pre-loaded constants/counts/slot responses keyed
//!   by range start. Best for: bulk-load behavior, retry handling.
//! - [`ScriptedStream`] — Pre-loaded connect results and a fixed event
//!   queue. Best for: reconnection logic, failure ceilings.
//! - [`channel_ledger`] — Channel-backed stream with an external control
//!   handle. Best for: integration tests needing precise, on-demand event
//!   delivery.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{LedgerConstants, LedgerEvent, RawOrderRecord};
use crate::error::LedgerError;
use crate::port::{LedgerEventStream, LedgerReader};

// ---------------------------------------------------------------------------
// ScriptedReader
// ---------------------------------------------------------------------------

/// A mock [`LedgerReader`] with responses scripted per range start.
///
/// Each `load_slots(start, ..)` call pops the next scripted result for
/// `start` (defaults to `Ok(vec![])` when exhausted), so retries of the same
/// range consume successive entries.
pub struct ScriptedReader {
    constants: Option<LedgerConstants>,
    order_count: u64,
    slots: Mutex<HashMap<u64, VecDeque<Result<Vec<RawOrderRecord>, LedgerError>>>>,
    constants_calls: AtomicU32,
    load_calls: AtomicU32,
}

impl ScriptedReader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            constants: None,
            order_count: 0,
            slots: Mutex::new(HashMap::new()),
            constants_calls: AtomicU32::new(0),
            load_calls: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn with_constants(mut self, constants: LedgerConstants) -> Self {
        self.constants = Some(constants);
        self
    }

    #[must_use]
    pub fn with_order_count(mut self, count: u64) -> Self {
        self.order_count = count;
        self
    }

    /// Queue a successful read for the range starting at `start`.
    #[must_use]
    pub fn with_slots(self, start: u64, records: Vec<RawOrderRecord>) -> Self {
        self.slots
            .lock()
            .unwrap()
            .entry(start)
            .or_default()
            .push_back(Ok(records));
        self
    }

    /// Queue a failure for the range starting at `start`.
    #[must_use]
    pub fn with_slot_failure(self, start: u64, err: LedgerError) -> Self {
        self.slots
            .lock()
            .unwrap()
            .entry(start)
            .or_default()
            .push_back(Err(err));
        self
    }

    pub fn constants_calls(&self) -> u32 {
        self.constants_calls.load(Ordering::SeqCst)
    }

    pub fn load_calls(&self) -> u32 {
        self.load_calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerReader for ScriptedReader {
    async fn fetch_constants(&self) -> Result<LedgerConstants, LedgerError> {
        self.constants_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.constants.unwrap_or(LedgerConstants {
            order_expiry_secs: 3_600,
            grace_period_secs: 600,
        }))
    }

    async fn order_count(&self) -> Result<u64, LedgerError> {
        Ok(self.order_count)
    }

    async fn load_slots(&self, start: u64, _end: u64) -> Result<Vec<RawOrderRecord>, LedgerError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.slots
            .lock()
            .unwrap()
            .get_mut(&start)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ---------------------------------------------------------------------------
// ScriptedStream
// ---------------------------------------------------------------------------

/// A mock event stream with scripted connect results and a fixed event
/// queue.
///
/// Each `connect()` pops the next result (defaults to `Ok(())` when
/// exhausted). When the event queue runs dry the stream either ends
/// (`None`) or, with [`ScriptedStream::hold_open`], blocks forever to
/// simulate a quiet connection.
pub struct ScriptedStream {
    connect_results: VecDeque<Result<(), LedgerError>>,
    events: VecDeque<Option<LedgerEvent>>,
    hold_open: bool,
    connect_count: Arc<AtomicU32>,
}

impl ScriptedStream {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connect_results: VecDeque::new(),
            events: VecDeque::new(),
            hold_open: false,
            connect_count: Arc::new(AtomicU32::new(0)),
        }
    }

    #[must_use]
    pub fn with_connect_results(mut self, results: Vec<Result<(), LedgerError>>) -> Self {
        self.connect_results = results.into();
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Vec<Option<LedgerEvent>>) -> Self {
        self.events = events.into();
        self
    }

    /// Block forever once the scripted events are exhausted.
    #[must_use]
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Shared counter for asserting connect call counts.
    #[must_use]
    pub fn connect_count_handle(&self) -> Arc<AtomicU32> {
        self.connect_count.clone()
    }
}

impl Default for ScriptedStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerEventStream for ScriptedStream {
    async fn connect(&mut self) -> Result<(), LedgerError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn next_event(&mut self) -> Option<LedgerEvent> {
        match self.events.pop_front() {
            Some(event) => event,
            None if self.hold_open => std::future::pending().await,
            None => None,
        }
    }

    fn venue(&self) -> &'static str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// ChannelStream
// ---------------------------------------------------------------------------

/// A mock event stream controlled externally via a [`ChannelHandle`].
///
/// Events are sent into the handle and read by the supervisor via
/// `next_event()`. No real network I/O.
pub struct ChannelStream {
    event_rx: tokio::sync::mpsc::Receiver<Option<LedgerEvent>>,
    connect_count: Arc<AtomicU32>,
}

/// Control handle for a [`ChannelStream`].
pub struct ChannelHandle {
    event_tx: tokio::sync::mpsc::Sender<Option<LedgerEvent>>,
    connect_count: Arc<AtomicU32>,
}

impl ChannelHandle {
    /// Send an event to the stream.
    pub async fn send(&self, event: LedgerEvent) {
        let _ = self.event_tx.send(Some(event)).await;
    }

    /// Signal end-of-stream (causes `next_event` to return `None`).
    pub async fn close(&self) {
        let _ = self.event_tx.send(None).await;
    }

    /// How many times `connect()` was called.
    #[must_use]
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }
}

/// Create a [`ChannelStream`] and its control [`ChannelHandle`].
#[must_use]
pub fn channel_ledger(buffer: usize) -> (ChannelStream, ChannelHandle) {
    let (tx, rx) = tokio::sync::mpsc::channel(buffer);
    let connect_count = Arc::new(AtomicU32::new(0));
    (
        ChannelStream {
            event_rx: rx,
            connect_count: connect_count.clone(),
        },
        ChannelHandle {
            event_tx: tx,
            connect_count,
        },
    )
}

#[async_trait]
impl LedgerEventStream for ChannelStream {
    async fn connect(&mut self) -> Result<(), LedgerError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<LedgerEvent> {
        match self.event_rx.recv().await {
            Some(Some(event)) => Some(event),
            Some(None) | None => None,
        }
    }

    fn venue(&self) -> &'static str {
        "mock"
    }
}
