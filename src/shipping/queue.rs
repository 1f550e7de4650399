//! Unbounded FIFO between emitting threads and the shipping listener.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::handler::{Handler, HandlerError};
use crate::log_record::LogRecord;

/// Pending records awaiting shipment.
///
/// Sending never blocks. Submission order is preserved for every producer.
pub struct ShippingQueue {
    tx: Sender<LogRecord>,
    rx: Receiver<LogRecord>,
    open: Arc<AtomicBool>,
}

impl ShippingQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Emission-side handler feeding this queue.
    pub fn handler(&self) -> QueueHandler {
        QueueHandler {
            tx: self.tx.clone(),
            open: Arc::clone(&self.open),
        }
    }

    /// Number of messages currently waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Whether [`QueueHandler`]s still accept records.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn receiver(&self) -> Receiver<LogRecord> {
        self.rx.clone()
    }

    pub(crate) fn reopen(&self) {
        self.open.store(true, Ordering::Release);
    }

    /// Refuse further records. Records already queued stay queued.
    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Remove every waiting record, returning how many were dropped.
    pub(crate) fn discard_pending(&self) -> usize {
        self.rx.try_iter().count()
    }
}

impl Default for ShippingQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Handler`] that enqueues records for the shipping listener.
#[derive(Clone)]
pub struct QueueHandler {
    tx: Sender<LogRecord>,
    open: Arc<AtomicBool>,
}

impl Handler for QueueHandler {
    fn handle(&self, record: LogRecord) -> Result<(), HandlerError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(HandlerError::Closed);
        }
        self.tx
            .send(record)
            .map_err(|_| HandlerError::Closed)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
