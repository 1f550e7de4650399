//! Asynchronous shipping: an unbounded queue drained by one listener thread.

use std::sync::atomic::{AtomicUsize, Ordering};

mod listener;
mod queue;

pub use listener::{DEFAULT_BATCH_SIZE, ListenerState, ShippingListener};
pub use queue::{QueueHandler, ShippingQueue};

static LIVE_LISTENERS: AtomicUsize = AtomicUsize::new(0);

/// Number of listener threads currently alive in this process.
pub fn running_listeners() -> usize {
    LIVE_LISTENERS.load(Ordering::SeqCst)
}

/// Counts a listener thread for as long as it is held.
struct LiveListener;

impl LiveListener {
    fn register() -> Self {
        LIVE_LISTENERS.fetch_add(1, Ordering::SeqCst);
        Self
    }
}

impl Drop for LiveListener {
    fn drop(&mut self) {
        LIVE_LISTENERS.fetch_sub(1, Ordering::SeqCst);
    }
}
