//! In-memory sink factory that records every posted batch.
//!
//! Clones share state, so a test can install one clone as the process-wide
//! factory and keep another for assertions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;

use crate::remote::{RemoteSink, ShippingError, SinkFactory, SinkTarget};

#[derive(Default)]
struct Shared {
    batches: Mutex<Vec<Vec<Value>>>,
    targets: Mutex<Vec<SinkTarget>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    failing: AtomicBool,
    post_delay: Mutex<Duration>,
    posts_started: AtomicUsize,
}

/// Factory handing out clients that record into shared state.
#[derive(Clone, Default)]
pub struct RecordingSinkFactory {
    shared: Arc<Shared>,
}

impl RecordingSinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent post fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every subsequent post sleep for `delay` before completing.
    pub fn set_post_delay(&self, delay: Duration) {
        *self.shared.post_delay.lock() = delay;
    }

    /// Number of posts that have begun, including failed and in-flight ones.
    pub fn posts_started(&self) -> usize {
        self.shared.posts_started.load(Ordering::SeqCst)
    }

    /// Number of clients built so far.
    pub fn connect_count(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Number of clients closed so far.
    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// Targets passed to `connect`, in call order.
    pub fn targets(&self) -> Vec<SinkTarget> {
        self.shared.targets.lock().clone()
    }

    /// Every successfully posted batch.
    pub fn batches(&self) -> Vec<Vec<Value>> {
        self.shared.batches.lock().clone()
    }

    /// Every successfully posted record, flattened in post order.
    pub fn records(&self) -> Vec<Value> {
        self.shared.batches.lock().iter().flatten().cloned().collect()
    }

    /// The `msg` field of every posted record.
    pub fn messages(&self) -> Vec<String> {
        self.records()
            .iter()
            .filter_map(|r| r.get("msg").and_then(Value::as_str).map(str::to_owned))
            .collect()
    }

    /// Poll until at least `count` records have been posted.
    pub fn wait_for_records(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.records().len() >= count)
    }

    /// Poll until at least `count` posts have begun.
    pub fn wait_for_posts_started(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.posts_started() >= count)
    }
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if done() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

impl SinkFactory for RecordingSinkFactory {
    fn connect(&self, target: &SinkTarget) -> Result<Box<dyn RemoteSink>, ShippingError> {
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        self.shared.targets.lock().push(target.clone());
        Ok(Box::new(RecordingSink {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct RecordingSink {
    shared: Arc<Shared>,
}

impl RemoteSink for RecordingSink {
    fn post(&mut self, batch: &[Value]) -> Result<(), ShippingError> {
        self.shared.posts_started.fetch_add(1, Ordering::SeqCst);
        let delay = *self.shared.post_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if self.shared.failing.load(Ordering::SeqCst) {
            return Err(ShippingError::Transport("collector unreachable".into()));
        }
        self.shared.batches.lock().push(batch.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
    }
}
