//! Background thread draining the shipping queue into a [`RemoteHandler`].
//!
//! The listener takes whatever is already queued, up to the batch size,
//! and hands it to the handler in one call. It never waits for a batch to
//! fill, so a lone record is shipped as soon as the thread sees it.
//!
//! Stopping is signalled on a separate channel. The batch being posted is
//! allowed to finish and whatever is still queued is discarded.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select};
use log::{debug, warn};

use crate::log_record::LogRecord;
use crate::remote::RemoteHandler;

use super::LiveListener;
use super::queue::ShippingQueue;

/// Maximum number of records handed to the remote handler at once.
pub const DEFAULT_BATCH_SIZE: usize = 64;

const THREAD_NAME: &str = "logship-listener";

/// Lifecycle of a [`ShippingListener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

pub struct ShippingListener {
    queue: ShippingQueue,
    handler: Arc<RemoteHandler>,
    batch_size: usize,
    state: ListenerState,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ShippingListener {
    pub fn new(queue: ShippingQueue, handler: Arc<RemoteHandler>) -> Self {
        Self {
            queue,
            handler,
            batch_size: DEFAULT_BATCH_SIZE,
            state: ListenerState::Stopped,
            stop_tx: None,
            handle: None,
        }
    }

    /// Override the batch size. Values below one are treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn queue(&self) -> &ShippingQueue {
        &self.queue
    }

    pub fn handler(&self) -> &Arc<RemoteHandler> {
        &self.handler
    }

    /// Spawn the listener thread and wait until it is ready to drain.
    ///
    /// Starting a running listener is a no-op.
    pub fn start(&mut self) -> io::Result<()> {
        if self.state == ListenerState::Running {
            return Ok(());
        }
        self.state = ListenerState::Starting;
        self.queue.reopen();

        let (ready_tx, ready_rx) = bounded(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let rx = self.queue.receiver();
        let handler = Arc::clone(&self.handler);
        let batch_size = self.batch_size;
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                let _live = LiveListener::register();
                let _ = ready_tx.send(());
                listener_loop(&rx, &stop_rx, &handler, batch_size);
                handler.close();
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.state = ListenerState::Stopped;
                return Err(err);
            }
        };

        if ready_rx.recv().is_err() {
            let _ = handle.join();
            self.state = ListenerState::Stopped;
            return Err(io::Error::other("shipping listener exited before becoming ready"));
        }
        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
        self.state = ListenerState::Running;
        debug!("ShippingListener: started for {}", self.handler.endpoint());
        Ok(())
    }

    /// Stop the thread once the batch in flight, if any, has been posted.
    ///
    /// Records still queued are discarded and counted in the return value.
    /// Records submitted after this call begins are rejected by the queue.
    /// Stopping a stopped listener is a no-op.
    pub fn stop(&mut self) -> usize {
        let Some(handle) = self.handle.take() else {
            self.state = ListenerState::Stopped;
            return 0;
        };
        self.state = ListenerState::Stopping;
        self.queue.close();
        // Disconnecting the stop channel wakes the thread.
        drop(self.stop_tx.take());
        if handle.join().is_err() {
            warn!("ShippingListener: listener thread panicked");
        }
        let discarded = self.queue.discard_pending();
        if discarded > 0 {
            debug!("ShippingListener: discarded {discarded} undelivered records on stop");
        }
        self.state = ListenerState::Stopped;
        discarded
    }
}

impl Drop for ShippingListener {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl std::fmt::Debug for ShippingListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShippingListener")
            .field("state", &self.state)
            .field("batch_size", &self.batch_size)
            .field("handler", &self.handler)
            .finish()
    }
}

fn listener_loop(
    rx: &Receiver<LogRecord>,
    stop_rx: &Receiver<()>,
    handler: &RemoteHandler,
    batch_size: usize,
) {
    let mut batch = Vec::with_capacity(batch_size);
    while !stop_requested(stop_rx) {
        let first = select! {
            recv(stop_rx) -> _ => return,
            recv(rx) -> record => match record {
                Ok(record) => record,
                Err(_) => return,
            },
        };
        batch.push(first);
        batch.extend(rx.try_iter().take(batch_size - 1));
        handler.emit_batch(&batch);
        batch.clear();
    }
}

fn stop_requested(stop_rx: &Receiver<()>) -> bool {
    !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::level::Level;
    use crate::remote::SinkTarget;
    use crate::test_utils::RecordingSinkFactory;
    use rstest::{fixture, rstest};
    use serial_test::serial;
    use std::time::{Duration, Instant};
    use url::Url;

    struct Harness {
        factory: RecordingSinkFactory,
        listener: ShippingListener,
    }

    #[fixture]
    fn harness() -> Harness {
        let factory = RecordingSinkFactory::new();
        let target = SinkTarget::new(Url::parse("http://collector.test/log").expect("url"));
        let handler = RemoteHandler::with_factory(target, None, Arc::new(factory.clone()));
        let listener = ShippingListener::new(ShippingQueue::new(), Arc::new(handler));
        Harness { factory, listener }
    }

    fn submit(listener: &ShippingListener, message: &str) {
        listener
            .queue()
            .handler()
            .handle(LogRecord::new("ship", Level::Info, message))
            .expect("enqueue");
    }

    #[rstest]
    #[serial]
    fn start_and_stop_walk_the_state_machine(mut harness: Harness) {
        let listener = &mut harness.listener;
        assert_eq!(listener.state(), ListenerState::Stopped);
        listener.start().expect("start");
        assert_eq!(listener.state(), ListenerState::Running);
        assert_eq!(super::super::running_listeners(), 1);
        listener.stop();
        assert_eq!(listener.state(), ListenerState::Stopped);
        assert_eq!(super::super::running_listeners(), 0);
    }

    #[rstest]
    #[serial]
    fn repeated_start_and_stop_are_noops(mut harness: Harness) {
        let listener = &mut harness.listener;
        listener.stop();
        listener.start().expect("start");
        listener.start().expect("second start");
        assert_eq!(super::super::running_listeners(), 1);
        listener.stop();
        listener.stop();
        assert_eq!(listener.state(), ListenerState::Stopped);
    }

    #[rstest]
    #[serial]
    fn delivered_records_arrive_in_order(mut harness: Harness) {
        harness.listener.start().expect("start");
        for i in 0..200 {
            submit(&harness.listener, &format!("m{i}"));
        }
        assert!(harness.factory.wait_for_records(200, Duration::from_secs(5)));
        assert_eq!(harness.listener.stop(), 0);
        let expected: Vec<String> = (0..200).map(|i| format!("m{i}")).collect();
        assert_eq!(harness.factory.messages(), expected);
        assert!(harness.factory.close_count() >= 1);
    }

    #[rstest]
    #[serial]
    fn stop_finishes_the_batch_in_flight_and_discards_the_rest(mut harness: Harness) {
        harness.factory.set_post_delay(Duration::from_millis(200));
        for i in 0..200 {
            submit(&harness.listener, &format!("m{i}"));
        }
        harness.listener.start().expect("start");
        assert!(harness.factory.wait_for_posts_started(1, Duration::from_secs(5)));

        let discarded = harness.listener.stop();

        let delivered = harness.factory.messages();
        assert_eq!(delivered.len(), DEFAULT_BATCH_SIZE);
        assert_eq!(discarded, 200 - DEFAULT_BATCH_SIZE);
        assert_eq!(harness.factory.posts_started(), 1);
        let expected: Vec<String> = (0..DEFAULT_BATCH_SIZE).map(|i| format!("m{i}")).collect();
        assert_eq!(delivered, expected);
        assert!(harness.listener.queue().is_empty());
    }

    #[rstest]
    #[serial]
    fn stop_waits_for_one_post_not_the_backlog(mut harness: Harness) {
        let post = Duration::from_millis(100);
        harness.factory.set_post_delay(post);
        harness.factory.set_failing(true);
        for i in 0..1280 {
            submit(&harness.listener, &i.to_string());
        }
        harness.listener.start().expect("start");
        assert!(harness.factory.wait_for_posts_started(1, Duration::from_secs(5)));

        let began = Instant::now();
        harness.listener.stop();
        let elapsed = began.elapsed();

        assert!(elapsed < post * 3, "stop took {elapsed:?}");
        assert_eq!(harness.factory.posts_started(), 1);
        assert_eq!(super::super::running_listeners(), 0);
    }

    #[rstest]
    #[serial]
    fn records_after_stop_are_discarded(mut harness: Harness) {
        harness.listener.start().expect("start");
        let handler = harness.listener.queue().handler();
        harness.listener.stop();
        assert!(
            handler
                .handle(LogRecord::new("ship", Level::Info, "late"))
                .is_err()
        );
        assert!(harness.listener.queue().is_empty());
        assert!(harness.factory.messages().is_empty());
    }

    #[rstest]
    #[serial]
    fn queued_before_start_is_shipped(mut harness: Harness) {
        submit(&harness.listener, "early");
        harness.listener.start().expect("start");
        assert!(
            harness
                .factory
                .wait_for_records(1, Duration::from_secs(5))
        );
        assert_eq!(harness.factory.messages(), ["early"]);
    }

    #[rstest]
    #[serial]
    fn batches_never_exceed_batch_size(harness: Harness) {
        let Harness { factory, listener } = harness;
        let mut listener = listener.with_batch_size(4);
        for i in 0..10 {
            submit(&listener, &i.to_string());
        }
        listener.start().expect("start");
        assert!(factory.wait_for_records(10, Duration::from_secs(5)));
        listener.stop();
        let sizes: Vec<usize> = factory.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 10);
        assert!(sizes.iter().all(|&n| n <= 4), "sizes: {sizes:?}");
    }

    #[rstest]
    #[serial]
    fn restart_after_stop_ships_again(mut harness: Harness) {
        harness.listener.start().expect("start");
        submit(&harness.listener, "first");
        assert!(harness.factory.wait_for_records(1, Duration::from_secs(5)));
        harness.listener.stop();
        harness.listener.start().expect("restart");
        submit(&harness.listener, "second");
        assert!(harness.factory.wait_for_records(2, Duration::from_secs(5)));
        harness.listener.stop();
        assert_eq!(harness.factory.messages(), ["first", "second"]);
    }

    #[rstest]
    #[serial]
    fn drop_stops_the_thread_and_discards_the_backlog(harness: Harness) {
        let Harness { factory, mut listener } = harness;
        factory.set_post_delay(Duration::from_millis(100));
        for i in 0..100 {
            submit(&listener, &i.to_string());
        }
        let queue_handler = listener.queue().handler();
        listener.start().expect("start");
        assert!(factory.wait_for_posts_started(1, Duration::from_secs(5)));
        drop(listener);
        assert_eq!(super::super::running_listeners(), 0);
        assert_eq!(factory.records().len(), DEFAULT_BATCH_SIZE);
        assert!(
            queue_handler
                .handle(LogRecord::new("ship", Level::Info, "late"))
                .is_err()
        );
    }
}
