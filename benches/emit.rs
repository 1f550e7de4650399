//! Benchmarks for the emission path.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use logship::remote::{RemoteSink, ShippingError, SinkFactory, SinkTarget};
use logship::shipping::{ShippingListener, ShippingQueue};
use logship::{Level, Logger, RemoteHandler};
use serde_json::Value;
use url::Url;

/// Sink accepting and discarding every batch.
struct NullSink;

impl RemoteSink for NullSink {
    fn post(&mut self, batch: &[Value]) -> Result<(), ShippingError> {
        black_box(batch);
        Ok(())
    }
}

impl SinkFactory for NullSink {
    fn connect(&self, _target: &SinkTarget) -> Result<Box<dyn RemoteSink>, ShippingError> {
        Ok(Box::new(NullSink))
    }
}

fn bench_filtered(c: &mut Criterion) {
    let logger = Logger::new("bench.filtered", Level::Error);
    c.bench_function("emit_filtered_out", |b| {
        b.iter(|| black_box(logger.info(black_box("ignored"))))
    });
}

fn bench_queued(c: &mut Criterion) {
    let target = SinkTarget::new(Url::parse("http://bench.invalid/log").expect("url"));
    let handler = RemoteHandler::with_factory(target, None, Arc::new(NullSink));
    let queue = ShippingQueue::new();
    let logger = Logger::new("bench.queued", Level::Info);
    logger.add_handler(Arc::new(queue.handler()));
    let mut listener = ShippingListener::new(queue, Arc::new(handler));
    listener.start().expect("start listener");

    c.bench_function("emit_to_shipping_queue", |b| {
        b.iter(|| black_box(logger.info(black_box("shipped"))))
    });

    listener.stop();
}

criterion_group!(benches, bench_filtered, bench_queued);
criterion_main!(benches);
