//! Fixtures isolating the process-wide logging state between tests.
//!
//! Every test using [`shipping_env`] must also be `#[serial]`: the logger
//! registry, settings store, sink factory and shipping unit are all global.

use std::sync::Arc;

use logship::config::reset_settings;
use logship::manager::reset_manager;
use logship::remote::{SinkFactory, install_sink_factory};
use logship::shutdown_logging;
use logship::test_utils::RecordingSinkFactory;
use rstest::fixture;

/// Recording sink factory installed for the duration of a test.
pub struct ShippingEnv {
    pub sink: RecordingSinkFactory,
    previous: Option<Arc<dyn SinkFactory>>,
}

impl Drop for ShippingEnv {
    fn drop(&mut self) {
        shutdown_logging();
        reset_manager();
        reset_settings();
        if let Some(previous) = self.previous.take() {
            install_sink_factory(previous);
        }
    }
}

#[fixture]
pub fn shipping_env() -> ShippingEnv {
    shutdown_logging();
    reset_manager();
    reset_settings();
    let sink = RecordingSinkFactory::new();
    let previous = Some(install_sink_factory(Arc::new(sink.clone())));
    ShippingEnv { sink, previous }
}
