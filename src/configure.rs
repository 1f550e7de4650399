//! Applying the configuration to the logger tree.
//!
//! At most one shipping unit (queue, listener and remote handler) exists per
//! process. Reconfiguring detaches and fully stops the current unit before a
//! replacement is started.

use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use url::Url;

use crate::config::{ConfigSnapshot, ConfigSource, ConfigurationError, GlobalSettings};
use crate::handler::Handler;
use crate::logger::Logger;
use crate::manager::root_logger;
use crate::remote::RemoteHandler;
use crate::shipping::{ShippingListener, ShippingQueue};

struct ShippingUnit {
    root: Arc<Logger>,
    queue_handler: Arc<dyn Handler>,
    listener: ShippingListener,
}

impl ShippingUnit {
    fn start(
        root: Arc<Logger>,
        snapshot: &ConfigSnapshot,
    ) -> Result<Option<Self>, ConfigurationError> {
        let Some(target) = snapshot.sink_target() else {
            return Ok(None);
        };
        let handler = Arc::new(RemoteHandler::new(target, Some(snapshot.level)));
        let queue = ShippingQueue::new();
        let queue_handler: Arc<dyn Handler> = Arc::new(queue.handler());
        let mut listener = ShippingListener::new(queue, handler);
        listener.start().map_err(ConfigurationError::ListenerSpawn)?;
        root.add_handler(Arc::clone(&queue_handler));
        Ok(Some(Self {
            root,
            queue_handler,
            listener,
        }))
    }

    fn stop(mut self) {
        self.root.remove_handler(&self.queue_handler);
        let discarded = self.listener.stop();
        if discarded > 0 {
            debug!("shipping unit stopped; {discarded} queued records were not shipped");
        }
    }
}

static SHIPPING: Lazy<Mutex<Option<ShippingUnit>>> = Lazy::new(|| Mutex::new(None));

/// Configure the logger tree from the global settings store.
///
/// Sets the root level and, when `logging.log_to_cloud` is enabled, attaches
/// a fresh shipping unit posting to `cloud.log`. Safe to call repeatedly;
/// on error the previous configuration stays in effect. Records still queued
/// for a replaced unit are discarded rather than shipped.
pub fn configure_logging() -> Result<Arc<Logger>, ConfigurationError> {
    configure_logging_from(&GlobalSettings)
}

/// Like [`configure_logging`] but reads from `source`.
pub fn configure_logging_from(
    source: &dyn ConfigSource,
) -> Result<Arc<Logger>, ConfigurationError> {
    let snapshot = ConfigSnapshot::from_source(source)?;
    let mut active = SHIPPING.lock();
    if let Some(previous) = active.take() {
        previous.stop();
    }

    let root = root_logger();
    root.set_level(snapshot.level);
    *active = ShippingUnit::start(Arc::clone(&root), &snapshot)?;
    debug!(
        "configured logging: level={} shipping={}",
        snapshot.level,
        active.as_ref().map_or("off", |_| "on")
    );
    Ok(root)
}

/// Detach and stop the active shipping unit.
///
/// The batch being posted is finished; records still queued are discarded.
pub fn shutdown_logging() {
    if let Some(unit) = SHIPPING.lock().take() {
        unit.stop();
    }
}

/// Whether a shipping unit is currently attached.
pub fn shipping_active() -> bool {
    SHIPPING.lock().is_some()
}

/// Endpoint of the attached shipping unit.
pub fn shipping_endpoint() -> Option<Url> {
    SHIPPING
        .lock()
        .as_ref()
        .map(|unit| unit.listener.handler().endpoint().clone())
}
