//! Process-local log shipping.
//!
//! Loggers form a dotted hierarchy under a single root. When shipping is
//! enabled, [`configure_logging`] attaches a queue to the root; a background
//! listener drains it and posts batches of JSON records to the configured
//! collector through a [`RemoteHandler`].
//!
//! ```no_run
//! use logship::{configure_logging, get_logger};
//!
//! let _guard = logship::config::set_temporary_config([
//!     ("logging.level", "INFO"),
//!     ("logging.log_to_cloud", "true"),
//!     ("cloud.log", "https://collector.example/log"),
//! ]);
//! configure_logging()?;
//! get_logger(Some("billing"))?.info("invoice sent");
//! logship::shutdown_logging();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod accessor;
pub mod config;
mod configure;
pub mod handler;
pub mod level;
pub mod log_record;
pub mod logger;
pub mod manager;
pub mod rate_limited_warner;
pub mod remote;
pub mod shipping;

#[cfg(feature = "log-compat")]
pub mod log_compat;
#[cfg(feature = "tracing-compat")]
pub mod tracing_compat;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use accessor::get_logger;
pub use config::{ConfigSnapshot, ConfigSource, ConfigurationError};
pub use configure::{
    configure_logging, configure_logging_from, shipping_active, shipping_endpoint,
    shutdown_logging,
};
pub use handler::{Handler, HandlerError};
pub use level::{Level, ParseLevelError};
pub use log_record::{LogRecord, RecordMetadata};
pub use logger::Logger;
pub use manager::InvalidLoggerName;
pub use remote::{RemoteHandler, RemoteSink, ShippingError, SinkFactory, SinkTarget};
pub use shipping::running_listeners;

#[cfg(feature = "log-compat")]
pub use log_compat::{LogBridgeError, install_global_logger};
#[cfg(feature = "tracing-compat")]
pub use tracing_compat::LogshipLayer;
