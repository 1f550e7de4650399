//! Compatibility bridge for the Rust `log` crate.
//!
//! [`LogshipLogAdapter`] implements `log::Log` and forwards records into the
//! logger tree, resolving the logger from the record target (`a::b` becomes
//! `a.b`). Records emitted by this crate itself are not forwarded, so a
//! failing remote sink cannot feed its own warnings back into the queue.

use std::borrow::Cow;
use std::sync::OnceLock;

use log::{Metadata, Record};
use thiserror::Error;

use crate::level::Level;
use crate::log_record::{LogRecord, RecordMetadata};
use crate::logger::Logger;
use crate::manager;

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Error returned when the adapter cannot become the global logger.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("a global `log` logger is already installed")]
pub struct LogBridgeError;

/// Adapter implementing the Rust `log::Log` trait.
pub struct LogshipLogAdapter;

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => Level::Trace,
            log::Level::Debug => Level::Debug,
            log::Level::Info => Level::Info,
            log::Level::Warn => Level::Warn,
            log::Level::Error => Level::Error,
        }
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn normalise_target(target: &str) -> Cow<'_, str> {
    if target.contains("::") {
        Cow::Owned(target.replace("::", "."))
    } else {
        Cow::Borrowed(target)
    }
}

/// Targets that are not valid logger names fall back to the root.
fn resolve_logger(target: &str) -> std::sync::Arc<Logger> {
    manager::get_logger(&normalise_target(target)).unwrap_or_else(|_| manager::root_logger())
}

impl log::Log for LogshipLogAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        !is_own_target(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let logger = resolve_logger(record.target());
        let level = Level::from(record.level());
        if !logger.is_enabled_for(level) {
            return;
        }
        let metadata = RecordMetadata {
            module_path: record.module_path().unwrap_or_default().to_string(),
            filename: record.file().unwrap_or_default().to_string(),
            line_number: record.line().unwrap_or(0),
            ..Default::default()
        };
        let message = record.args().to_string();
        logger.log_record(LogRecord::with_metadata(logger.name(), level, &message, metadata));
    }

    fn flush(&self) {
        manager::root_logger().flush_handlers();
    }
}

static LOGSHIP_LOG_ADAPTER: LogshipLogAdapter = LogshipLogAdapter;
static INSTALL_RESULT: OnceLock<Result<(), LogBridgeError>> = OnceLock::new();

/// Install the adapter as the global `log` logger.
///
/// Idempotent: later calls return the outcome of the first attempt.
pub fn install_global_logger() -> Result<(), LogBridgeError> {
    *INSTALL_RESULT.get_or_init(|| {
        log::set_logger(&LOGSHIP_LOG_ADAPTER).map_err(|_| LogBridgeError)?;
        log::set_max_level(log::LevelFilter::Trace);
        Ok(())
    })
}
