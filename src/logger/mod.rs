//! Core logger implementation.
//!
//! A [`Logger`] checks records against its effective level and dispatches them
//! synchronously to its own handlers and then to the handlers of each
//! ancestor while propagation is enabled. Handlers are expected to hand work
//! off (for example to the shipping queue) rather than perform I/O on the
//! emitting thread.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use log::warn;
// parking_lot avoids poisoning and matches crate-wide locking strategy
use parking_lot::RwLock;

use crate::handler::Handler;
use crate::level::Level;
use crate::log_record::{LogRecord, RecordMetadata};
use crate::rate_limited_warner::RateLimitedWarner;

/// Sentinel stored in the level slot when the logger inherits its level.
const LEVEL_UNSET: u8 = u8::MAX;

pub struct Logger {
    /// Fully qualified dotted name.
    name: String,
    /// Parent in the hierarchy; `None` only for the root.
    parent: Option<Arc<Logger>>,
    level: AtomicU8,
    propagate: AtomicBool,
    handlers: RwLock<Vec<Arc<dyn Handler>>>,
    error_warner: RateLimitedWarner,
}

impl Logger {
    /// Create a detached logger with its own level and no parent.
    pub fn new(name: impl Into<String>, level: Level) -> Self {
        let logger = Self::with_parent(name.into(), None);
        logger.set_level(level);
        logger
    }

    /// Create a logger with an explicit parent. The level is inherited until
    /// [`set_level`](Self::set_level) is called.
    pub fn with_parent(name: String, parent: Option<Arc<Logger>>) -> Self {
        Self {
            name,
            parent,
            level: AtomicU8::new(LEVEL_UNSET),
            propagate: AtomicBool::new(true),
            handlers: RwLock::new(Vec::new()),
            error_warner: RateLimitedWarner::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Logger>> {
        self.parent.as_ref()
    }

    /// Level explicitly set on this logger, if any.
    pub fn level(&self) -> Option<Level> {
        Level::try_from(self.level.load(Ordering::Relaxed)).ok()
    }

    /// Update the logger's minimum level.
    ///
    /// The update is thread-safe because the level is stored in an `AtomicU8`.
    pub fn set_level(&self, level: Level) {
        self.level.store(u8::from(level), Ordering::Relaxed);
    }

    /// Revert to inheriting the level from the nearest ancestor.
    pub fn clear_level(&self) {
        self.level.store(LEVEL_UNSET, Ordering::Relaxed);
    }

    /// The level in force for this logger: its own, else the nearest
    /// ancestor's, else `INFO`.
    pub fn effective_level(&self) -> Level {
        let mut current = Some(self);
        while let Some(logger) = current {
            if let Some(level) = logger.level() {
                return level;
            }
            current = logger.parent.as_deref();
        }
        Level::default()
    }

    /// Return whether `level` is enabled for this logger.
    pub fn is_enabled_for(&self, level: Level) -> bool {
        level >= self.effective_level()
    }

    /// Return whether this logger propagates records to its parent.
    pub fn propagate(&self) -> bool {
        self.propagate.load(Ordering::SeqCst)
    }

    pub fn set_propagate(&self, flag: bool) {
        self.propagate.store(flag, Ordering::SeqCst);
    }

    /// Attach a handler to this logger.
    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.handlers.write().push(handler);
    }

    /// Detach a handler previously added to this logger.
    pub fn remove_handler(&self, handler: &Arc<dyn Handler>) -> bool {
        let mut handlers = self.handlers.write();
        if let Some(pos) = handlers.iter().position(|h| Arc::ptr_eq(h, handler)) {
            handlers.remove(pos);
            true
        } else {
            false
        }
    }

    /// Remove all handlers from this logger.
    pub fn clear_handlers(&self) {
        self.handlers.write().clear();
    }

    /// Snapshot of the handlers attached directly to this logger.
    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.handlers.read().clone()
    }

    /// Log `message` at `level`. Returns `true` when the record passed the
    /// level check and was dispatched.
    pub fn log(&self, level: Level, message: &str) -> bool {
        if !self.is_enabled_for(level) {
            return false;
        }
        self.dispatch(LogRecord::new(&self.name, level, message));
        true
    }

    /// Log with explicit source location and structured attributes.
    pub fn log_with_metadata(&self, level: Level, message: &str, metadata: RecordMetadata) -> bool {
        if !self.is_enabled_for(level) {
            return false;
        }
        self.dispatch(LogRecord::with_metadata(&self.name, level, message, metadata));
        true
    }

    /// Dispatch an already-constructed record through this logger.
    ///
    /// The record is checked against this logger's effective level only;
    /// ancestors reached through propagation do not filter again.
    pub fn log_record(&self, record: LogRecord) -> bool {
        if !self.is_enabled_for(record.level()) {
            return false;
        }
        self.dispatch(record);
        true
    }

    pub fn trace(&self, message: &str) -> bool {
        self.log(Level::Trace, message)
    }

    pub fn debug(&self, message: &str) -> bool {
        self.log(Level::Debug, message)
    }

    pub fn info(&self, message: &str) -> bool {
        self.log(Level::Info, message)
    }

    pub fn warn(&self, message: &str) -> bool {
        self.log(Level::Warn, message)
    }

    pub fn error(&self, message: &str) -> bool {
        self.log(Level::Error, message)
    }

    pub fn critical(&self, message: &str) -> bool {
        self.log(Level::Critical, message)
    }

    /// Flush every handler reachable from this logger through propagation.
    ///
    /// Returns `true` when every handler flush succeeds.
    pub fn flush_handlers(&self) -> bool {
        let mut ok = true;
        for logger in self.propagation_chain() {
            for handler in logger.handlers() {
                ok &= handler.flush();
            }
        }
        ok
    }

    /// This logger followed by each ancestor reached through propagation.
    fn propagation_chain(&self) -> impl Iterator<Item = &Logger> {
        let mut next = Some(self);
        std::iter::from_fn(move || {
            let current = next?;
            next = if current.propagate() {
                current.parent.as_deref()
            } else {
                None
            };
            Some(current)
        })
    }

    fn dispatch(&self, record: LogRecord) {
        for logger in self.propagation_chain() {
            logger.send_to_local_handlers(&record);
        }
    }

    fn send_to_local_handlers(&self, record: &LogRecord) {
        // Clone the list so handlers run without holding the lock; a
        // concurrent reconfiguration only affects later records.
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            if let Err(err) = handler.handle(record.clone()) {
                self.error_warner.record_drop();
                self.error_warner.warn_if_due(|count| {
                    warn!(
                        "Logger {:?}: {count} records rejected by handlers; last error: {err}",
                        self.name
                    );
                });
            }
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("level", &self.level())
            .field("propagate", &self.propagate())
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}
