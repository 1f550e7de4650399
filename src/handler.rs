use std::any::Any;

use thiserror::Error;

use crate::log_record::LogRecord;
use crate::remote::ShippingError;

/// Errors a handler may report back to the dispatching logger.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler's consumer has shut down.
    #[error("handler is closed")]
    Closed,
    /// A remote post failed.
    #[error(transparent)]
    Shipping(#[from] ShippingError),
}

/// Trait implemented by all log handlers.
///
/// Handlers are `Send + Sync` so a single instance can be shared between
/// loggers and invoked from any emitting thread. Implementations must not
/// block the caller for longer than a channel send.
pub trait Handler: Send + Sync {
    /// Dispatch a log record for handling.
    fn handle(&self, record: LogRecord) -> Result<(), HandlerError>;

    /// Flush buffered output. Returns `false` when the flush could not
    /// complete.
    fn flush(&self) -> bool {
        true
    }

    /// Support downcasting when inspecting attached handlers.
    fn as_any(&self) -> &dyn Any;
}
