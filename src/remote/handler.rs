//! Handler forwarding records to the remote collector.

use std::fmt;
use std::slice;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::handler::{Handler, HandlerError};
use crate::level::Level;
use crate::log_record::LogRecord;
use crate::rate_limited_warner::RateLimitedWarner;

use super::record::serialise_batch;
use super::sink::{RemoteSink, ShippingError, SinkFactory, SinkTarget, sink_factory};

/// A client together with the process that built it.
struct BoundClient {
    pid: u32,
    sink: Box<dyn RemoteSink>,
}

/// Handler posting records to a [`RemoteSink`].
///
/// Only the target and level threshold are part of the handler's serialized
/// form. The client is built lazily on first use and rebuilt whenever the
/// handler finds itself in a different process from the one that built it
/// (after a fork) or has no client at all (after deserialization or
/// [`Clone`]). Send failures are logged through a rate-limited warning and
/// never returned to the emitting code.
#[derive(Serialize, Deserialize)]
pub struct RemoteHandler {
    target: SinkTarget,
    #[serde(default)]
    level: Option<Level>,
    #[serde(skip)]
    client: Mutex<Option<BoundClient>>,
    #[serde(skip, default = "sink_factory")]
    factory: Arc<dyn SinkFactory>,
    #[serde(skip)]
    warner: RateLimitedWarner,
}

impl RemoteHandler {
    /// Create a handler using the process-wide sink factory.
    pub fn new(target: SinkTarget, level: Option<Level>) -> Self {
        Self::with_factory(target, level, sink_factory())
    }

    /// Create a handler building its clients through `factory`.
    pub fn with_factory(
        target: SinkTarget,
        level: Option<Level>,
        factory: Arc<dyn SinkFactory>,
    ) -> Self {
        Self {
            target,
            level,
            client: Mutex::new(None),
            factory,
            warner: RateLimitedWarner::default(),
        }
    }

    pub fn target(&self) -> &SinkTarget {
        &self.target
    }

    pub fn endpoint(&self) -> &Url {
        &self.target.endpoint
    }

    /// Minimum level forwarded; `None` forwards everything.
    pub fn level(&self) -> Option<Level> {
        self.level
    }

    /// Whether a client built in this process is currently held.
    pub fn is_connected(&self) -> bool {
        self.client
            .lock()
            .as_ref()
            .is_some_and(|c| c.pid == std::process::id())
    }

    /// Forward a single record.
    pub fn emit(&self, record: &LogRecord) {
        self.emit_batch(slice::from_ref(record));
    }

    /// Forward the records at or above the level threshold as one batch.
    pub fn emit_batch(&self, records: &[LogRecord]) {
        if let Err(err) = self.try_emit_batch(records) {
            let lost = records.iter().filter(|r| self.accepts(r)).count();
            self.report_failure(lost, &err);
        }
    }

    /// Like [`emit_batch`](Self::emit_batch) but surfaces the failure.
    pub fn try_emit_batch(&self, records: &[LogRecord]) -> Result<(), ShippingError> {
        let payload = serialise_batch(records.iter().filter(|r| self.accepts(r)))?;
        if payload.is_empty() {
            return Ok(());
        }
        self.with_client(|sink| sink.post(&payload))
    }

    /// Release the current client, if any.
    pub fn close(&self) {
        let released = self.client.lock().take();
        if let Some(mut client) = released {
            // A client inherited across a fork belongs to the parent.
            if client.pid == std::process::id() {
                client.sink.close();
            }
        }
        self.warner.flush(|count| {
            warn!("RemoteHandler: {count} records to {} were not shipped", self.target.endpoint);
        });
    }

    /// Pretend the current client was built by process `pid`.
    #[cfg(test)]
    pub(crate) fn rebind_client_pid(&self, pid: u32) {
        if let Some(client) = self.client.lock().as_mut() {
            client.pid = pid;
        }
    }

    fn accepts(&self, record: &LogRecord) -> bool {
        self.level.is_none_or(|level| record.level() >= level)
    }

    fn with_client<R>(
        &self,
        post: impl FnOnce(&mut dyn RemoteSink) -> Result<R, ShippingError>,
    ) -> Result<R, ShippingError> {
        let mut guard = self.client.lock();
        let pid = std::process::id();
        let client = match guard.take() {
            Some(client) if client.pid == pid => client,
            inherited => {
                if inherited.is_some() {
                    debug!(
                        "RemoteHandler: dropping client from another process; reconnecting to {}",
                        self.target.endpoint
                    );
                }
                BoundClient {
                    pid,
                    sink: self.factory.connect(&self.target)?,
                }
            }
        };
        let client = guard.insert(client);
        post(client.sink.as_mut())
    }

    fn report_failure(&self, count: usize, err: &ShippingError) {
        for _ in 0..count {
            self.warner.record_drop();
        }
        self.warner.warn_if_due(|dropped| {
            warn!(
                "RemoteHandler: dropped {dropped} records for {}; last error: {err}",
                self.target.endpoint
            );
        });
    }
}

impl Clone for RemoteHandler {
    /// Copies the target, level and factory. The clone starts without a
    /// client and connects on first use.
    fn clone(&self) -> Self {
        Self::with_factory(self.target.clone(), self.level, Arc::clone(&self.factory))
    }
}

impl Handler for RemoteHandler {
    fn handle(&self, record: LogRecord) -> Result<(), HandlerError> {
        self.emit(&record);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Drop for RemoteHandler {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for RemoteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHandler")
            .field("endpoint", &self.target.endpoint.as_str())
            .field("level", &self.level)
            .field("connected", &self.is_connected())
            .finish()
    }
}
