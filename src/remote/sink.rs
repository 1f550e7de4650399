//! Remote sink client capability and the process-wide factory.
//!
//! A [`RemoteSink`] owns whatever connection state is needed to post batches
//! to the collector. Sinks are never serialized or shared between processes;
//! a [`SinkFactory`] rebuilds them from a [`SinkTarget`] instead.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use super::http::HttpSinkFactory;

/// Transient failure while shipping a batch.
///
/// These errors never reach the code that emitted the records; the remote
/// handler reports them through a rate-limited warning and drops the batch.
#[derive(Debug, Error)]
pub enum ShippingError {
    /// Network-level failure (DNS, connect, timeout, reset).
    #[error("transport error: {0}")]
    Transport(String),
    /// The collector answered with a non-success status.
    #[error("collector responded with HTTP {0}")]
    Status(u16),
    /// The batch could not be encoded.
    #[error("failed to serialise log batch: {0}")]
    Serialise(#[from] serde_json::Error),
    /// A client could not be constructed for the target.
    #[error("failed to build sink client: {0}")]
    Client(String),
}

/// Everything needed to (re)build a client. Safe to serialize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkTarget {
    /// Collector endpoint receiving the POSTed batches.
    pub endpoint: Url,
    /// Optional bearer token sent with each request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl SinkTarget {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// A live client able to post batches of serialized records.
pub trait RemoteSink: Send {
    /// Post one batch. Any error is treated as transient by the caller.
    fn post(&mut self, batch: &[Value]) -> Result<(), ShippingError>;

    /// Release connection resources. Called once before the sink is dropped
    /// by its owning handler.
    fn close(&mut self) {}
}

/// Builds [`RemoteSink`] clients for a target.
pub trait SinkFactory: Send + Sync {
    fn connect(&self, target: &SinkTarget) -> Result<Box<dyn RemoteSink>, ShippingError>;
}

static SINK_FACTORY: Lazy<RwLock<Arc<dyn SinkFactory>>> =
    Lazy::new(|| RwLock::new(Arc::new(HttpSinkFactory::default())));

/// Replace the process-wide factory, returning the previous one.
///
/// Handlers created afterwards, including handlers deserialized in this
/// process, build their clients through the new factory.
pub fn install_sink_factory(factory: Arc<dyn SinkFactory>) -> Arc<dyn SinkFactory> {
    std::mem::replace(&mut *SINK_FACTORY.write(), factory)
}

/// The factory currently installed for this process.
pub fn sink_factory() -> Arc<dyn SinkFactory> {
    Arc::clone(&SINK_FACTORY.read())
}
