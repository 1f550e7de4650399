//! Shipping records to a remote collector.
//!
//! [`RemoteHandler`] is the handler attached behind the shipping queue. It
//! turns records into JSON objects and posts them in batches through a
//! [`RemoteSink`] built by the process-wide [`SinkFactory`]. The default
//! factory produces [`HttpSink`] clients.

mod handler;
mod http;
mod record;
mod sink;

pub use handler::RemoteHandler;
pub use http::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, HttpSink, HttpSinkFactory};
pub use sink::{
    RemoteSink, ShippingError, SinkFactory, SinkTarget, install_sink_factory, sink_factory,
};
