//! Default sink posting JSON batches over HTTP.
//!
//! Each client keeps a `ureq::Agent` for connection pooling. Credentials come
//! from the target's bearer token or, failing that, from userinfo embedded in
//! the endpoint URL, which is stripped before the URL is used.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use ureq::{Agent, AgentBuilder};
use url::Url;

use super::sink::{RemoteSink, ShippingError, SinkFactory, SinkTarget};

/// Default connection timeout applied when establishing HTTP connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default overall timeout for a single POST.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Factory for [`HttpSink`] clients.
#[derive(Clone, Debug)]
pub struct HttpSinkFactory {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpSinkFactory {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SinkFactory for HttpSinkFactory {
    fn connect(&self, target: &SinkTarget) -> Result<Box<dyn RemoteSink>, ShippingError> {
        let tls =
            native_tls::TlsConnector::new().map_err(|e| ShippingError::Client(e.to_string()))?;
        let agent = AgentBuilder::new()
            .timeout_connect(self.connect_timeout)
            .timeout(self.request_timeout)
            .tls_connector(Arc::new(tls))
            .build();
        Ok(Box::new(HttpSink::new(agent, target)))
    }
}

/// Client posting `application/json` arrays to a single endpoint.
pub struct HttpSink {
    agent: Agent,
    url: String,
    authorization: Option<String>,
}

impl HttpSink {
    pub fn new(agent: Agent, target: &SinkTarget) -> Self {
        let authorization = authorization_header(target);
        Self {
            agent,
            url: strip_userinfo(&target.endpoint).to_string(),
            authorization,
        }
    }
}

impl RemoteSink for HttpSink {
    fn post(&mut self, batch: &[Value]) -> Result<(), ShippingError> {
        let body = serde_json::to_string(batch)?;
        let mut req = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json");
        if let Some(auth) = &self.authorization {
            req = req.set("Authorization", auth);
        }
        match req.send_string(&body) {
            Ok(response) => check_status(response.status()),
            Err(ureq::Error::Status(code, _)) => Err(ShippingError::Status(code)),
            Err(ureq::Error::Transport(err)) => Err(ShippingError::Transport(err.to_string())),
        }
    }
}

fn check_status(status: u16) -> Result<(), ShippingError> {
    match status {
        200..=299 => Ok(()),
        other => Err(ShippingError::Status(other)),
    }
}

fn authorization_header(target: &SinkTarget) -> Option<String> {
    if let Some(token) = &target.auth_token {
        return Some(format!("Bearer {token}"));
    }
    let endpoint = &target.endpoint;
    if endpoint.username().is_empty() {
        return None;
    }
    let username = percent_decode_str(endpoint.username()).decode_utf8_lossy();
    let password = endpoint
        .password()
        .map(|p| percent_decode_str(p).decode_utf8_lossy())
        .unwrap_or_default();
    let encoded = BASE64_STANDARD.encode(format!("{username}:{password}"));
    Some(format!("Basic {encoded}"))
}

fn strip_userinfo(endpoint: &Url) -> Url {
    let mut url = endpoint.clone();
    // Only fails for cannot-be-a-base URLs, which never carry userinfo.
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url
}
