use std::io;

use thiserror::Error;

use crate::level::ParseLevelError;

/// Errors reported while reading or applying the logging configuration.
///
/// Every variant is produced before any logger or listener is touched, with
/// the exception of [`ListenerSpawn`](Self::ListenerSpawn).
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// `logging.level` does not name a known level.
    #[error(transparent)]
    InvalidLevel(#[from] ParseLevelError),
    /// A boolean key holds something other than a recognised spelling.
    #[error("invalid boolean for {key}: {value:?}")]
    InvalidBool { key: String, value: String },
    /// Shipping is enabled but no endpoint is configured.
    #[error("logging.log_to_cloud is enabled but cloud.log is not set")]
    MissingEndpoint,
    /// The endpoint is not an absolute http(s) URL.
    #[error("invalid cloud.log endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
    /// A configuration file could not be read or parsed.
    #[error("failed to load configuration from {path}: {reason}")]
    File { path: String, reason: String },
    /// The shipping listener thread could not be started.
    #[error("failed to start shipping listener: {0}")]
    ListenerSpawn(#[source] io::Error),
}
