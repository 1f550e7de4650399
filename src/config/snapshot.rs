use url::Url;

use crate::level::Level;
use crate::remote::SinkTarget;

use super::error::ConfigurationError;
use super::settings::GlobalSettings;
use super::source::ConfigSource;

/// Configuration key names.
pub mod keys {
    pub const LEVEL: &str = "logging.level";
    pub const LOG_TO_CLOUD: &str = "logging.log_to_cloud";
    pub const CLOUD_ENDPOINT: &str = "cloud.log";
    pub const CLOUD_AUTH_TOKEN: &str = "cloud.auth_token";
}

/// Validated view of the logging configuration at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub level: Level,
    pub log_to_cloud: bool,
    pub cloud_endpoint: Option<Url>,
    pub auth_token: Option<String>,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            level: Level::Info,
            log_to_cloud: false,
            cloud_endpoint: None,
            auth_token: None,
        }
    }
}

impl ConfigSnapshot {
    /// Read and validate the global settings store.
    pub fn read() -> Result<Self, ConfigurationError> {
        Self::from_source(&GlobalSettings)
    }

    /// Read and validate `source`.
    ///
    /// The endpoint is only required, and only strictly validated, when
    /// shipping is enabled.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigurationError> {
        let level = match source.get(keys::LEVEL) {
            Some(raw) => raw.parse()?,
            None => Level::Info,
        };
        let log_to_cloud = match source.get(keys::LOG_TO_CLOUD) {
            Some(raw) => parse_bool(keys::LOG_TO_CLOUD, &raw)?,
            None => false,
        };
        let raw_endpoint = source
            .get(keys::CLOUD_ENDPOINT)
            .filter(|raw| !raw.trim().is_empty());
        let cloud_endpoint = match (raw_endpoint, log_to_cloud) {
            (Some(raw), true) => Some(parse_endpoint(&raw)?),
            (None, true) => return Err(ConfigurationError::MissingEndpoint),
            (Some(raw), false) => parse_endpoint(&raw).ok(),
            (None, false) => None,
        };
        let auth_token = source
            .get(keys::CLOUD_AUTH_TOKEN)
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty());
        Ok(Self {
            level,
            log_to_cloud,
            cloud_endpoint,
            auth_token,
        })
    }

    /// Target for the remote handler, when shipping is enabled.
    pub fn sink_target(&self) -> Option<SinkTarget> {
        if !self.log_to_cloud {
            return None;
        }
        let target = SinkTarget::new(self.cloud_endpoint.clone()?);
        Some(match &self.auth_token {
            Some(token) => target.with_auth_token(token.clone()),
            None => target,
        })
    }
}

pub(crate) fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigurationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigurationError::InvalidBool {
            key: key.to_owned(),
            value: raw.to_owned(),
        }),
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidEndpoint {
        url: raw.to_owned(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".into()));
    }
    Ok(url)
}
