//! Process-wide layered settings store.
//!
//! Lookups consult, from highest to lowest precedence: temporary overrides
//! (innermost first), the environment (`LOGSHIP__SECTION__KEY`), then the
//! base layer filled by [`load_file`] and [`set_value`]. Keys are
//! case-insensitive `section.key` strings.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ini::Ini;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::error::ConfigurationError;
use super::source::ConfigSource;

const ENV_PREFIX: &str = "LOGSHIP";
const ENV_SEPARATOR: &str = "__";

type Layer = BTreeMap<String, String>;

#[derive(Default)]
struct Settings {
    base: Layer,
    overrides: Vec<(u64, Layer)>,
    next_override: u64,
}

impl Settings {
    fn lookup(&self, key: &str) -> Option<String> {
        self.overrides
            .iter()
            .rev()
            .find_map(|(_, layer)| layer.get(key).cloned())
            .or_else(|| std::env::var(env_key_for(key)).ok())
            .or_else(|| self.base.get(key).cloned())
    }
}

static SETTINGS: Lazy<RwLock<Settings>> = Lazy::new(|| RwLock::new(Settings::default()));

fn normalise_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

/// Environment variable consulted for `key`.
///
/// `logging.log_to_cloud` maps to `LOGSHIP__LOGGING__LOG_TO_CLOUD`.
pub fn env_key_for(key: &str) -> String {
    let mut name = String::from(ENV_PREFIX);
    for part in key.trim().split('.') {
        name.push_str(ENV_SEPARATOR);
        name.push_str(&part.to_ascii_uppercase());
    }
    name
}

/// The global settings store as a [`ConfigSource`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalSettings;

impl ConfigSource for GlobalSettings {
    fn get(&self, key: &str) -> Option<String> {
        SETTINGS.read().lookup(&normalise_key(key))
    }
}

/// Set a base-layer value.
pub fn set_value(key: &str, value: impl Into<String>) {
    SETTINGS.write().base.insert(normalise_key(key), value.into());
}

/// Clear the base layer and every temporary override.
///
/// Outstanding [`TemporaryConfig`] guards become no-ops.
pub fn reset_settings() {
    let mut settings = SETTINGS.write();
    settings.base.clear();
    settings.overrides.clear();
}

/// Merge an INI file into the base layer.
///
/// `[logging]\nlevel = DEBUG` sets `logging.level`. Keys outside any section
/// are stored without a prefix. Nothing is merged if the file fails to parse.
pub fn load_file(path: impl AsRef<Path>) -> Result<(), ConfigurationError> {
    let path = path.as_ref();
    let file_error = |reason: String| ConfigurationError::File {
        path: path.display().to_string(),
        reason,
    };
    let text = fs::read_to_string(path).map_err(|err| file_error(err.to_string()))?;
    let parsed = parse_ini(&text).map_err(file_error)?;
    SETTINGS.write().base.extend(parsed);
    Ok(())
}

fn parse_ini(text: &str) -> Result<Layer, String> {
    let ini = Ini::load_from_str(text).map_err(|err| err.to_string())?;
    let mut layer = Layer::new();
    for (section, props) in ini.iter() {
        for (key, value) in props.iter() {
            let key = match section {
                Some(section) => format!("{section}.{key}"),
                None => key.to_owned(),
            };
            layer.insert(normalise_key(&key), value.trim().to_owned());
        }
    }
    Ok(layer)
}

/// Guard returned by [`set_temporary_config`].
///
/// Dropping it removes its override layer, restoring whatever the keys
/// resolved to before, regardless of the order guards are dropped in.
#[must_use = "the override is removed as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TemporaryConfig {
    id: u64,
}

/// Push an override layer holding `pairs`.
pub fn set_temporary_config<I, K, V>(pairs: I) -> TemporaryConfig
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let layer: Layer = pairs
        .into_iter()
        .map(|(k, v)| (normalise_key(k.as_ref()), v.into()))
        .collect();
    let mut settings = SETTINGS.write();
    let id = settings.next_override;
    settings.next_override += 1;
    settings.overrides.push((id, layer));
    TemporaryConfig { id }
}

impl Drop for TemporaryConfig {
    fn drop(&mut self) {
        SETTINGS.write().overrides.retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("logging.level", "LOGSHIP__LOGGING__LEVEL")]
    #[case("logging.log_to_cloud", "LOGSHIP__LOGGING__LOG_TO_CLOUD")]
    #[case("cloud.log", "LOGSHIP__CLOUD__LOG")]
    #[case("Cloud.Auth_Token", "LOGSHIP__CLOUD__AUTH_TOKEN")]
    fn env_keys(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(env_key_for(key), expected);
    }

    #[test]
    fn ini_sections_become_key_prefixes() {
        let parsed = parse_ini(
            "top = 1\n\n[Logging]\nLevel = DEBUG \nlog_to_cloud = yes\n\n[cloud]\nlog = http://x/log\n",
        )
        .expect("valid ini");
        assert_eq!(parsed.get("top").map(String::as_str), Some("1"));
        assert_eq!(parsed.get("logging.level").map(String::as_str), Some("DEBUG"));
        assert_eq!(
            parsed.get("logging.log_to_cloud").map(String::as_str),
            Some("yes")
        );
        assert_eq!(parsed.get("cloud.log").map(String::as_str), Some("http://x/log"));
    }

    #[test]
    fn malformed_ini_is_rejected() {
        assert!(parse_ini("[logging\nlevel = INFO\n").is_err());
    }
}
