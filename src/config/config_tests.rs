//! Unit tests for configuration snapshots and the settings store.

use std::collections::HashMap;
use std::io::Write;

use rstest::{fixture, rstest};
use serial_test::serial;
use tempfile::NamedTempFile;
use url::Url;

use super::*;
use crate::level::Level;

fn source(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
    pairs.iter().copied().collect()
}

/// Clears the global store before and after each test using it.
struct CleanSettings;

impl Drop for CleanSettings {
    fn drop(&mut self) {
        reset_settings();
    }
}

#[fixture]
fn clean_settings() -> CleanSettings {
    reset_settings();
    CleanSettings
}

#[test]
fn empty_source_yields_defaults() {
    let snapshot = ConfigSnapshot::from_source(&source(&[])).expect("valid");
    assert_eq!(snapshot, ConfigSnapshot::default());
    assert_eq!(snapshot.level, Level::Info);
    assert!(snapshot.sink_target().is_none());
}

#[rstest]
#[case("DEBUG", Level::Debug)]
#[case("warning", Level::Warn)]
#[case(" critical ", Level::Critical)]
fn level_is_parsed(#[case] raw: &'static str, #[case] expected: Level) {
    let snapshot = ConfigSnapshot::from_source(&source(&[(keys::LEVEL, raw)])).expect("valid");
    assert_eq!(snapshot.level, expected);
}

#[test]
fn invalid_level_is_rejected() {
    let err = ConfigSnapshot::from_source(&source(&[(keys::LEVEL, "LOUD")]))
        .expect_err("invalid level");
    assert!(matches!(err, ConfigurationError::InvalidLevel(_)));
}

#[rstest]
#[case("true", true)]
#[case("1", true)]
#[case("Yes", true)]
#[case("on", true)]
#[case("false", false)]
#[case("0", false)]
#[case("NO", false)]
#[case("off", false)]
fn bool_spellings(#[case] raw: &'static str, #[case] expected: bool) {
    let snapshot = ConfigSnapshot::from_source(&source(&[
        (keys::LOG_TO_CLOUD, raw),
        (keys::CLOUD_ENDPOINT, "http://collector/log"),
    ]))
    .expect("valid");
    assert_eq!(snapshot.log_to_cloud, expected);
}

#[test]
fn invalid_bool_names_the_key() {
    let err = ConfigSnapshot::from_source(&source(&[(keys::LOG_TO_CLOUD, "maybe")]))
        .expect_err("invalid bool");
    match err {
        ConfigurationError::InvalidBool { key, value } => {
            assert_eq!(key, keys::LOG_TO_CLOUD);
            assert_eq!(value, "maybe");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn shipping_requires_endpoint() {
    let err = ConfigSnapshot::from_source(&source(&[(keys::LOG_TO_CLOUD, "true")]))
        .expect_err("missing endpoint");
    assert!(matches!(err, ConfigurationError::MissingEndpoint));
}

#[rstest]
#[case("not a url")]
#[case("ftp://collector/log")]
#[case("mailto:ops@example.com")]
#[case("/relative/path")]
fn shipping_rejects_bad_endpoints(#[case] raw: &'static str) {
    let err = ConfigSnapshot::from_source(&source(&[
        (keys::LOG_TO_CLOUD, "true"),
        (keys::CLOUD_ENDPOINT, raw),
    ]))
    .expect_err("invalid endpoint");
    assert!(matches!(err, ConfigurationError::InvalidEndpoint { .. }));
}

#[test]
fn bad_endpoint_is_ignored_without_shipping() {
    let snapshot = ConfigSnapshot::from_source(&source(&[(keys::CLOUD_ENDPOINT, "not a url")]))
        .expect("valid");
    assert!(snapshot.cloud_endpoint.is_none());
}

#[test]
fn sink_target_carries_token() {
    let snapshot = ConfigSnapshot::from_source(&source(&[
        (keys::LOG_TO_CLOUD, "on"),
        (keys::CLOUD_ENDPOINT, "https://collector.example/log"),
        (keys::CLOUD_AUTH_TOKEN, " secret "),
    ]))
    .expect("valid");
    let target = snapshot.sink_target().expect("shipping enabled");
    assert_eq!(
        target.endpoint,
        Url::parse("https://collector.example/log").expect("url")
    );
    assert_eq!(target.auth_token.as_deref(), Some("secret"));
}

#[rstest]
#[serial]
fn temporary_config_overrides_and_restores(_clean_settings: CleanSettings) {
    set_value(keys::LEVEL, "ERROR");
    {
        let _guard = set_temporary_config([(keys::LEVEL, "DEBUG")]);
        assert_eq!(ConfigSnapshot::read().expect("valid").level, Level::Debug);
    }
    assert_eq!(ConfigSnapshot::read().expect("valid").level, Level::Error);
}

#[rstest]
#[serial]
fn nested_overrides_restore_out_of_order(_clean_settings: CleanSettings) {
    let outer = set_temporary_config([(keys::LEVEL, "WARN")]);
    let inner = set_temporary_config([(keys::LEVEL, "TRACE")]);
    assert_eq!(GlobalSettings.get(keys::LEVEL).as_deref(), Some("TRACE"));
    drop(outer);
    assert_eq!(GlobalSettings.get(keys::LEVEL).as_deref(), Some("TRACE"));
    drop(inner);
    assert_eq!(GlobalSettings.get(keys::LEVEL), None);
}

#[rstest]
#[serial]
fn keys_are_case_insensitive(_clean_settings: CleanSettings) {
    set_value("Logging.Level", "ERROR");
    assert_eq!(GlobalSettings.get("logging.level").as_deref(), Some("ERROR"));
}

#[rstest]
#[serial]
fn load_file_merges_sections(_clean_settings: CleanSettings) {
    let mut file = NamedTempFile::new().expect("create temp ini file");
    writeln!(
        file,
        "[logging]\nlevel = WARNING\nlog_to_cloud = true\n\n[cloud]\nlog = http://collector/log"
    )
    .expect("write ini contents");

    load_file(file.path()).expect("load");
    let snapshot = ConfigSnapshot::read().expect("valid");
    assert_eq!(snapshot.level, Level::Warn);
    assert!(snapshot.log_to_cloud);
    assert_eq!(
        snapshot.cloud_endpoint.as_ref().map(Url::as_str),
        Some("http://collector/log")
    );
}

#[rstest]
#[serial]
fn load_file_reports_missing_file(_clean_settings: CleanSettings) {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load_file(dir.path().join("absent.ini")).expect_err("missing file");
    assert!(matches!(err, ConfigurationError::File { .. }));
}

#[rstest]
#[serial]
fn overrides_beat_file_values(_clean_settings: CleanSettings) {
    let mut file = NamedTempFile::new().expect("create temp ini file");
    writeln!(file, "[logging]\nlevel = ERROR").expect("write ini contents");
    load_file(file.path()).expect("load");

    let _guard = set_temporary_config([(keys::LEVEL, "DEBUG")]);
    assert_eq!(ConfigSnapshot::read().expect("valid").level, Level::Debug);
}
