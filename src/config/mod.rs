//! Reading the logging configuration.
//!
//! [`ConfigSnapshot`] is built fresh from a [`ConfigSource`] every time the
//! logging tree is configured. The process-wide source is the layered
//! settings store fed by [`load_file`], [`set_value`] and
//! [`set_temporary_config`].

mod error;
mod settings;
mod snapshot;
mod source;

pub use error::ConfigurationError;
pub use settings::{
    GlobalSettings, TemporaryConfig, env_key_for, load_file, reset_settings,
    set_temporary_config, set_value,
};
pub use snapshot::{ConfigSnapshot, keys};
pub use source::ConfigSource;

#[cfg(test)]
mod config_tests;
