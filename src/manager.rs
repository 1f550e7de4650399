//! Global registry mapping logger names to instances.
//!
//! Loggers are created on first lookup together with any missing ancestors, so
//! every registered logger has a live parent chain ending at the root. Lookups
//! of an existing name return the same `Arc`.
//!
//! A logger's canonical name is qualified by the root, so `get_logger("api")`
//! yields the logger named `root.api`. The bare dotted path is accepted as an
//! alias.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::level::Level;
use crate::logger::Logger;

/// Name of the logger at the top of the hierarchy.
pub const ROOT_LOGGER_NAME: &str = "root";

/// Error returned for malformed dotted names.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid logger name {0:?}")]
pub struct InvalidLoggerName(pub String);

#[derive(Default)]
struct Manager {
    loggers: HashMap<String, Arc<Logger>>,
}

impl Manager {
    fn root(&mut self) -> Arc<Logger> {
        Arc::clone(
            self.loggers
                .entry(ROOT_LOGGER_NAME.to_string())
                .or_insert_with(|| Arc::new(Logger::new(ROOT_LOGGER_NAME, Level::default()))),
        )
    }

    fn ensure(&mut self, name: &str) -> Arc<Logger> {
        if name == ROOT_LOGGER_NAME {
            return self.root();
        }
        if let Some(existing) = self.loggers.get(name) {
            return Arc::clone(existing);
        }
        let parent = match name.rsplit_once('.') {
            Some((parent, _)) => self.ensure(parent),
            None => self.root(),
        };
        let logger = Arc::new(Logger::with_parent(qualified(name), Some(parent)));
        self.loggers.insert(name.to_string(), Arc::clone(&logger));
        logger
    }
}

static MANAGER: Lazy<RwLock<Manager>> = Lazy::new(|| RwLock::new(Manager::default()));

fn qualified(path: &str) -> String {
    format!("{ROOT_LOGGER_NAME}.{path}")
}

/// Strip the optional root qualifier, returning the registry key.
fn normalise(name: &str) -> Result<&str, InvalidLoggerName> {
    if name.is_empty() || name.split('.').any(str::is_empty) {
        return Err(InvalidLoggerName(name.to_string()));
    }
    Ok(name
        .strip_prefix(ROOT_LOGGER_NAME)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(name))
}

/// Retrieve an existing logger or create it (and its ancestors).
///
/// `root` names the root logger. Other loggers are named `root.<name>`; both
/// the qualified and the bare form address the same logger.
pub fn get_logger(name: &str) -> Result<Arc<Logger>, InvalidLoggerName> {
    let name = normalise(name)?;
    if let Some(existing) = MANAGER.read().loggers.get(name) {
        return Ok(Arc::clone(existing));
    }
    Ok(MANAGER.write().ensure(name))
}

/// Return the root logger, creating it on first use.
pub fn root_logger() -> Arc<Logger> {
    if let Some(root) = MANAGER.read().loggers.get(ROOT_LOGGER_NAME) {
        return Arc::clone(root);
    }
    MANAGER.write().root()
}

/// Canonical names of every registered logger, sorted.
pub fn logger_names() -> Vec<String> {
    let mut names: Vec<String> = MANAGER
        .read()
        .loggers
        .values()
        .map(|logger| logger.name().to_string())
        .collect();
    names.sort();
    names
}

/// Forget every registered logger.
///
/// Outstanding `Arc<Logger>` handles stay usable but are no longer returned by
/// lookups. Call [`shutdown_logging`](crate::shutdown_logging) first when a
/// shipping unit is attached, otherwise it keeps running on the old root.
pub fn reset_manager() {
    MANAGER.write().loggers.clear();
}
