use std::sync::Arc;

use crate::logger::Logger;
use crate::manager::{self, InvalidLoggerName};

/// Fetch the root logger or a named logger beneath it.
///
/// `None` yields the root. A name yields the child logger `root.<name>`,
/// created on first use; passing the qualified form addresses the same
/// logger. Repeated calls with the same name return the same instance.
pub fn get_logger(name: Option<&str>) -> Result<Arc<Logger>, InvalidLoggerName> {
    match name {
        None => Ok(manager::root_logger()),
        Some(name) => manager::get_logger(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;

    #[test]
    #[serial]
    fn none_is_the_root() {
        let a = get_logger(None).expect("root");
        let b = get_logger(None).expect("root");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), manager::ROOT_LOGGER_NAME);
        assert!(a.parent().is_none());
    }

    #[test]
    #[serial]
    fn named_logger_is_stable_child_of_root() {
        let first = get_logger(Some("billing")).expect("logger");
        let second = get_logger(Some("billing")).expect("logger");
        assert!(Arc::ptr_eq(&first, &second));
        let parent = first.parent().expect("has parent");
        assert!(Arc::ptr_eq(parent, &get_logger(None).expect("root")));
        assert_eq!(first.name(), "root.billing");
    }

    #[test]
    #[serial]
    fn root_prefix_addresses_the_same_logger() {
        let plain = get_logger(Some("billing.invoices")).expect("logger");
        let prefixed = get_logger(Some("root.billing.invoices")).expect("logger");
        assert!(Arc::ptr_eq(&plain, &prefixed));
    }

    #[rstest]
    #[case("")]
    #[case(".leading")]
    #[case("trailing.")]
    #[case("double..dot")]
    fn malformed_names_are_rejected(#[case] name: &str) {
        assert_eq!(
            get_logger(Some(name)).map(|l| l.name().to_owned()),
            Err(InvalidLoggerName(name.to_owned()))
        );
    }
}
