pub mod fixtures;

pub use fixtures::{ShippingEnv, shipping_env};
