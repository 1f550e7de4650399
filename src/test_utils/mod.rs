//! Test-only helpers shared across unit and integration tests.
//!
//! Compiled for unit tests and behind the `test-util` feature, which the
//! crate's own dev-dependency enables for the `tests/` directory.

mod collecting_handler;
mod recording_sink;

pub use collecting_handler::CollectingHandler;
pub use recording_sink::RecordingSinkFactory;
