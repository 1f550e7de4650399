//! `tracing` bridge.
//!
//! [`LogshipLayer`] turns `tracing` events into records on the logger named
//! after the event target. Event fields other than `message` become the
//! record's key-values and travel to the collector under `extra`.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::level::Level;
use crate::log_record::{LogRecord, RecordMetadata};
use crate::manager;

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// `tracing_subscriber` layer forwarding events into the logger tree.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogshipLayer;

impl LogshipLayer {
    pub fn new() -> Self {
        Self
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn map_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE => Level::Trace,
        tracing::Level::DEBUG => Level::Debug,
        tracing::Level::INFO => Level::Info,
        tracing::Level::WARN => Level::Warn,
        tracing::Level::ERROR => Level::Error,
    }
}

impl<S> Layer<S> for LogshipLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let target = meta.target();
        if is_own_target(target) {
            return;
        }
        let name = target.replace("::", ".");
        let logger = manager::get_logger(&name).unwrap_or_else(|_| manager::root_logger());
        let level = map_level(meta.level());
        if !logger.is_enabled_for(level) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message = None;
        event.record(&mut FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        });

        let metadata = RecordMetadata {
            module_path: meta.module_path().unwrap_or_default().to_string(),
            filename: meta.file().unwrap_or_default().to_string(),
            line_number: meta.line().unwrap_or(0),
            key_values: fields,
            ..Default::default()
        };
        let record = LogRecord::with_metadata(
            logger.name(),
            level,
            message.as_deref().unwrap_or_default(),
            metadata,
        );
        logger.log_record(record);
    }
}

struct FieldVisitor<'a> {
    fields: &'a mut BTreeMap<String, Value>,
    message: &'a mut Option<String>,
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            *self.message = Some(rendered);
        } else {
            self.fields.insert(field.name().to_string(), Value::String(rendered));
        }
    }
}
