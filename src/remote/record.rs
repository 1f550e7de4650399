//! Zero-copy wire representation of a record.
//!
//! [`WireRecord`] borrows from the original [`LogRecord`] so string fields are
//! not copied before serialization. Structured attributes are nested under
//! `extra` so they can never shadow the fixed fields.

use std::collections::BTreeMap;
use std::thread::ThreadId;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;

use crate::log_record::LogRecord;

pub(crate) struct WireRecord<'a> {
    name: &'a str,
    levelname: &'static str,
    levelno: u8,
    msg: &'a str,
    timestamp: SystemTime,
    filename: &'a str,
    lineno: u32,
    module: &'a str,
    thread_id: ThreadId,
    thread_name: Option<&'a str>,
    extra: &'a BTreeMap<String, Value>,
}

impl WireRecord<'_> {
    fn count_fields(&self) -> usize {
        10 + usize::from(self.thread_name.is_some()) + usize::from(!self.extra.is_empty())
    }

    fn created(&self) -> f64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|dur| dur.as_secs_f64())
            .unwrap_or_default()
    }

    fn rfc3339(&self) -> String {
        DateTime::<Utc>::from(self.timestamp).to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl<'a> From<&'a LogRecord> for WireRecord<'a> {
    fn from(record: &'a LogRecord) -> Self {
        let metadata = record.metadata();
        Self {
            name: record.logger(),
            levelname: record.level().wire_name(),
            levelno: u8::from(record.level()),
            msg: record.message(),
            timestamp: metadata.timestamp,
            filename: &metadata.filename,
            lineno: metadata.line_number,
            module: &metadata.module_path,
            thread_id: metadata.thread_id,
            thread_name: metadata.thread_name.as_deref(),
            extra: &metadata.key_values,
        }
    }
}

impl Serialize for WireRecord<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.count_fields()))?;
        map.serialize_entry("name", self.name)?;
        map.serialize_entry("levelname", self.levelname)?;
        map.serialize_entry("levelno", &self.levelno)?;
        map.serialize_entry("msg", self.msg)?;
        map.serialize_entry("created", &self.created())?;
        map.serialize_entry("timestamp", &self.rfc3339())?;
        map.serialize_entry("filename", self.filename)?;
        map.serialize_entry("lineno", &self.lineno)?;
        map.serialize_entry("module", self.module)?;
        map.serialize_entry("thread", &format_args!("{:?}", self.thread_id))?;
        if let Some(name) = self.thread_name {
            map.serialize_entry("threadName", name)?;
        }
        if !self.extra.is_empty() {
            map.serialize_entry("extra", self.extra)?;
        }
        map.end()
    }
}

/// Convert records into the JSON values handed to a sink.
pub(crate) fn serialise_batch<'a, I>(records: I) -> Result<Vec<Value>, serde_json::Error>
where
    I: IntoIterator<Item = &'a LogRecord>,
{
    records
        .into_iter()
        .map(|record| serde_json::to_value(WireRecord::from(record)))
        .collect()
}
