use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::level::Level;

/// Top-level keys owned by the schema. Caller-supplied extras must not
/// displace any of these.
pub const RESERVED_FIELDS: [&str; 10] = [
    "timestamp",
    "level",
    "service",
    "env",
    "correlation_id",
    "event",
    "message",
    "logger",
    "module",
    "exception",
];

/// One structured log line, fully assembled and ready to serialize.
///
/// `correlation_id` and `event` serialize as `null` when absent;
/// `exception` is omitted entirely unless an error is being reported.
/// Extras in `fields` are flattened to the top level of the object.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub service: String,
    pub env: String,
    pub correlation_id: Option<String>,
    pub event: Option<String>,
    pub message: String,
    pub logger: String,
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogRecord {
    /// Serialize as one compact JSON object. `serde_json` never emits raw
    /// newlines, so the result is always a single line.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Insert a caller-supplied extra field. A key colliding with a
    /// reserved field name is dropped.
    pub fn insert_field(&mut self, key: &str, value: serde_json::Value) {
        if is_reserved(key) {
            return;
        }
        self.fields.insert(key.to_string(), value);
    }
}

/// Whether `key` belongs to the fixed schema and must not be overwritten
/// by an extra.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// Convert an extra value to JSON, degrading to its `Debug` rendering
/// when conversion fails (non-finite floats, non-string map keys, ...).
/// A log call never fails because of an awkward extra.
pub fn coerce_value<V: Serialize + fmt::Debug>(value: &V) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|_| serde_json::Value::String(format!("{value:?}")))
}

/// ISO-8601 / RFC 3339 UTC with millisecond precision and `Z` suffix.
fn serialize_timestamp<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}
