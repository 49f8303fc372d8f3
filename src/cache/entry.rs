//! Cache entries and lookup parameters.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DocgenError, Result};

/// Lookup / insertion parameters: field name to value.
pub type CacheParams = Map<String, Value>;

/// Convert any serializable parameter set into [`CacheParams`].
///
/// Fails with [`DocgenError::Serialization`] if the value cannot be encoded
/// or does not encode to a JSON object.
pub fn params_from<T: Serialize + ?Sized>(params: &T) -> Result<CacheParams> {
    match serde_json::to_value(params) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DocgenError::Serialization(format!(
            "parameters must encode to a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(DocgenError::Serialization(e.to_string())),
    }
}

/// One stored prompt/parameter/response record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheEntry(Map<String, Value>);

impl CacheEntry {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn response(&self) -> Option<&Value> {
        self.0.get("response")
    }

    pub fn cache_type(&self) -> Option<&str> {
        self.0.get("cache_type").and_then(Value::as_str)
    }

    /// Creation time, if the `timestamp` field is present and parseable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.0
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    }

    /// True when every search key holds the same value here as in `params`.
    ///
    /// A key absent from `params` only matches a stored `null` or a missing
    /// field, mirroring what [`ResponseCache::add_entry`] stores for it.
    ///
    /// [`ResponseCache::add_entry`]: super::ResponseCache::add_entry
    pub fn matches(&self, search_keys: &[String], params: &CacheParams) -> bool {
        search_keys.iter().all(|key| {
            let stored = self.0.get(key).unwrap_or(&Value::Null);
            let wanted = params.get(key).unwrap_or(&Value::Null);
            values_match(stored, wanted)
        })
    }
}

/// Equality with numbers compared by value, so `1` matches `1.0`.
///
/// Two integers compare exactly; `f64` is only used when a float is involved.
fn values_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_f64() || y.is_f64() {
                match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            } else if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                false
            }
        }
        _ => a == b,
    }
}

/// Parse an entry timestamp.
///
/// Accepts RFC 3339 and offset-less ISO-8601 (`2025-06-01T09:30:00.123456`);
/// the latter is read as local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = raw.parse::<NaiveDateTime>().ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
