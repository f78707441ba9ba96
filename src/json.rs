//! Navigation helpers over parsed JSON documents.
//!
//! Responses are handed to callers as [`serde_json::Value`]. The
//! [`JsonExt`] trait adds forgiving accessors on top: path navigation never
//! fails and degrades to [`NULL`], typed reads return `None` on a kind
//! mismatch.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// The sentinel returned when navigation runs off the document.
pub static NULL: Value = Value::Null;

static EMPTY: &[Value] = &[];

/// Timestamp layouts Jira writes besides strict RFC 3339.
///
/// Components may be unpadded (`2023-5-1T10:0:0.000+00:00`) and the
/// offset may come with or without a colon (`+0000`).
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Parses a Jira timestamp, keeping its offset.
pub(crate) fn parse_datetime(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok().or_else(|| {
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(value, format).ok())
    })
}

/// Forgiving accessors for JSON values.
pub trait JsonExt {
    /// Walks nested objects and arrays by property name or array index.
    ///
    /// Returns [`NULL`] as soon as a step cannot be taken: the current node
    /// is a scalar, the property is absent, or the index is not a valid
    /// position in the array.
    ///
    /// ```
    /// use jira_simple::json::JsonExt;
    ///
    /// let doc = serde_json::json!({"a": [{"b": 5}]});
    /// assert_eq!(doc.read(&["a", "0", "b"]), 5);
    /// assert!(doc.read(&["a", "9"]).is_null());
    /// ```
    fn read(&self, path: &[&str]) -> &Value;

    /// Iterates array elements; yields nothing for non-arrays.
    fn items(&self) -> std::slice::Iter<'_, Value>;

    /// Returns the boolean, or `None` for any other kind.
    fn bool_or_none(&self) -> Option<bool>;

    /// Returns the number as `i32` when it fits.
    fn i32_or_none(&self) -> Option<i32>;

    /// Returns the number as `i64` when it fits.
    fn i64_or_none(&self) -> Option<i64>;

    /// Returns the number as `u32` when it fits.
    fn u32_or_none(&self) -> Option<u32>;

    /// Returns the number as `u64` when it fits.
    fn u64_or_none(&self) -> Option<u64>;

    /// Returns the number as `f64`.
    fn f64_or_none(&self) -> Option<f64>;

    /// Parses an RFC 3339 or Jira-style (`+0000` offset) timestamp string.
    fn datetime_or_none(&self) -> Option<DateTime<FixedOffset>>;

    /// Renders strings, booleans and numbers as text; `None` otherwise.
    fn string_or_none(&self) -> Option<String>;
}

impl JsonExt for Value {
    fn read(&self, path: &[&str]) -> &Value {
        let mut current = self;

        for name in path {
            current = match current {
                Value::Object(map) => match map.get(*name) {
                    Some(child) => child,
                    None => return &NULL,
                },
                Value::Array(items) => {
                    match name.parse::<usize>().ok().and_then(|i| items.get(i)) {
                        Some(child) => child,
                        None => return &NULL,
                    }
                }
                _ => return &NULL,
            };
        }

        current
    }

    fn items(&self) -> std::slice::Iter<'_, Value> {
        match self {
            Value::Array(items) => items.iter(),
            _ => EMPTY.iter(),
        }
    }

    fn bool_or_none(&self) -> Option<bool> {
        self.as_bool()
    }

    fn i32_or_none(&self) -> Option<i32> {
        self.as_i64().and_then(|n| i32::try_from(n).ok())
    }

    fn i64_or_none(&self) -> Option<i64> {
        self.as_i64()
    }

    fn u32_or_none(&self) -> Option<u32> {
        self.as_u64().and_then(|n| u32::try_from(n).ok())
    }

    fn u64_or_none(&self) -> Option<u64> {
        self.as_u64()
    }

    fn f64_or_none(&self) -> Option<f64> {
        self.as_f64()
    }

    fn datetime_or_none(&self) -> Option<DateTime<FixedOffset>> {
        self.as_str().and_then(parse_datetime)
    }

    fn string_or_none(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
