//! Field sets and points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Numeric field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Unsigned counter or gauge (bytes, counts).
    Unsigned(u64),

    /// Signed value.
    Integer(i64),

    /// Floating point value (percentages).
    Float(f64),
}

impl FieldValue {
    /// Value as `f64`, for comparisons and display.
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::Unsigned(v) => v as f64,
            FieldValue::Integer(v) => v as f64,
            FieldValue::Float(v) => v,
        }
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Unsigned(v)
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::Unsigned(v as u64)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(v as f64)
    }
}

/// Tags and numeric fields produced by one sampling tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    tags: BTreeMap<String, String>,
    values: BTreeMap<String, FieldValue>,
}

impl FieldSet {
    /// Create an empty field set carrying `tags`.
    pub fn new(tags: BTreeMap<String, String>) -> Self {
        Self {
            tags,
            values: BTreeMap::new(),
        }
    }

    /// Add a field.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Split into `(tags, values)`.
    pub fn into_parts(self) -> (BTreeMap<String, String>, BTreeMap<String, FieldValue>) {
        (self.tags, self.values)
    }
}

/// One timestamped, tagged, multi-field measurement handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Measurement name (e.g., "rust.runtime.server01").
    pub measurement: String,

    /// Categorical labels (host, pid, process, os, arch).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    /// Numeric values keyed by metric name.
    pub fields: BTreeMap<String, FieldValue>,

    /// Capture time.
    pub timestamp: DateTime<Utc>,
}

impl Point {
    /// Wrap a field set captured at `timestamp`.
    pub fn new(measurement: impl Into<String>, fields: FieldSet, timestamp: DateTime<Utc>) -> Self {
        let (tags, fields) = fields.into_parts();
        Self {
            measurement: measurement.into(),
            tags,
            fields,
            timestamp,
        }
    }

    /// Capture time as nanoseconds since the Unix epoch.
    ///
    /// Saturates outside the representable range (years 1677 to 2262).
    pub fn timestamp_nanos(&self) -> i64 {
        self.timestamp
            .timestamp_nanos_opt()
            .unwrap_or(if self.timestamp.timestamp() < 0 {
                i64::MIN
            } else {
                i64::MAX
            })
    }
}
