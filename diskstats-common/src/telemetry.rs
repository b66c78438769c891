use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metric category attached to every point this bridge produces.
pub const CATEGORY: &str = "diskstats";

/// A single disk metric sample ready for transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPoint {
    /// Unix epoch milliseconds of the poll pass that produced this point.
    pub timestamp: i64,

    /// Host identifier (e.g., "db01").
    pub source: String,

    /// Metric category, always [`CATEGORY`] for this bridge.
    pub category: String,

    /// Metric path: `<device>/<metric_name>` (e.g., "sda/io_util").
    pub metric: String,

    /// The measured value.
    pub value: TelemetryValue,

    /// Additional context labels (device name, kernel field index, unit).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl TelemetryPoint {
    /// Create a new point in the diskstats category with the current timestamp.
    pub fn new(source: impl Into<String>, metric: impl Into<String>, value: TelemetryValue) -> Self {
        Self {
            timestamp: current_timestamp_millis(),
            source: source.into(),
            category: CATEGORY.to_string(),
            metric: metric.into(),
            value,
            labels: HashMap::new(),
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add a label to this point.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Typed telemetry value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TelemetryValue {
    /// Per-interval delta, instantaneous gauge or percentage.
    Gauge(f64),
}

impl From<f64> for TelemetryValue {
    fn from(v: f64) -> Self {
        TelemetryValue::Gauge(v)
    }
}

/// Current UTC time in milliseconds since the Unix epoch.
pub fn current_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
