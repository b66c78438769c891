//! Destinations for metric samples.

use diskstats_common::{KeyExprBuilder, TelemetryPoint, current_timestamp_millis};

use crate::engine::{MetricName, MetricSample};

/// Accepts samples one at a time.
pub trait MetricSink {
    fn dispatch(&mut self, sample: MetricSample);
}

impl MetricSink for Vec<MetricSample> {
    fn dispatch(&mut self, sample: MetricSample) {
        self.push(sample);
    }
}

impl<S: MetricSink + ?Sized> MetricSink for &mut S {
    fn dispatch(&mut self, sample: MetricSample) {
        (**self).dispatch(sample);
    }
}

/// Converts samples into keyed telemetry points and buffers them until the
/// caller drains the batch for publishing.
#[derive(Debug)]
pub struct TelemetrySink {
    hostname: String,
    keys: KeyExprBuilder,
    timestamp: i64,
    pending: Vec<(String, TelemetryPoint)>,
}

impl TelemetrySink {
    pub fn new(hostname: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            keys: KeyExprBuilder::new(key_prefix),
            timestamp: current_timestamp_millis(),
            pending: Vec::new(),
        }
    }

    /// Stamp subsequent points with `timestamp` (Unix epoch milliseconds).
    pub fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Build the key and point for a sample.
    pub fn to_point(&self, sample: &MetricSample) -> (String, TelemetryPoint) {
        let name = sample.metric.as_str();
        let key = self.keys.build(&self.hostname, &sample.device, name);

        let mut point = TelemetryPoint::new(
            self.hostname.clone(),
            format!("{}/{}", sample.device, name),
            sample.value.into(),
        )
        .at(self.timestamp)
        .with_label("device", sample.device.clone());

        match sample.metric {
            MetricName::Field(field) => {
                point = point.with_label("field", field.index().to_string());
                if let Some(unit) = field.unit() {
                    point = point.with_label("unit", unit);
                }
            }
            MetricName::IoUtil => {
                point = point.with_label("unit", "percent");
            }
        }

        (key, point)
    }

    /// Take all buffered points.
    pub fn drain(&mut self) -> Vec<(String, TelemetryPoint)> {
        std::mem::take(&mut self.pending)
    }
}

impl MetricSink for TelemetrySink {
    fn dispatch(&mut self, sample: MetricSample) {
        let entry = self.to_point(&sample);
        self.pending.push(entry);
    }
}
