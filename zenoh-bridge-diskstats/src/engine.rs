//! Counter-to-rate translation.
//!
//! Each tracked record is turned into per-interval deltas for ten of the
//! eleven kernel fields (field 6, writes merged, has no metric), plus an
//! `io_util` percentage derived from the busy-time delta of field 10.

use std::fmt;

use tracing::debug;

use crate::record::RawCounterRecord;
use crate::state::CounterState;

/// Counters wrap at the 32-bit boundary.
pub const COUNTER_WRAP: u64 = 1 << 32;

/// Clock tick rate used when the platform cannot report one.
pub const DEFAULT_HZ: u64 = 100;

/// Upper bound for `io_util`.
pub const MAX_UTILIZATION: f64 = 100.0;

/// Kernel diskstats fields that produce a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiskField {
    ReadsCompleted = 1,
    ReadsMerged = 2,
    SectorsRead = 3,
    ReadingMilliseconds = 4,
    WritesCompleted = 5,
    SectorsWritten = 7,
    WritingMilliseconds = 8,
    IoInProgress = 9,
    IoMilliseconds = 10,
    IoMillisecondsWeighted = 11,
}

impl DiskField {
    /// Fields in kernel order.
    pub const ALL: [DiskField; 10] = [
        DiskField::ReadsCompleted,
        DiskField::ReadsMerged,
        DiskField::SectorsRead,
        DiskField::ReadingMilliseconds,
        DiskField::WritesCompleted,
        DiskField::SectorsWritten,
        DiskField::WritingMilliseconds,
        DiskField::IoInProgress,
        DiskField::IoMilliseconds,
        DiskField::IoMillisecondsWeighted,
    ];

    /// 1-based kernel field index.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn metric_name(self) -> &'static str {
        match self {
            DiskField::ReadsCompleted => "reads_completed",
            DiskField::ReadsMerged => "reads_merged",
            DiskField::SectorsRead => "sectors_read",
            DiskField::ReadingMilliseconds => "reading_milliseconds",
            DiskField::WritesCompleted => "writes_completed",
            DiskField::SectorsWritten => "sectors_written",
            DiskField::WritingMilliseconds => "writing_milliseconds",
            DiskField::IoInProgress => "io_inprogress",
            DiskField::IoMilliseconds => "io_milliseconds",
            DiskField::IoMillisecondsWeighted => "io_milliseconds_weighted",
        }
    }

    /// The in-flight count is an instantaneous gauge, not a counter.
    pub fn is_gauge(self) -> bool {
        self == DiskField::IoInProgress
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            DiskField::SectorsRead | DiskField::SectorsWritten => Some("sectors"),
            DiskField::ReadingMilliseconds
            | DiskField::WritingMilliseconds
            | DiskField::IoMilliseconds
            | DiskField::IoMillisecondsWeighted => Some("ms"),
            _ => None,
        }
    }
}

/// Name of an emitted metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    Field(DiskField),
    IoUtil,
}

impl MetricName {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::Field(field) => field.metric_name(),
            MetricName::IoUtil => "io_util",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (device, metric, value) sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub device: String,
    pub metric: MetricName,
    pub value: f64,
}

impl MetricSample {
    pub fn new(device: impl Into<String>, metric: MetricName, value: f64) -> Self {
        Self {
            device: device.into(),
            metric,
            value,
        }
    }
}

/// Change of `field` between two observations.
///
/// A new value below the previous one means the counter wrapped through
/// [`COUNTER_WRAP`]. If even that cannot explain the drop (a wider counter
/// was reset), the new value itself is the delta.
pub fn counter_delta(field: DiskField, previous: u64, current: u64) -> u64 {
    if field.is_gauge() {
        return current;
    }

    if previous > current {
        COUNTER_WRAP
            .checked_add(current)
            .and_then(|v| v.checked_sub(previous))
            .unwrap_or(current)
    } else {
        current - previous
    }
}

/// Busy percentage for a field-10 delta over `interval_secs`.
///
/// Returns `None` when the interval is not strictly positive.
pub fn utilization(busy_delta: u64, hz: u64, interval_secs: f64) -> Option<f64> {
    if interval_secs.is_nan() || interval_secs <= 0.0 {
        return None;
    }

    let util = busy_delta as f64 * hz as f64 / interval_secs / 1000.0;
    Some(util.min(MAX_UTILIZATION))
}

/// Clock tick rate of the running platform.
#[cfg(target_os = "linux")]
pub fn platform_hz() -> u64 {
    match procfs::ticks_per_second() {
        0 => DEFAULT_HZ,
        hz => hz,
    }
}

/// Clock tick rate of the running platform.
#[cfg(not(target_os = "linux"))]
pub fn platform_hz() -> u64 {
    DEFAULT_HZ
}

/// Turns records into samples, updating [`CounterState`] as it goes.
#[derive(Debug, Clone, Copy)]
pub struct RateEngine {
    hz: u64,
}

impl RateEngine {
    pub fn new(hz: u64) -> Self {
        Self { hz }
    }

    pub fn hz(&self) -> u64 {
        self.hz
    }

    /// Process one record.
    ///
    /// Fields seen for the first time only prime the state. Every other field
    /// yields its delta, and field 10 additionally yields `io_util` when the
    /// interval allows it.
    pub fn process(
        &self,
        record: &RawCounterRecord,
        state: &mut CounterState,
        interval_secs: f64,
    ) -> Vec<MetricSample> {
        let device = record.device.as_str();
        let mut samples = Vec::with_capacity(DiskField::ALL.len() + 1);

        for field in DiskField::ALL {
            let Some(current) = record.field(field.index()) else {
                continue;
            };

            let Some(previous) = state.set(device, field, current) else {
                continue;
            };

            let delta = counter_delta(field, previous, current);
            samples.push(MetricSample::new(device, MetricName::Field(field), delta as f64));

            if field == DiskField::IoMilliseconds {
                match utilization(delta, self.hz, interval_secs) {
                    Some(util) => samples.push(MetricSample::new(device, MetricName::IoUtil, util)),
                    None => debug!(
                        device,
                        interval_secs, "Skipping io_util for non-positive interval"
                    ),
                }
            }
        }

        samples
    }
}

impl Default for RateEngine {
    fn default() -> Self {
        Self::new(platform_hz())
    }
}
