//! End-to-end tests of the poll driver against an in-memory diskstats table.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use diskstats_common::TelemetryValue;
use zenoh_bridge_diskstats::config::DiskstatsBridgeConfig;
use zenoh_bridge_diskstats::{
    ClockCadence, DeviceRegistry, DiskField, LineFormat, ManualClock, MemorySource, MetricName,
    MetricSample, PollSettings, Poller, TelemetrySink,
};

fn settings() -> PollSettings {
    PollSettings {
        hz: 100,
        cadence: ClockCadence::PerPoll,
        line_format: LineFormat::Strict,
    }
}

struct Harness {
    source: MemorySource,
    clock: ManualClock,
    poller: Poller<MemorySource, ManualClock>,
}

impl Harness {
    fn new(patterns: &[&str], contents: &str) -> Self {
        Self::with_settings(patterns, contents, settings())
    }

    fn with_settings(patterns: &[&str], contents: &str, settings: PollSettings) -> Self {
        let source = MemorySource::new(contents);
        let clock = ManualClock::new();
        let registry = DeviceRegistry::from_patterns(patterns.iter().copied()).unwrap();
        let poller = Poller::with_clock(source.clone(), registry, settings, clock.clone());
        Self {
            source,
            clock,
            poller,
        }
    }

    /// Advance time, swap the table and run one pass.
    fn poll_after(&mut self, secs: u64, contents: &str) -> Vec<MetricSample> {
        self.clock.advance(Duration::from_secs(secs));
        self.source.set(contents);
        let mut samples = Vec::new();
        self.poller.poll(&mut samples).expect("poll should succeed");
        samples
    }
}

/// Build a 14-token line from eleven counter values.
fn line(device: &str, fields: [u64; 11]) -> String {
    let counters: Vec<String> = fields.iter().map(u64::to_string).collect();
    format!("   8       0 {} {}\n", device, counters.join(" "))
}

/// Formatted log output collected from a scoped subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn lines_containing(&self, needle: &str) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|l| l.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

/// Run `f` with warnings and above captured.
fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    let out = tracing::subscriber::with_default(subscriber, f);
    (out, logs)
}

fn value(samples: &[MetricSample], device: &str, metric: MetricName) -> Option<f64> {
    samples
        .iter()
        .find(|s| s.device == device && s.metric == metric)
        .map(|s| s.value)
}

fn field(samples: &[MetricSample], device: &str, field: DiskField) -> Option<f64> {
    value(samples, device, MetricName::Field(field))
}

#[test]
fn test_end_to_end_scenario() {
    let first = line("sda", [100, 0, 200, 10, 50, 0, 300, 20, 0, 5, 500]);
    let second = line("sda", [100, 0, 200, 10, 50, 0, 300, 20, 0, 55, 500]);

    let mut harness = Harness::new(&["^sda$"], &first);

    let samples = harness.poll_after(0, &first);
    assert!(samples.is_empty());
    assert_eq!(harness.poller.state().primed_fields("sda"), 10);
    for f in DiskField::ALL {
        assert!(harness.poller.state().get("sda", f).is_some());
    }

    let samples = harness.poll_after(1, &second);
    assert_eq!(field(&samples, "sda", DiskField::IoMilliseconds), Some(50.0));
    assert_eq!(value(&samples, "sda", MetricName::IoUtil), Some(5.0));
}

#[test]
fn test_first_observation_never_emits() {
    let contents = format!(
        "{}{}",
        line("sda", [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
        line("sdb", [9; 11])
    );
    let mut harness = Harness::new(&["sd"], &contents);

    let samples = harness.poll_after(5, &contents);

    assert!(samples.is_empty());
    assert_eq!(harness.poller.state().primed_fields("sda"), 10);
    assert_eq!(harness.poller.state().primed_fields("sdb"), 10);
}

#[test]
fn test_deltas_equal_increase() {
    let mut harness = Harness::new(&["sda"], "");
    harness.poll_after(0, &line("sda", [100, 7, 800, 40, 60, 3, 900, 70, 2, 1000, 5000]));

    let samples = harness.poll_after(
        10,
        &line("sda", [150, 7, 1800, 41, 61, 99, 950, 75, 1, 1200, 5600]),
    );

    assert_eq!(field(&samples, "sda", DiskField::ReadsCompleted), Some(50.0));
    assert_eq!(field(&samples, "sda", DiskField::ReadsMerged), Some(0.0));
    assert_eq!(field(&samples, "sda", DiskField::SectorsRead), Some(1000.0));
    assert_eq!(field(&samples, "sda", DiskField::ReadingMilliseconds), Some(1.0));
    assert_eq!(field(&samples, "sda", DiskField::WritesCompleted), Some(1.0));
    assert_eq!(field(&samples, "sda", DiskField::SectorsWritten), Some(50.0));
    assert_eq!(field(&samples, "sda", DiskField::WritingMilliseconds), Some(5.0));
    assert_eq!(field(&samples, "sda", DiskField::IoMilliseconds), Some(200.0));
    assert_eq!(
        field(&samples, "sda", DiskField::IoMillisecondsWeighted),
        Some(600.0)
    );
    // 200 * 100 / 10 / 1000
    assert_eq!(value(&samples, "sda", MetricName::IoUtil), Some(2.0));

    // Field 6 never produces a metric.
    assert_eq!(samples.len(), 11);
}

#[test]
fn test_wraparound_delta() {
    let mut harness = Harness::new(&["sda"], "");
    harness.poll_after(
        0,
        &line("sda", [4_294_967_290, 0, 4_294_967_295, 0, 0, 0, 0, 0, 0, 0, 0]),
    );

    let samples = harness.poll_after(1, &line("sda", [5, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]));

    assert_eq!(field(&samples, "sda", DiskField::ReadsCompleted), Some(11.0));
    assert_eq!(field(&samples, "sda", DiskField::SectorsRead), Some(1.0));
    assert!(samples.iter().all(|s| s.value >= 0.0));
}

#[test]
fn test_in_flight_is_a_gauge() {
    let mut harness = Harness::new(&["sda"], "");
    harness.poll_after(0, &line("sda", [0, 0, 0, 0, 0, 0, 0, 0, 12, 0, 0]));

    let samples = harness.poll_after(1, &line("sda", [0, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0]));
    assert_eq!(field(&samples, "sda", DiskField::IoInProgress), Some(3.0));

    let samples = harness.poll_after(1, &line("sda", [0, 0, 0, 0, 0, 0, 0, 0, 8, 0, 0]));
    assert_eq!(field(&samples, "sda", DiskField::IoInProgress), Some(8.0));
}

#[test]
fn test_utilization_clamped_to_100() {
    let mut harness = Harness::new(&["sda"], "");
    harness.poll_after(0, &line("sda", [0; 11]));

    let samples = harness.poll_after(1, &line("sda", [0, 0, 0, 0, 0, 0, 0, 0, 0, 100_000, 0]));

    assert_eq!(value(&samples, "sda", MetricName::IoUtil), Some(100.0));
}

#[test]
fn test_zero_interval_skips_utilization() {
    let mut harness = Harness::new(&["sda"], "");
    harness.poll_after(0, &line("sda", [0; 11]));

    let samples = harness.poll_after(0, &line("sda", [0, 0, 0, 0, 0, 0, 0, 0, 0, 50, 0]));

    assert_eq!(field(&samples, "sda", DiskField::IoMilliseconds), Some(50.0));
    assert_eq!(value(&samples, "sda", MetricName::IoUtil), None);
}

#[test]
fn test_only_matching_devices_tracked() {
    let contents = format!(
        "{}{}{}",
        line("sda", [1; 11]),
        line("loop0", [1; 11]),
        line("nvme0n1", [1; 11])
    );
    let mut harness = Harness::new(&["^sd", "^nvme"], &contents);

    harness.poll_after(0, &contents);

    assert_eq!(harness.poller.registry().tracked(), ["nvme0n1", "sda"]);
    assert!(!harness.poller.state().contains_device("loop0"));
}

#[test]
fn test_missing_device_stays_tracked() {
    let both = format!("{}{}", line("sda", [1; 11]), line("sdb", [1; 11]));
    let mut harness = Harness::new(&["sd"], &both);

    harness.poll_after(0, &both);

    // sdb disappears: no samples for it, but it stays tracked with stale state.
    let samples = harness.poll_after(1, &line("sda", [2; 11]));
    assert!(samples.iter().all(|s| s.device == "sda"));
    assert!(harness.poller.registry().is_tracked("sdb"));
    assert_eq!(
        harness.poller.state().get("sdb", DiskField::ReadsCompleted),
        Some(1)
    );

    // sdb comes back: deltas continue from the retained values.
    let samples = harness.poll_after(1, &format!("{}{}", line("sda", [2; 11]), line("sdb", [4; 11])));
    assert_eq!(field(&samples, "sdb", DiskField::ReadsCompleted), Some(3.0));
}

#[test]
fn test_hotplugged_device_primes_then_emits() {
    let mut harness = Harness::new(&["sd"], "");
    harness.poll_after(0, &line("sda", [1; 11]));

    let with_sdc = format!("{}{}", line("sda", [2; 11]), line("sdc", [7; 11]));
    let samples = harness.poll_after(1, &with_sdc);
    assert!(samples.iter().any(|s| s.device == "sda"));
    assert!(samples.iter().all(|s| s.device != "sdc"));

    let samples = harness.poll_after(1, &format!("{}{}", line("sda", [3; 11]), line("sdc", [9; 11])));
    assert_eq!(field(&samples, "sdc", DiskField::SectorsRead), Some(2.0));
}

#[test]
fn test_malformed_lines_warned_once_each() {
    let thirteen = "8 1 sda1 1 2 3 4 5 6 7 8 9 10\n";
    let fifteen = "8 2 sda2 1 2 3 4 5 6 7 8 9 10 11 12\n";
    let contents = format!("{}{}{}", line("sda", [1; 11]), thirteen, fifteen);

    let mut harness = Harness::new(&["sda"], &contents);
    let mut samples = Vec::new();

    let (report, logs) = capture_warnings(|| harness.poller.poll(&mut samples).unwrap());

    assert_eq!(report.malformed, 2);
    assert_eq!(harness.poller.registry().tracked(), ["sda"]);

    // Discovery is silent; emission warns once per line, carrying the line.
    let warnings = logs.lines_containing("Format of diskstats not recognized");
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings.iter().filter(|w| w.contains("sda1 1 2 3")).count(), 1);
    assert_eq!(warnings.iter().filter(|w| w.contains("sda2 1 2 3")).count(), 1);

    harness.source.set(format!("{}{}{}", line("sda", [2; 11]), thirteen, fifteen));
    let report = harness.poller.poll(&mut samples).unwrap();
    assert_eq!(report.malformed, 2);
    assert!(samples.iter().all(|s| s.device == "sda"));
}

#[test]
fn test_untracked_lines_never_warn() {
    let contents = format!(
        "{}{}",
        line("sda", [1; 11]),
        "7 0 loop0 0 0 x 0 0 0 0 0 0 0 0\n"
    );
    let mut harness = Harness::new(&["^sda$"], &contents);
    let mut samples = Vec::new();

    let (report, logs) = capture_warnings(|| harness.poller.poll(&mut samples).unwrap());

    assert_eq!(report.malformed, 0);
    assert!(logs.lines_containing("loop0").is_empty());
}

#[test]
fn test_empty_tracked_set_skips_emission() {
    let contents = line("sda", [1; 11]);
    let mut harness = Harness::new(&["^nvme"], &contents);

    let mut samples = Vec::new();
    let report = harness.poller.poll(&mut samples).unwrap();

    assert_eq!(report.source_reads, 1);
    assert_eq!(report.samples, 0);
    assert_eq!(harness.source.read_count(), 1);
    assert!(samples.is_empty());
}

#[test]
fn test_per_record_cadence_restarts_interval() {
    let per_record = PollSettings {
        cadence: ClockCadence::PerRecord,
        ..settings()
    };
    let idle = format!("{}{}", line("sda", [0; 11]), line("sdb", [0; 11]));
    let mut harness = Harness::with_settings(&["sd"], &idle, per_record);
    harness.poll_after(0, &idle);

    let mut busy = [0; 11];
    busy[9] = 200;
    let samples = harness.poll_after(2, &format!("{}{}", line("sda", busy), line("sdb", busy)));

    // 200 * 100 / 2 / 1000
    assert_eq!(value(&samples, "sda", MetricName::IoUtil), Some(10.0));
    assert_eq!(value(&samples, "sdb", MetricName::IoUtil), None);
}

#[test]
fn test_extended_lines() {
    let extended = PollSettings {
        line_format: LineFormat::Extended,
        ..settings()
    };
    let first = "259 0 nvme0n1 366 0 23480 41 3 0 0 0 0 41 41 0 0 0 0\n";
    let second = "259 0 nvme0n1 400 0 24000 45 3 0 0 0 0 61 45 0 0 0 0\n";

    let mut harness = Harness::with_settings(&["nvme"], first, extended);
    harness.poll_after(0, first);
    let samples = harness.poll_after(1, second);

    assert_eq!(field(&samples, "nvme0n1", DiskField::ReadsCompleted), Some(34.0));
    assert_eq!(field(&samples, "nvme0n1", DiskField::IoMilliseconds), Some(20.0));
}

#[test]
fn test_samples_to_telemetry() {
    let mut harness = Harness::new(&["sda"], "");
    harness.poll_after(0, &line("sda", [0; 11]));

    harness.clock.advance(Duration::from_secs(1));
    harness
        .source
        .set(line("sda", [0, 0, 0, 0, 0, 0, 0, 0, 0, 50, 0]));

    let mut sink = TelemetrySink::new("db01", "zensight/diskstats");
    let report = harness.poller.poll(&mut sink).unwrap();
    let batch = sink.drain();

    assert_eq!(batch.len(), report.samples);
    let (key, point) = batch
        .iter()
        .find(|(key, _)| key.ends_with("/io_util"))
        .expect("io_util published");
    assert_eq!(key, "zensight/diskstats/db01/sda/io_util");
    assert_eq!(point.value, TelemetryValue::Gauge(5.0));
}

#[test]
fn test_example_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/diskstats.json5");
    let config = DiskstatsBridgeConfig::load_from_file(path).expect("example config is valid");

    let registry = config.build_registry().unwrap();
    assert!(registry.matches("sda"));
    assert!(registry.matches("xvdb"));
    assert!(registry.matches("nvme1n1"));
    assert!(!registry.matches("sda1"));
    assert!(!registry.matches("loop0"));
}
