//! One polling pass over the diskstats table.
//!
//! A pass has two phases. Discovery reads the table and starts tracking the
//! device of any line with an accepted token count that matches a filter
//! pattern. Emission re-reads the table and feeds every tracked device's
//! record to the [`RateEngine`], dispatching the resulting samples. Counters
//! are only parsed for tracked devices. Emission is skipped entirely, without
//! a second read, while no device is tracked.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::{Clock, ClockCadence, IntervalClock, SystemClock};
use crate::engine::{RateEngine, platform_hz};
use crate::filter::DeviceRegistry;
use crate::record::{LineFormat, RecordTokens};
use crate::sink::MetricSink;
use crate::source::StatsSource;
use crate::state::CounterState;

/// Error type for polling.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Failed to read {location}: {source}")]
    SourceUnreadable {
        location: String,
        #[source]
        source: std::io::Error,
    },
}

/// Tunables of the poll driver.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Clock ticks per second used by the utilization formula.
    pub hz: u64,
    pub cadence: ClockCadence,
    pub line_format: LineFormat,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            hz: platform_hz(),
            cadence: ClockCadence::default(),
            line_format: LineFormat::default(),
        }
    }
}

/// What a single pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Devices that started being tracked during this pass.
    pub discovered: usize,
    /// Tracked records handed to the engine.
    pub records: usize,
    /// Samples dispatched to the sink.
    pub samples: usize,
    /// Malformed lines seen during emission.
    pub malformed: usize,
    /// Times the source was read.
    pub source_reads: usize,
}

/// Drives discovery and emission against one stats source.
pub struct Poller<S, C = SystemClock> {
    source: S,
    registry: DeviceRegistry,
    state: CounterState,
    engine: RateEngine,
    settings: PollSettings,
    clock: IntervalClock<C>,
}

impl<S: StatsSource> Poller<S, SystemClock> {
    /// Create a poller on the system clock. The interval clock starts now.
    pub fn new(source: S, registry: DeviceRegistry, settings: PollSettings) -> Self {
        Self::with_clock(source, registry, settings, SystemClock)
    }
}

impl<S: StatsSource, C: Clock> Poller<S, C> {
    /// Create a poller on a custom clock. The interval clock starts now.
    pub fn with_clock(source: S, registry: DeviceRegistry, settings: PollSettings, clock: C) -> Self {
        Self {
            source,
            registry,
            state: CounterState::new(),
            engine: RateEngine::new(settings.hz),
            settings,
            clock: IntervalClock::new(clock),
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn state(&self) -> &CounterState {
        &self.state
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Run one pass, dispatching every produced sample to `sink`.
    ///
    /// Fails only when the source cannot be read; state mutated before the
    /// failure is kept.
    pub fn poll(&mut self, sink: &mut impl MetricSink) -> Result<PollReport, PollError> {
        let mut report = PollReport::default();

        self.discover(&mut report)?;

        if self.registry.tracked_count() == 0 {
            return Ok(report);
        }

        self.emit(sink, &mut report)?;

        debug!(
            records = report.records,
            samples = report.samples,
            malformed = report.malformed,
            "Diskstats pass complete"
        );

        Ok(report)
    }

    fn read_source(&self, report: &mut PollReport) -> Result<String, PollError> {
        report.source_reads += 1;
        self.source.read().map_err(|e| PollError::SourceUnreadable {
            location: self.source.location(),
            source: e,
        })
    }

    fn discover(&mut self, report: &mut PollReport) -> Result<(), PollError> {
        let contents = self.read_source(report)?;

        for line in contents.lines() {
            let Ok(tokens) = RecordTokens::split(line, self.settings.line_format) else {
                continue;
            };

            if self.registry.observe(tokens.device) {
                self.state.ensure_device(tokens.device);
                info!(device = %tokens.device, "Tracking disk");
                report.discovered += 1;
            }
        }

        Ok(())
    }

    fn emit(&mut self, sink: &mut impl MetricSink, report: &mut PollReport) -> Result<(), PollError> {
        let contents = self.read_source(report)?;

        let pass_interval = match self.settings.cadence {
            ClockCadence::PerPoll => Some(self.clock.lap()),
            ClockCadence::PerRecord => None,
        };

        for line in contents.lines() {
            let record = match RecordTokens::split(line, self.settings.line_format) {
                Ok(tokens) if !self.registry.is_tracked(tokens.device) => continue,
                Ok(tokens) => tokens.parse(),
                Err(e) => Err(e),
            };

            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(line = %line, error = %e, "Format of diskstats not recognized");
                    report.malformed += 1;
                    continue;
                }
            };

            let interval = pass_interval.unwrap_or_else(|| self.clock.elapsed_secs());
            let samples = self.engine.process(&record, &mut self.state, interval);

            if pass_interval.is_none() && !samples.is_empty() {
                self.clock.advance();
            }

            report.records += 1;
            report.samples += samples.len();
            for sample in samples {
                sink.dispatch(sample);
            }
        }

        Ok(())
    }
}
