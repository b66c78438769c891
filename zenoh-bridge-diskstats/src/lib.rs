//! Zenoh bridge for per-disk I/O statistics.
//!
//! Reads the kernel disk statistics table on a timer, turns the wrapping raw
//! counters of every device matching a configured regex into per-interval
//! deltas plus an `io_util` busy percentage, and publishes them to Zenoh.
//!
//! # Key Expressions
//!
//! ```text
//! zensight/diskstats/<hostname>/<device>/reads_completed
//! zensight/diskstats/<hostname>/<device>/sectors_written
//! zensight/diskstats/<hostname>/<device>/io_inprogress
//! zensight/diskstats/<hostname>/<device>/io_util
//! zensight/diskstats/@/status
//! ```

pub mod args;
pub mod clock;
pub mod collector;
pub mod config;
pub mod engine;
pub mod filter;
pub mod poller;
pub mod publisher;
pub mod record;
pub mod sink;
pub mod source;
pub mod state;
pub mod status;

pub use clock::{Clock, ClockCadence, ManualClock, SystemClock};
pub use engine::{DiskField, MetricName, MetricSample, RateEngine};
pub use filter::DeviceRegistry;
pub use poller::{PollError, PollReport, PollSettings, Poller};
pub use record::{LineFormat, RawCounterRecord, RecordTokens};
pub use sink::{MetricSink, TelemetrySink};
pub use source::{FileSource, MemorySource, StatsSource};
pub use state::CounterState;
