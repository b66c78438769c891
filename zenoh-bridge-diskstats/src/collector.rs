//! Timer loop driving the poller and publishing its samples.

use std::time::Duration;

use diskstats_common::current_timestamp_millis;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::poller::Poller;
use crate::publisher::Publisher;
use crate::sink::TelemetrySink;
use crate::source::StatsSource;

/// Polls on a fixed period and publishes every pass to Zenoh.
pub struct DiskstatsCollector<S, C> {
    poller: Poller<S, C>,
    sink: TelemetrySink,
    publisher: Publisher,
    interval: Duration,
}

impl<S: StatsSource, C: Clock> DiskstatsCollector<S, C> {
    pub fn new(
        poller: Poller<S, C>,
        sink: TelemetrySink,
        publisher: Publisher,
        interval: Duration,
    ) -> Self {
        Self {
            poller,
            sink,
            publisher,
            interval,
        }
    }

    /// Run the collection loop. Passes never overlap.
    pub async fn run(mut self) {
        info!(
            hostname = %self.sink.hostname(),
            interval_secs = self.interval.as_secs(),
            patterns = ?self.poller.registry().patterns().collect::<Vec<_>>(),
            "Starting diskstats collector"
        );

        loop {
            self.collect_and_publish().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One pass: poll, then publish whatever it produced.
    async fn collect_and_publish(&mut self) {
        self.sink.set_timestamp(current_timestamp_millis());

        if let Err(e) = self.poller.poll(&mut self.sink) {
            error!(error = %e, "Diskstats poll failed");
        }

        let batch = self.sink.drain();
        if !batch.is_empty() {
            let stats = self.publisher.publish_batch(batch).await;
            debug!(
                published = stats.success,
                failed = stats.failed,
                tracked = self.poller.registry().tracked_count(),
                "Published diskstats for '{}'",
                self.sink.hostname()
            );
        }
    }
}
