//! Zenoh bridge for per-disk I/O statistics.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use diskstats_common::{KeyExprBuilder, connect, init_tracing};
use tokio::signal;

use zenoh_bridge_diskstats::args::BridgeArgs;
use zenoh_bridge_diskstats::collector::DiskstatsCollector;
use zenoh_bridge_diskstats::config::DiskstatsBridgeConfig;
use zenoh_bridge_diskstats::publisher::Publisher;
use zenoh_bridge_diskstats::status::StatusPublisher;
use zenoh_bridge_diskstats::{FileSource, Poller, TelemetrySink};

const BRIDGE_NAME: &str = "diskstats";

#[tokio::main]
async fn main() -> Result<()> {
    let args = BridgeArgs::parse();
    let config = DiskstatsBridgeConfig::load_from_file(&args.config)?;

    let mut logging = config.logging.clone();
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }
    init_tracing(&logging)?;

    let version = env!("CARGO_PKG_VERSION");
    tracing::info!(bridge = BRIDGE_NAME, version, "Starting bridge");

    let diskstats = &config.diskstats;
    let hostname = config.get_hostname();
    let registry = config.build_registry()?;
    if registry.is_empty() {
        tracing::warn!("No disk_filter patterns configured; no disk will be tracked");
    }

    let session = Arc::new(connect(&config.zenoh).await?);
    let publisher = Publisher::new(session.clone(), config.serialization);
    let status = StatusPublisher::new(
        publisher.clone(),
        KeyExprBuilder::new(&diskstats.key_prefix).status_key(),
        BRIDGE_NAME,
        version,
    );

    let settings = config.poll_settings();
    let metadata = serde_json::json!({
        "hostname": hostname,
        "source_path": diskstats.source_path.display().to_string(),
        "disk_filter": diskstats.disk_filter,
        "poll_interval_secs": diskstats.poll_interval_secs,
        "clock_cadence": settings.cadence,
        "line_format": settings.line_format,
        "clock_ticks": settings.hz,
    });

    let poller = Poller::new(FileSource::new(&diskstats.source_path), registry, settings);
    let sink = TelemetrySink::new(hostname, &diskstats.key_prefix);
    let collector = DiskstatsCollector::new(
        poller,
        sink,
        publisher,
        Duration::from_secs(diskstats.poll_interval_secs),
    );
    let task = tokio::spawn(collector.run());

    if let Err(e) = status.publish_running(metadata).await {
        tracing::warn!(error = %e, "Failed to publish running status");
    }

    tracing::info!(bridge = BRIDGE_NAME, "Bridge running. Press Ctrl+C to stop.");

    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }

    tracing::info!(bridge = BRIDGE_NAME, "Received shutdown signal");
    task.abort();

    if let Err(e) = status.publish_offline().await {
        tracing::warn!(error = %e, "Failed to publish offline status");
    }

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Error closing Zenoh session");
    }

    tracing::info!(bridge = BRIDGE_NAME, "Goodbye!");

    Ok(())
}
