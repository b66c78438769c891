//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Zenoh bridge publishing per-disk I/O rates from /proc/diskstats.
#[derive(Parser, Debug, Clone)]
#[command(name = "zenoh-bridge-diskstats", version)]
pub struct BridgeArgs {
    /// Path to configuration file.
    #[arg(short, long, default_value = "diskstats.json5")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}
