//! Configuration for the diskstats bridge.

use diskstats_common::{Format, LoggingConfig, ZenohConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::clock::ClockCadence;
use crate::engine::platform_hz;
use crate::filter::{DeviceRegistry, FilterCompileError};
use crate::poller::PollSettings;
use crate::record::LineFormat;
use crate::source::PROC_DISKSTATS;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Filter(#[from] FilterCompileError),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskstatsBridgeConfig {
    /// Zenoh connection settings.
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Disk statistics collection settings.
    pub diskstats: DiskstatsConfig,

    /// Payload encoding.
    #[serde(default)]
    pub serialization: Format,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Disk statistics collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskstatsConfig {
    /// Key expression prefix (default: "zensight/diskstats").
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Hostname used in key expressions; "auto" detects it.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Poll interval in seconds (default: 10).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Stats table to read (default: /proc/diskstats).
    #[serde(default = "default_source_path")]
    pub source_path: PathBuf,

    /// Device name patterns, regexes anchored at the start of the name.
    #[serde(default, alias = "DiskFilter")]
    pub disk_filter: Vec<String>,

    /// When the utilization interval is measured.
    #[serde(default)]
    pub clock_cadence: ClockCadence,

    /// Accepted line layouts.
    #[serde(default)]
    pub line_format: LineFormat,

    /// Override of the platform clock tick rate.
    #[serde(default)]
    pub clock_ticks: Option<u64>,
}

fn default_key_prefix() -> String {
    diskstats_common::KEY_PREFIX.to_string()
}

fn default_hostname() -> String {
    "auto".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_source_path() -> PathBuf {
    PathBuf::from(PROC_DISKSTATS)
}

impl Default for DiskstatsConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            hostname: default_hostname(),
            poll_interval_secs: default_poll_interval(),
            source_path: default_source_path(),
            disk_filter: Vec::new(),
            clock_cadence: ClockCadence::default(),
            line_format: LineFormat::default(),
            clock_ticks: None,
        }
    }
}

impl DiskstatsBridgeConfig {
    /// Load and validate a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json5(&content)
    }

    /// Parse and validate JSON5 text.
    pub fn from_json5(content: &str) -> Result<Self, ConfigError> {
        let config: DiskstatsBridgeConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let diskstats = &self.diskstats;

        if diskstats.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }

        if diskstats.clock_ticks == Some(0) {
            return Err(ConfigError::Validation(
                "clock_ticks must be > 0".to_string(),
            ));
        }

        if diskstats.key_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "key_prefix must not be empty".to_string(),
            ));
        }

        self.build_registry()?;

        Ok(())
    }

    /// Hostname to publish under, resolving "auto".
    pub fn get_hostname(&self) -> String {
        if self.diskstats.hostname == "auto" {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string())
        } else {
            self.diskstats.hostname.clone()
        }
    }

    /// Compile the configured patterns into a registry.
    pub fn build_registry(&self) -> Result<DeviceRegistry, FilterCompileError> {
        DeviceRegistry::from_patterns(&self.diskstats.disk_filter)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            hz: self.diskstats.clock_ticks.unwrap_or_else(platform_hz),
            cadence: self.diskstats.clock_cadence,
            line_format: self.diskstats.line_format,
        }
    }
}
