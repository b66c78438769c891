//! Shared building blocks for the diskstats bridge.
//!
//! - [`telemetry`] - telemetry point model (`TelemetryPoint`, `TelemetryValue`)
//! - [`serialization`] - JSON/CBOR payload encoding
//! - [`keyexpr`] - key expression builder
//! - [`config`] - Zenoh and logging configuration
//! - [`session`] - Zenoh session opening
//! - [`error`] - error type

pub mod config;
pub mod error;
pub mod keyexpr;
pub mod serialization;
pub mod session;
pub mod telemetry;

pub use config::{LogFormat, LoggingConfig, ZenohConfig};
pub use error::{Error, Result};
pub use keyexpr::{KEY_PREFIX, KeyExprBuilder};
pub use serialization::{Format, encode};
pub use session::connect;
pub use telemetry::{CATEGORY, TelemetryPoint, TelemetryValue, current_timestamp_millis};

/// Initialize tracing.
///
/// `RUST_LOG` takes precedence over `config.level` when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init(),
    };

    result.map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))
}
