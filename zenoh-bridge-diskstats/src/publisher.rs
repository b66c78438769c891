//! Zenoh publishing of telemetry points.

use std::sync::Arc;

use diskstats_common::{Format, TelemetryPoint, encode};
use thiserror::Error;

/// Publishing errors.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Failed to publish to {key}: {message}")]
    Publish { key: String, message: String },
}

/// Encodes telemetry and puts it on a Zenoh session.
#[derive(Clone, Debug)]
pub struct Publisher {
    session: Arc<zenoh::Session>,
    format: Format,
}

impl Publisher {
    pub fn new(session: Arc<zenoh::Session>, format: Format) -> Self {
        Self { session, format }
    }

    /// Publish one point to `key`.
    pub async fn publish(&self, key: &str, point: &TelemetryPoint) -> Result<(), PublishError> {
        let payload =
            encode(point, self.format).map_err(|e| PublishError::Serialization(e.to_string()))?;
        self.put(key, payload).await
    }

    /// Publish a batch of keyed points. Failures are logged and counted.
    pub async fn publish_batch<I>(&self, points: I) -> PublishStats
    where
        I: IntoIterator<Item = (String, TelemetryPoint)>,
    {
        let mut stats = PublishStats::default();

        for (key, point) in points {
            match self.publish(&key, &point).await {
                Ok(()) => stats.success += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(error = %e, "Failed to publish telemetry");
                }
            }
        }

        stats
    }

    /// Publish a JSON document (status messages).
    pub async fn publish_json<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PublishError> {
        let payload =
            serde_json::to_vec(value).map_err(|e| PublishError::Serialization(e.to_string()))?;
        self.put(key, payload).await
    }

    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        self.session
            .put(key, payload)
            .await
            .map_err(|e| PublishError::Publish {
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

/// Outcome of a batch publish.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    pub success: usize,
    pub failed: usize,
}
