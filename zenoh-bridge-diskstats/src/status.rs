//! Bridge status messages.

use serde::{Deserialize, Serialize};

use crate::publisher::{PublishError, Publisher};

/// Status document published on `<key_prefix>/@/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub bridge: String,
    pub version: String,
    /// "running" or "offline".
    pub status: String,
    /// Bridge-specific details, flattened into the document.
    #[serde(flatten)]
    pub metadata: serde_json::Value,
}

impl BridgeStatus {
    pub fn running(bridge: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            bridge: bridge.into(),
            version: version.into(),
            status: "running".to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn offline(bridge: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            bridge: bridge.into(),
            version: version.into(),
            status: "offline".to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Publishes startup and shutdown status for one bridge.
pub struct StatusPublisher {
    publisher: Publisher,
    key: String,
    bridge: String,
    version: String,
}

impl StatusPublisher {
    pub fn new(
        publisher: Publisher,
        key: impl Into<String>,
        bridge: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            key: key.into(),
            bridge: bridge.into(),
            version: version.into(),
        }
    }

    pub async fn publish_running(&self, metadata: serde_json::Value) -> Result<(), PublishError> {
        let status = BridgeStatus::running(&self.bridge, &self.version).with_metadata(metadata);
        self.publisher.publish_json(&self.key, &status).await
    }

    pub async fn publish_offline(&self) -> Result<(), PublishError> {
        let status = BridgeStatus::offline(&self.bridge, &self.version);
        self.publisher.publish_json(&self.key, &status).await
    }
}
