/// Default key expression prefix for disk statistics.
pub const KEY_PREFIX: &str = "zensight/diskstats";

/// Builder for diskstats key expressions.
///
/// Key expressions follow the pattern:
/// `<prefix>/<hostname>/<device>/<metric_name>`
#[derive(Debug, Clone)]
pub struct KeyExprBuilder {
    prefix: String,
}

impl KeyExprBuilder {
    /// Create a builder with the given prefix. Trailing slashes are dropped.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Build the key for one device metric.
    ///
    /// # Example
    /// ```
    /// use diskstats_common::keyexpr::{KEY_PREFIX, KeyExprBuilder};
    ///
    /// let builder = KeyExprBuilder::new(KEY_PREFIX);
    /// let key = builder.build("db01", "sda", "io_util");
    /// assert_eq!(key, "zensight/diskstats/db01/sda/io_util");
    /// ```
    pub fn build(&self, hostname: &str, device: &str, metric: &str) -> String {
        format!("{}/{}/{}/{}", self.prefix, hostname, device, metric)
    }

    /// Key for bridge status messages.
    ///
    /// # Example
    /// ```
    /// use diskstats_common::keyexpr::{KEY_PREFIX, KeyExprBuilder};
    ///
    /// assert_eq!(KeyExprBuilder::new(KEY_PREFIX).status_key(), "zensight/diskstats/@/status");
    /// ```
    pub fn status_key(&self) -> String {
        format!("{}/@/status", self.prefix)
    }
}
