//! Broker configuration

use std::time::Duration;

/// Default minimum interval between accepted updates of one topic
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Default maximum size of a single snapshot payload
pub const DEFAULT_MAX_SNAPSHOT_BYTES: usize = 4 * 1024;

/// Default byte budget for all live snapshots
pub const DEFAULT_MEMORY_QUOTA: usize = 32 * 1024;

/// Broker configuration options
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Minimum interval for topics that do not declare their own
    pub default_min_interval: Duration,

    /// Largest payload a single snapshot may hold
    pub max_snapshot_bytes: usize,

    /// Total bytes all live snapshots may hold (current, retired and
    /// reader-held)
    pub memory_quota: usize,

    /// Bound on each dispatcher wait (`None` = wait indefinitely)
    pub wait_timeout: Option<Duration>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_min_interval: DEFAULT_MIN_INTERVAL,
            max_snapshot_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
            memory_quota: DEFAULT_MEMORY_QUOTA,
            wait_timeout: None,
        }
    }
}

impl BrokerConfig {
    /// Set the default minimum update interval
    pub fn default_min_interval(mut self, interval: Duration) -> Self {
        self.default_min_interval = interval;
        self
    }

    /// Set the maximum snapshot size
    pub fn max_snapshot_bytes(mut self, bytes: usize) -> Self {
        self.max_snapshot_bytes = bytes;
        self
    }

    /// Set the memory quota
    ///
    /// Raised to one maximum-sized snapshot when the broker is built.
    pub fn memory_quota(mut self, bytes: usize) -> Self {
        self.memory_quota = bytes;
        self
    }

    /// Bound dispatcher waits
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();

        assert_eq!(config.default_min_interval, Duration::from_millis(500));
        assert_eq!(config.max_snapshot_bytes, 4096);
        assert_eq!(config.memory_quota, 32 * 1024);
        assert!(config.wait_timeout.is_none());
    }

    #[test]
    fn test_builder_chaining() {
        let config = BrokerConfig::default()
            .default_min_interval(Duration::from_millis(100))
            .max_snapshot_bytes(256)
            .memory_quota(2048)
            .wait_timeout(Duration::from_secs(5));

        assert_eq!(config.default_min_interval, Duration::from_millis(100));
        assert_eq!(config.max_snapshot_bytes, 256);
        assert_eq!(config.memory_quota, 2048);
        assert_eq!(config.wait_timeout, Some(Duration::from_secs(5)));
    }
}
