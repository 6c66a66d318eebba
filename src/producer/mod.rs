//! Local sensor producer
//!
//! Polls the board's switch bank and publishes the `system` topic whenever
//! the switches move. The first two switches select the board id.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::broker::ConfigBroker;
use crate::capability::Token;
use crate::error::Result;
use crate::topics::system::{SystemConfig, SWITCH_COUNT};

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Source of switch positions
pub trait SwitchSensor: Send {
    /// Read all switches, index 0 = switch 0
    fn read_switches(&mut self) -> [bool; SWITCH_COUNT];
}

/// Publishes the `system` topic from a [`SwitchSensor`]
pub struct SystemProducer<S> {
    broker: Arc<ConfigBroker>,
    token: Token,
    name: String,
    sensor: S,
    poll_interval: Duration,
    published: Option<SystemConfig>,
}

impl<S: SwitchSensor> SystemProducer<S> {
    /// Create a producer that names the board `<name>-<n>`
    pub fn new(
        broker: Arc<ConfigBroker>,
        token: Token,
        name: impl Into<String>,
        sensor: S,
    ) -> Self {
        Self {
            broker,
            token,
            name: name.into(),
            sensor,
            poll_interval: DEFAULT_POLL_INTERVAL,
            published: None,
        }
    }

    /// Set the polling interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Last value the broker accepted
    pub fn published(&self) -> Option<&SystemConfig> {
        self.published.as_ref()
    }

    /// Read the sensor into a configuration
    pub fn sample(&mut self) -> SystemConfig {
        let switches = self.sensor.read_switches();
        let id = u8::from(switches[0]) | (u8::from(switches[1]) << 1);

        SystemConfig::new(&format!("{}-{}", self.name, id), switches)
    }

    /// Sample once and publish if the value changed
    ///
    /// Returns the new version, or `None` if nothing changed. A failed
    /// publish is retried on the next poll.
    pub async fn poll(&mut self) -> Result<Option<u64>> {
        let config = self.sample();
        if self.published.as_ref() == Some(&config) {
            return Ok(None);
        }

        let topic = self
            .broker
            .topic_name(self.token.topic())
            .unwrap_or_default()
            .to_string();
        let version = self.broker.update(&self.token, &topic, config.encode()).await?;

        tracing::info!(
            id = %config.id,
            switches = config.switch_bits(),
            version = version,
            "System config published"
        );
        self.published = Some(config);
        Ok(Some(version))
    }

    /// Poll forever
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Poll until `shutdown` completes
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(name = %self.name, "System producer stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.poll().await {
                        tracing::warn!(error = %err, "System config publish failed");
                    }
                }
            }
        }
    }
}

impl<S> std::fmt::Debug for SystemProducer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemProducer")
            .field("name", &self.name)
            .field("poll_interval", &self.poll_interval)
            .field("published", &self.published)
            .finish()
    }
}
