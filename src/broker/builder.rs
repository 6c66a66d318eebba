//! Startup wiring
//!
//! The builder is the only place capability tokens can be minted. Building
//! the broker consumes it, after which the grant set is fixed.

use std::sync::Arc;

use super::config::BrokerConfig;
use super::ConfigBroker;
use crate::capability::{CapabilityRegistry, Direction, Token};
use crate::error::ConfigError;
use crate::pipeline::UpdatePipeline;
use crate::snapshot::MemoryQuota;
use crate::store::TopicStore;
use crate::topic::{TopicSpec, WritePolicy};

/// Builder for a [`ConfigBroker`]
///
/// # Example
/// ```
/// use config_broker::{BrokerBuilder, BrokerConfig};
/// use config_broker::topics::standard_topics;
///
/// # fn example() -> Result<(), config_broker::ConfigError> {
/// let mut builder = BrokerBuilder::new(BrokerConfig::default(), standard_topics())?;
/// let rgb_writer = builder.grant_write("rgb_led")?;
/// let rgb_reader = builder.grant_read("rgb_led")?;
/// let broker = builder.build();
/// # let _ = (broker, rgb_writer, rgb_reader);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BrokerBuilder {
    config: BrokerConfig,
    store: TopicStore,
    registry: CapabilityRegistry,
}

impl BrokerBuilder {
    /// Start wiring a broker with the given topic table
    pub fn new(config: BrokerConfig, topics: Vec<TopicSpec>) -> Result<Self, ConfigError> {
        let store = TopicStore::new(topics, config.default_min_interval)?;

        Ok(Self {
            config,
            store,
            registry: CapabilityRegistry::new(),
        })
    }

    /// Grant read access to `topic`
    pub fn grant_read(&mut self, topic: &str) -> Result<Token, ConfigError> {
        self.grant(topic, Direction::Read)
    }

    /// Grant write access to `topic`
    ///
    /// Single-writer topics accept only one write grant.
    pub fn grant_write(&mut self, topic: &str) -> Result<Token, ConfigError> {
        self.grant(topic, Direction::Write)
    }

    fn grant(&mut self, topic: &str, direction: Direction) -> Result<Token, ConfigError> {
        let slot = self
            .store
            .topic_id(topic)
            .and_then(|id| self.store.slot(id))
            .ok_or_else(|| ConfigError::UnknownTopic(topic.to_string()))?;
        let id = slot.id();

        if direction == Direction::Write
            && slot.spec().policy == WritePolicy::SingleWriter
            && self.registry.grant_count(id, Direction::Write) > 0
        {
            return Err(ConfigError::WriterAlreadyGranted(topic.to_string()));
        }

        Ok(self.registry.issue(id, direction))
    }

    /// Finish wiring
    pub fn build(mut self) -> Arc<ConfigBroker> {
        // Room for at least one snapshot
        self.config.memory_quota = self.config.memory_quota.max(self.config.max_snapshot_bytes);

        let quota = MemoryQuota::new(self.config.memory_quota);
        let pipeline = UpdatePipeline::new(quota, self.config.max_snapshot_bytes);

        tracing::info!(
            topics = self.store.len(),
            grants = self.registry.grants().len(),
            memory_quota = self.config.memory_quota,
            "Config broker built"
        );

        Arc::new(ConfigBroker {
            config: self.config,
            registry: self.registry,
            store: self.store,
            pipeline,
        })
    }
}
