//! Configuration broker
//!
//! [`ConfigBroker`] ties the capability registry, topic store, update
//! pipeline and dispatcher together behind the producer and consumer APIs.
//! Every entry point checks the presented token first.

pub mod builder;
pub mod config;

pub use builder::BrokerBuilder;
pub use config::BrokerConfig;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::capability::{CapabilityRegistry, Direction, Token};
use crate::dispatch::{ConfigHandler, Subscription};
use crate::error::{BrokerError, Result};
use crate::pipeline::UpdatePipeline;
use crate::snapshot::{SnapshotHandle, SnapshotRef};
use crate::stats::TopicStats;
use crate::store::TopicStore;
use crate::topic::TopicId;

/// Capability-gated configuration broker
///
/// Shared between all producer and consumer tasks as `Arc<ConfigBroker>`.
/// Holding the broker is not enough to read a topic; the topic store is
/// private and values come out only through a read token:
///
/// ```compile_fail
/// # async fn peek(broker: std::sync::Arc<config_broker::ConfigBroker>) {
/// let logger = broker.topic_id("logger").unwrap();
/// let _ = broker.store().acquire_current(logger).await;
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigBroker {
    config: BrokerConfig,
    registry: CapabilityRegistry,
    store: TopicStore,
    pipeline: UpdatePipeline,
}

impl ConfigBroker {
    /// Get the broker configuration
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &TopicStore {
        &self.store
    }

    /// Check that `token` grants `direction` on `topic`
    pub fn check(&self, token: &Token, topic: TopicId, direction: Direction) -> bool {
        self.registry.check(token, topic, direction)
    }

    /// Look up a topic by name
    pub fn topic_id(&self, name: &str) -> Option<TopicId> {
        self.store.topic_id(name)
    }

    /// Name of a topic
    pub fn topic_name(&self, id: TopicId) -> Option<&str> {
        self.store.slot(id).map(|slot| slot.name())
    }

    /// Names of all topics in declaration order
    pub fn topic_names(&self) -> Vec<&str> {
        self.store.slots().map(|slot| slot.name()).collect()
    }

    /// Publish a new value to `topic`
    ///
    /// Returns the committed version. On error the topic is unchanged.
    pub async fn update(
        &self,
        token: &Token,
        topic: &str,
        payload: impl Into<Bytes>,
    ) -> Result<u64> {
        self.pipeline
            .run(&self.registry, &self.store, token, topic, payload.into())
            .await
    }

    /// Publish a new value, giving up after `timeout`
    ///
    /// A timed-out update commits nothing and does not advance the rate
    /// limiter.
    pub async fn update_timeout(
        &self,
        token: &Token,
        topic: &str,
        payload: impl Into<Bytes>,
        timeout: Duration,
    ) -> Result<u64> {
        match tokio::time::timeout(timeout, self.update(token, topic, payload)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    topic = %topic,
                    timeout_ms = timeout.as_millis() as u64,
                    "Update timed out"
                );
                Err(BrokerError::TimedOut {
                    topic: topic.to_string(),
                })
            }
        }
    }

    fn check_read(&self, token: &Token) -> Result<TopicId> {
        let topic = token.topic();
        if self.registry.check(token, topic, Direction::Read) {
            Ok(topic)
        } else {
            Err(BrokerError::AccessDenied {
                topic: self.topic_name(topic).unwrap_or_default().to_string(),
                direction: Direction::Read,
            })
        }
    }

    /// Current snapshot reference and version of the token's topic
    ///
    /// Returns `(None, 0)` if nothing was published yet. Acquire the
    /// reference before reading through it.
    pub async fn read(&self, token: &Token) -> Result<(Option<SnapshotRef>, u64)> {
        let topic = self.check_read(token)?;
        Ok(self.store.read(topic).await)
    }

    /// Acquire the current snapshot of the token's topic
    pub async fn acquire_current(&self, token: &Token) -> Result<Option<SnapshotHandle>> {
        let topic = self.check_read(token)?;
        Ok(self.store.acquire_current(topic).await)
    }

    /// Acquire the current snapshot, giving up after `timeout`
    pub async fn acquire_timeout(
        &self,
        token: &Token,
        timeout: Duration,
    ) -> Result<Option<SnapshotHandle>> {
        let topic = self.check_read(token)?;
        match tokio::time::timeout(timeout, self.store.acquire_current(topic)).await {
            Ok(handle) => Ok(handle),
            Err(_) => {
                let name = self.topic_name(topic).unwrap_or_default().to_string();
                tracing::warn!(
                    topic = %name,
                    timeout_ms = timeout.as_millis() as u64,
                    "Acquire timed out"
                );
                Err(BrokerError::TimedOut { topic: name })
            }
        }
    }

    /// Start a subscription over `(read token, handler)` pairs
    ///
    /// Handlers are invoked in the order given. Fails with `AccessDenied` if
    /// any token is not a read token of this broker.
    pub async fn subscribe(
        self: &Arc<Self>,
        items: Vec<(Token, Box<dyn ConfigHandler>)>,
    ) -> Result<Subscription> {
        Subscription::new(Arc::clone(self), items).await
    }

    /// Get statistics for a topic
    ///
    /// Diagnostics for whoever owns the broker: counters, version and sizes,
    /// never payloads. Consumers read values only through their tokens.
    pub async fn stats(&self, topic: &str) -> Option<TopicStats> {
        let id = self.store.topic_id(topic)?;
        self.store.stats(id).await
    }

    /// Bytes held by live snapshots
    pub fn memory_in_use(&self) -> usize {
        self.pipeline.quota().used()
    }
}
