//! Remote configuration ingestion
//!
//! Bridges an external message feed (e.g. an MQTT subscription) into the
//! broker. Remote topic names map 1:1 onto broker topics, and every route
//! owns the write token for its topic, so the feed can only reach the topics
//! it was wired to.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::broker::ConfigBroker;
use crate::capability::Token;
use crate::error::{BrokerError, Result};

/// A message received from the remote feed
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Remote topic name
    pub topic: String,
    /// Raw payload
    pub payload: Bytes,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Outcome counts from [`RemoteIngest::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Messages committed
    pub accepted: u64,
    /// Messages the broker rejected
    pub rejected: u64,
    /// Messages for a remote topic with no route
    pub unrouted: u64,
}

struct Route {
    topic: String,
    token: Token,
}

/// Remote ingestion front end
pub struct RemoteIngest {
    broker: Arc<ConfigBroker>,
    routes: HashMap<String, Route>,
}

impl RemoteIngest {
    /// Create an ingest with no routes
    pub fn new(broker: Arc<ConfigBroker>) -> Self {
        Self {
            broker,
            routes: HashMap::new(),
        }
    }

    /// Route `remote` to the topic `token` writes
    pub fn route(mut self, remote: impl Into<String>, token: Token) -> Self {
        let topic = self
            .broker
            .topic_name(token.topic())
            .unwrap_or_default()
            .to_string();
        self.routes.insert(remote.into(), Route { topic, token });
        self
    }

    /// Broker topic a remote topic is routed to
    pub fn target(&self, remote: &str) -> Option<&str> {
        self.routes.get(remote).map(|r| r.topic.as_str())
    }

    /// Push one remote message into the broker
    ///
    /// Returns the broker's result unchanged.
    pub async fn handle(&self, remote_topic: &str, payload: impl Into<Bytes>) -> Result<u64> {
        let route = self
            .routes
            .get(remote_topic)
            .ok_or_else(|| BrokerError::UnknownTopic(remote_topic.to_string()))?;

        self.broker
            .update(&route.token, &route.topic, payload)
            .await
    }

    /// Drain `rx` until every sender is dropped
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundMessage>) -> IngestStats {
        let mut stats = IngestStats::default();

        while let Some(message) = rx.recv().await {
            match self.handle(&message.topic, message.payload).await {
                Ok(version) => {
                    stats.accepted += 1;
                    tracing::info!(
                        remote = %message.topic,
                        version = version,
                        "Remote update applied"
                    );
                }
                Err(BrokerError::UnknownTopic(_)) => {
                    stats.unrouted += 1;
                    tracing::warn!(remote = %message.topic, "No route for remote topic");
                }
                Err(err) => {
                    stats.rejected += 1;
                    tracing::warn!(remote = %message.topic, error = %err, "Remote update rejected");
                }
            }
        }

        tracing::info!(
            accepted = stats.accepted,
            rejected = stats.rejected,
            unrouted = stats.unrouted,
            "Remote feed closed"
        );
        stats
    }
}

impl std::fmt::Debug for RemoteIngest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut routes: Vec<_> = self
            .routes
            .iter()
            .map(|(remote, route)| (remote.as_str(), route.topic.as_str()))
            .collect();
        routes.sort_unstable();

        f.debug_struct("RemoteIngest").field("routes", &routes).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::broker::{BrokerBuilder, BrokerConfig};
    use crate::error::ErrorKind;
    use crate::topics::{standard_topics, UserLedConfig};

    const RGB: &str = r#"{"led0":{"red":0,"green":86,"blue":164},"led1":{"red":255,"green":200,"blue":200}}"#;
    const USER: &str = r#"{"led0":"on","led1":"off","led2":"ON","led3":"OFF","led4":"On","led5":"Off","led6":"on","led7":"off"}"#;

    fn ingest() -> (RemoteIngest, Token) {
        let mut builder = BrokerBuilder::new(
            BrokerConfig::default().default_min_interval(Duration::ZERO),
            standard_topics(),
        )
        .unwrap();
        let rgb = builder.grant_write("rgb_led").unwrap();
        let user = builder.grant_write("user_led").unwrap();
        let user_reader = builder.grant_read("user_led").unwrap();

        let ingest = RemoteIngest::new(builder.build())
            .route("rgbled", rgb)
            .route("userled", user);
        (ingest, user_reader)
    }

    #[tokio::test]
    async fn test_routes_to_broker_topic() {
        let (ingest, reader) = ingest();
        assert_eq!(ingest.target("rgbled"), Some("rgb_led"));

        assert_eq!(ingest.handle("userled", USER).await.unwrap(), 1);

        let handle = ingest.broker.acquire_current(&reader).await.unwrap().unwrap();
        assert_eq!(handle.decoded::<UserLedConfig>().unwrap().bits(), 0b0101_0101);
    }

    #[tokio::test]
    async fn test_unknown_remote_topic() {
        let (ingest, _) = ingest();

        let err = ingest.handle("logger", "{}").await.unwrap_err();
        assert_eq!(err, BrokerError::UnknownTopic("logger".into()));
    }

    #[tokio::test]
    async fn test_broker_result_returned_unchanged() {
        let (ingest, _) = ingest();

        let err = ingest.handle("rgbled", r#"{"x":"#).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn test_run_until_channel_closed() {
        let (ingest, _) = ingest();
        let (tx, rx) = mpsc::channel(8);

        tx.send(InboundMessage::new("rgbled", RGB)).await.unwrap();
        tx.send(InboundMessage::new("rgbled", r#"{"x":"#)).await.unwrap();
        tx.send(InboundMessage::new("userled", USER)).await.unwrap();
        tx.send(InboundMessage::new("weather", "{}")).await.unwrap();
        drop(tx);

        let stats = ingest.run(rx).await;
        assert_eq!(
            stats,
            IngestStats {
                accepted: 2,
                rejected: 1,
                unrouted: 1
            }
        );
    }
}
