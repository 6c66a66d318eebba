//! Capability-gated configuration broker
//!
//! Named configuration topics are written by a few trusted producers and read
//! by many independent consumers. The broker:
//!
//! - Checks a per-topic, per-direction capability token on every call
//! - Keeps a versioned current value per topic, shared by reference count
//! - Rate-limits and decodes updates before they are committed
//! - Wakes each reader once per batch of changes to the topics it watches
//!
//! # Example
//!
//! ```no_run
//! use config_broker::topics::{standard_topics, RgbLedConfig};
//! use config_broker::{typed, BrokerBuilder, BrokerConfig, ConfigHandler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = BrokerBuilder::new(BrokerConfig::default(), standard_topics())?;
//! let writer = builder.grant_write("rgb_led")?;
//! let reader = builder.grant_read("rgb_led")?;
//! let broker = builder.build();
//!
//! let handler: Box<dyn ConfigHandler> = Box::new(typed::<RgbLedConfig, _>(|config| {
//!     println!("LED 0 red: {}", config.led0.red);
//!     Ok(())
//! }));
//! let subscription = broker.subscribe(vec![(reader, handler)]).await?;
//! tokio::spawn(subscription.run());
//!
//! broker
//!     .update(
//!         &writer,
//!         "rgb_led",
//!         r#"{"led0":{"red":255,"green":0,"blue":0},"led1":{"red":0,"green":0,"blue":255}}"#,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod capability;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod producer;
pub mod snapshot;
pub mod stats;
pub mod status;
pub mod store;
pub mod topic;
pub mod topics;

// Re-export main types for convenience
pub use broker::{BrokerBuilder, BrokerConfig, ConfigBroker};
pub use capability::{Direction, Token};
pub use dispatch::{typed, ConfigHandler, DispatchReport, Subscription};
pub use error::{BrokerError, ConfigError, DecodeError, ErrorKind, HandlerError, Result};
pub use pipeline::{Decoder, JsonDecoder, JsonRecord};
pub use snapshot::{Record, Snapshot, SnapshotHandle, SnapshotRef};
pub use stats::TopicStats;
pub use topic::{TopicId, TopicSpec, WritePolicy};
