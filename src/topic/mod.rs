//! Static topic declarations
//!
//! Topics are declared once, before the broker is built, and never change
//! afterwards. A [`TopicSpec`] is one row of that configuration table.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::pipeline::Decoder;

/// Maximum length of a topic name in bytes
pub const MAX_TOPIC_NAME_LEN: usize = 32;

/// Index of a topic in the broker's static table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicId(usize);

impl TopicId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position in the topic table
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Who may publish to a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Exactly one write token may be granted
    #[default]
    SingleWriter,
    /// Any number of write tokens; commits are serialized per topic
    MultiWriter,
}

/// Declaration of a single topic
#[derive(Clone)]
pub struct TopicSpec {
    /// Globally unique topic name
    pub name: String,

    /// Write access policy
    pub policy: WritePolicy,

    /// Decoder applied to raw updates (identity when `None`)
    pub decoder: Option<Arc<dyn Decoder>>,

    /// Minimum interval between accepted updates (`None` = broker default)
    pub min_interval: Option<Duration>,
}

impl TopicSpec {
    /// Declare a raw-bytes, single-writer topic
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: WritePolicy::SingleWriter,
            decoder: None,
            min_interval: None,
        }
    }

    /// Set the decoder
    pub fn decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    /// Set the minimum interval between accepted updates
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = Some(interval);
        self
    }

    /// Allow more than one writer
    pub fn multi_writer(mut self) -> Self {
        self.policy = WritePolicy::MultiWriter;
        self
    }

    /// Validate the topic name
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid = !self.name.is_empty()
            && self.name.len() <= MAX_TOPIC_NAME_LEN
            && self
                .name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidTopicName(self.name.clone()))
        }
    }
}

impl std::fmt::Debug for TopicSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicSpec")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("decoder", &self.decoder.as_ref().map(|d| d.name()))
            .field("min_interval", &self.min_interval)
            .finish()
    }
}
