//! Capability tokens and the registry that mints them
//!
//! A [`Token`] binds exactly one topic to exactly one [`Direction`]. Tokens
//! have no public constructor and cannot be cloned; the only way to obtain one
//! is through [`BrokerBuilder`](crate::broker::BrokerBuilder) before the broker
//! is built. Every broker operation re-checks the presented token, so a
//! consumer can only touch the topics it was explicitly wired to.
//!
//! Each registry carries a process-unique id that is stamped into its tokens,
//! so a token minted for one broker instance is rejected by any other.

pub mod registry;

pub use registry::{CapabilityRegistry, Grant};

use crate::topic::TopicId;

/// Access direction granted by a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Read the current snapshot and subscribe to changes
    Read,
    /// Publish new snapshots
    Write,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Read => write!(f, "read"),
            Direction::Write => write!(f, "write"),
        }
    }
}

/// Unforgeable proof of access to one topic in one direction
pub struct Token {
    registry: u64,
    serial: u32,
    topic: TopicId,
    direction: Direction,
}

impl Token {
    pub(crate) fn new(registry: u64, serial: u32, topic: TopicId, direction: Direction) -> Self {
        Self {
            registry,
            serial,
            topic,
            direction,
        }
    }

    /// Topic this token is bound to
    pub fn topic(&self) -> TopicId {
        self.topic
    }

    /// Direction this token grants
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn registry(&self) -> u64 {
        self.registry
    }

    pub(crate) fn serial(&self) -> u32 {
        self.serial
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("topic", &self.topic)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}
