//! Capability registry
//!
//! Holds the static set of grants made at startup. Issuing requires `&mut`
//! access, which only the broker builder has; once the broker is built the
//! registry is shared immutably and no further tokens can be minted.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{Direction, Token};
use crate::topic::TopicId;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// A single issued grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub topic: TopicId,
    pub direction: Direction,
}

/// Registry of all grants issued for one broker instance
#[derive(Debug)]
pub struct CapabilityRegistry {
    id: u64,
    grants: Vec<Grant>,
}

impl CapabilityRegistry {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            grants: Vec::new(),
        }
    }

    /// Mint a token for `topic` in `direction`
    pub(crate) fn issue(&mut self, topic: TopicId, direction: Direction) -> Token {
        let serial = self.grants.len() as u32;
        self.grants.push(Grant { topic, direction });

        tracing::debug!(
            topic = topic.index(),
            direction = %direction,
            serial = serial,
            "Capability issued"
        );

        Token::new(self.id, serial, topic, direction)
    }

    /// Check that `token` grants `direction` on `topic`
    ///
    /// The token must come from this registry and its recorded grant must
    /// match both the topic and the direction.
    pub fn check(&self, token: &Token, topic: TopicId, direction: Direction) -> bool {
        if token.registry() != self.id {
            return false;
        }

        match self.grants.get(token.serial() as usize) {
            Some(grant) => {
                grant.topic == topic
                    && grant.direction == direction
                    && token.topic() == topic
                    && token.direction() == direction
            }
            None => false,
        }
    }

    /// Number of grants issued for `topic` in `direction`
    pub fn grant_count(&self, topic: TopicId, direction: Direction) -> usize {
        self.grants
            .iter()
            .filter(|g| g.topic == topic && g.direction == direction)
            .count()
    }

    /// All grants, in issue order
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_matches_topic_and_direction() {
        let mut registry = CapabilityRegistry::new();
        let a = TopicId::new(0);
        let b = TopicId::new(1);

        let read_a = registry.issue(a, Direction::Read);
        let write_a = registry.issue(a, Direction::Write);

        assert!(registry.check(&read_a, a, Direction::Read));
        assert!(!registry.check(&read_a, a, Direction::Write));
        assert!(registry.check(&write_a, a, Direction::Write));
        assert!(!registry.check(&write_a, b, Direction::Write));
        assert!(!registry.check(&read_a, b, Direction::Read));
    }

    #[test]
    fn test_token_from_other_registry_rejected() {
        let mut first = CapabilityRegistry::new();
        let mut second = CapabilityRegistry::new();
        let topic = TopicId::new(0);

        let token = first.issue(topic, Direction::Write);
        let _ = second.issue(topic, Direction::Write);

        assert!(first.check(&token, topic, Direction::Write));
        assert!(!second.check(&token, topic, Direction::Write));
    }

    #[test]
    fn test_grant_count() {
        let mut registry = CapabilityRegistry::new();
        let topic = TopicId::new(3);

        registry.issue(topic, Direction::Read);
        registry.issue(topic, Direction::Read);
        registry.issue(topic, Direction::Write);

        assert_eq!(registry.grant_count(topic, Direction::Read), 2);
        assert_eq!(registry.grant_count(topic, Direction::Write), 1);
        assert_eq!(registry.grants().len(), 3);
    }
}
