//! Update pipeline
//!
//! Validates an incoming update and commits it to the topic store. The steps
//! run in a fixed order:
//!
//! 1. Capability check. A mismatched token is `AccessDenied`.
//! 2. Rate limit. Checked before decoding so a flood of updates cannot be
//!    used to burn decode and allocation work.
//! 3. Size limit. A payload over `max_snapshot_bytes` is `AllocationFailure`
//!    and is never decoded.
//! 4. Decode, if the topic declares a decoder. Failures are `Malformed` or
//!    `OutOfRange`.
//! 5. Allocate the snapshot against the memory quota and commit it.
//! 6. Advance the rate-limiter timestamp.
//!
//! Any failure leaves the topic's current value, version and rate-limiter
//! timestamp exactly as they were, so a corrected resubmission is not
//! penalized.

pub mod decoder;

pub use decoder::{Decoder, JsonDecoder, JsonRecord};

use std::sync::Arc;

use bytes::Bytes;
use tokio::time::Instant;

use crate::capability::{CapabilityRegistry, Direction, Token};
use crate::error::{BrokerError, Result};
use crate::snapshot::MemoryQuota;
use crate::store::{TopicSlot, TopicStore};

/// Update pipeline shared by all producers
#[derive(Debug)]
pub struct UpdatePipeline {
    quota: Arc<MemoryQuota>,
    max_snapshot_bytes: usize,
}

impl UpdatePipeline {
    /// Create a pipeline that allocates snapshots from `quota`
    pub fn new(quota: Arc<MemoryQuota>, max_snapshot_bytes: usize) -> Self {
        Self {
            quota,
            max_snapshot_bytes,
        }
    }

    /// Memory quota snapshots are charged against
    pub fn quota(&self) -> &Arc<MemoryQuota> {
        &self.quota
    }

    /// Run an update through every step
    ///
    /// Returns the committed version.
    pub async fn run(
        &self,
        registry: &CapabilityRegistry,
        store: &TopicStore,
        token: &Token,
        topic_name: &str,
        raw: Bytes,
    ) -> Result<u64> {
        let slot = match store.topic_id(topic_name).and_then(|id| store.slot(id)) {
            Some(slot) if registry.check(token, slot.id(), Direction::Write) => slot,
            found => {
                let err = BrokerError::AccessDenied {
                    topic: topic_name.to_string(),
                    direction: Direction::Write,
                };
                if let Some(slot) = found {
                    slot.counters.record_rejected(err.kind());
                }
                tracing::warn!(topic = %topic_name, "Update rejected: access denied");
                return Err(err);
            }
        };

        // Held until the commit completes; serializes writers of this topic
        let mut limiter = slot.writer.lock().await;

        let now = Instant::now();
        if let Err(retry_after) = limiter.check(now) {
            return Err(reject(
                slot,
                BrokerError::RateLimited {
                    topic: slot.name().to_string(),
                    retry_after,
                },
            ));
        }

        if raw.len() > self.max_snapshot_bytes {
            return Err(reject(
                slot,
                BrokerError::AllocationFailure {
                    topic: slot.name().to_string(),
                    requested: raw.len(),
                    available: self.max_snapshot_bytes,
                },
            ));
        }

        let record = match slot.spec().decoder.as_ref() {
            Some(decoder) => match decoder.decode(&raw) {
                Ok(record) => Some(record),
                Err(err) => {
                    return Err(reject(slot, BrokerError::from_decode(slot.name(), err)));
                }
            },
            None => None,
        };

        let reservation = match self.quota.reserve(raw.len()) {
            Ok(reservation) => reservation,
            Err(available) => {
                return Err(reject(
                    slot,
                    BrokerError::AllocationFailure {
                        topic: slot.name().to_string(),
                        requested: raw.len(),
                        available,
                    },
                ));
            }
        };

        let version = store.commit(slot.id(), raw, record, reservation).await;

        limiter.record(now);
        slot.counters.record_accepted();

        Ok(version)
    }
}

fn reject(slot: &TopicSlot, err: BrokerError) -> BrokerError {
    slot.counters.record_rejected(err.kind());
    tracing::warn!(topic = %slot.name(), error = %err, "Update rejected");
    err
}
