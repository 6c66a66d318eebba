//! Snapshots and the ownership hand-off protocol
//!
//! A [`Snapshot`] is one immutable, versioned value of a topic. The topic
//! store owns the current snapshot; readers extend the lifetime of a specific
//! snapshot by acquiring a [`SnapshotHandle`] on it.
//!
//! ```text
//!   store.commit(v3)                 reader
//!   ┌──────────────┐                 ┌──────────────────────────┐
//!   │ current: v3  │◄── acquire ─────│ held: v2 → acquire v3    │
//!   │ retired: v2 ─┼─ weak ─┐        │          → release v2    │
//!   └──────────────┘        │        └──────────────────────────┘
//!                           └── destroyed once the last handle drops
//! ```
//!
//! Readers must acquire the new snapshot before releasing the one they hold.
//! Snapshots are reference counted with `Arc`; committing a new value only
//! drops the store's own reference, so an old snapshot stays readable for as
//! long as any handle on it is alive.
//!
//! Snapshot payloads are charged against a broker-wide [`MemoryQuota`] until
//! the snapshot is destroyed.

pub mod handle;
pub mod quota;
pub mod record;

pub use handle::{SnapshotHandle, SnapshotRef};
pub use quota::{MemoryQuota, Reservation};
pub use record::Record;

use std::sync::Arc;

use bytes::Bytes;
use tokio::time::Instant;

use crate::topic::TopicId;

/// One immutable, versioned topic value
pub struct Snapshot {
    topic: TopicId,
    topic_name: Arc<str>,
    version: u64,
    payload: Bytes,
    record: Option<Record>,
    created_at: Instant,
    _reservation: Reservation,
}

impl Snapshot {
    pub(crate) fn new(
        topic: TopicId,
        topic_name: Arc<str>,
        version: u64,
        payload: Bytes,
        record: Option<Record>,
        reservation: Reservation,
    ) -> Self {
        Self {
            topic,
            topic_name,
            version,
            payload,
            record,
            created_at: Instant::now(),
            _reservation: reservation,
        }
    }

    /// Topic this snapshot belongs to
    pub fn topic(&self) -> TopicId {
        self.topic
    }

    /// Name of the topic this snapshot belongs to
    pub fn topic_name(&self) -> &str {
        &self.topic_name
    }

    /// Version number (first published value is 1)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Raw bytes of the update that produced this snapshot
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Decoded record, if the topic has a decoder
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    /// Decoded record as `T`
    ///
    /// Returns `None` if the topic has no decoder or the record is another type.
    pub fn decoded<T: 'static>(&self) -> Option<&T> {
        self.record.as_ref().and_then(|r| r.downcast_ref::<T>())
    }

    /// When the snapshot was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("topic", &self.topic_name)
            .field("version", &self.version)
            .field("len", &self.payload.len())
            .field("decoded", &self.record.is_some())
            .finish()
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        tracing::trace!(
            topic = %self.topic_name,
            version = self.version,
            bytes = self.payload.len(),
            "Snapshot destroyed"
        );
    }
}
