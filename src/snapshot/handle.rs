//! Snapshot references and handles
//!
//! [`SnapshotRef`] is what the store hands out from `read`: it names a
//! snapshot without keeping it alive. [`SnapshotHandle`] is a co-owning
//! handle; the snapshot cannot be destroyed while one exists.

use std::ops::Deref;
use std::sync::{Arc, Weak};

use super::Snapshot;
use crate::error::{BrokerError, Result};
use crate::topic::TopicId;

/// Non-owning reference to a specific snapshot
#[derive(Debug, Clone)]
pub struct SnapshotRef {
    inner: Weak<Snapshot>,
    topic: TopicId,
    topic_name: Arc<str>,
    version: u64,
}

impl SnapshotRef {
    pub(crate) fn new(snapshot: &Arc<Snapshot>) -> Self {
        Self {
            inner: Arc::downgrade(snapshot),
            topic: snapshot.topic(),
            topic_name: Arc::clone(&snapshot.topic_name),
            version: snapshot.version(),
        }
    }

    /// Become a co-owner of the referenced snapshot
    ///
    /// Fails with [`BrokerError::AcquireOnDestroyed`] if the snapshot was
    /// superseded and every owner already released it.
    pub fn acquire(&self) -> Result<SnapshotHandle> {
        match self.inner.upgrade() {
            Some(snapshot) => {
                tracing::debug!(
                    topic = %self.topic_name,
                    version = self.version,
                    "Snapshot acquired"
                );
                Ok(SnapshotHandle(snapshot))
            }
            None => {
                tracing::error!(
                    topic = %self.topic_name,
                    version = self.version,
                    "Acquire on destroyed snapshot"
                );
                Err(BrokerError::AcquireOnDestroyed {
                    topic: self.topic_name.to_string(),
                    version: self.version,
                })
            }
        }
    }

    /// Topic of the referenced snapshot
    pub fn topic(&self) -> TopicId {
        self.topic
    }

    /// Version of the referenced snapshot
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the snapshot still exists
    pub fn is_live(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// Co-owning handle on a snapshot
///
/// Cloning a handle acquires another co-ownership; dropping or calling
/// [`release`](Self::release) gives it up.
#[derive(Debug, Clone)]
pub struct SnapshotHandle(Arc<Snapshot>);

impl SnapshotHandle {
    pub(crate) fn from_arc(snapshot: Arc<Snapshot>) -> Self {
        Self(snapshot)
    }

    /// Give up co-ownership
    pub fn release(self) {
        tracing::debug!(
            topic = %self.0.topic_name(),
            version = self.0.version(),
            "Snapshot released"
        );
    }

    /// Non-owning reference to the same snapshot
    pub fn downgrade(&self) -> SnapshotRef {
        SnapshotRef::new(&self.0)
    }

    /// Number of live owners, including the store if it is still current
    pub fn owners(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Whether two handles refer to the same snapshot instance
    pub fn ptr_eq(&self, other: &SnapshotHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for SnapshotHandle {
    type Target = Snapshot;

    fn deref(&self) -> &Snapshot {
        &self.0
    }
}
