//! Topic store implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Notify;

use super::slot::TopicSlot;
use crate::error::ConfigError;
use crate::snapshot::{Record, Reservation, Snapshot, SnapshotHandle, SnapshotRef};
use crate::stats::TopicStats;
use crate::topic::{TopicId, TopicSpec};

/// Fixed table of topic slots
///
/// The set of topics is decided when the store is created. Each slot has
/// its own locks, so different topics never contend.
#[derive(Debug)]
pub struct TopicStore {
    slots: Vec<TopicSlot>,
    by_name: HashMap<String, TopicId>,
}

impl TopicStore {
    /// Build the store from the topic table
    pub fn new(specs: Vec<TopicSpec>, default_interval: Duration) -> Result<Self, ConfigError> {
        let mut slots = Vec::with_capacity(specs.len());
        let mut by_name = HashMap::with_capacity(specs.len());

        for spec in specs {
            spec.validate()?;
            if by_name.contains_key(&spec.name) {
                return Err(ConfigError::DuplicateTopic(spec.name));
            }

            let id = TopicId::new(slots.len());
            by_name.insert(spec.name.clone(), id);
            slots.push(TopicSlot::new(id, spec, default_interval));
        }

        Ok(Self { slots, by_name })
    }

    /// Look up a topic by name
    pub fn topic_id(&self, name: &str) -> Option<TopicId> {
        self.by_name.get(name).copied()
    }

    /// Get a slot
    pub fn slot(&self, id: TopicId) -> Option<&TopicSlot> {
        self.slots.get(id.index())
    }

    /// Iterate over all slots in declaration order
    pub fn slots(&self) -> impl Iterator<Item = &TopicSlot> {
        self.slots.iter()
    }

    /// Number of topics
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the store has no topics
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current snapshot reference and version
    ///
    /// Returns `(None, 0)` if the topic was never published. The reference
    /// does not keep the snapshot alive; call [`SnapshotRef::acquire`].
    pub(crate) async fn read(&self, id: TopicId) -> (Option<SnapshotRef>, u64) {
        match self.slot(id) {
            Some(slot) => {
                let state = slot.state.read().await;
                (state.current.as_ref().map(SnapshotRef::new), state.version)
            }
            None => (None, 0),
        }
    }

    /// Acquire the current snapshot in one step
    ///
    /// The snapshot cannot be destroyed between lookup and acquire because
    /// both happen under the slot lock.
    pub(crate) async fn acquire_current(&self, id: TopicId) -> Option<SnapshotHandle> {
        let slot = self.slot(id)?;
        let state = slot.state.read().await;
        state
            .current
            .as_ref()
            .map(|current| SnapshotHandle::from_arc(Arc::clone(current)))
    }

    /// Current version of a topic
    pub(crate) async fn version(&self, id: TopicId) -> u64 {
        match self.slot(id) {
            Some(slot) => slot.state.read().await.version,
            None => 0,
        }
    }

    /// Install a new snapshot as current
    ///
    /// Callers must hold the slot's writer lock. The previous snapshot is
    /// retired, not destroyed: it lives on until its last handle is released.
    /// Returns the new version.
    pub(crate) async fn commit(
        &self,
        id: TopicId,
        payload: Bytes,
        record: Option<Record>,
        reservation: Reservation,
    ) -> u64 {
        let slot = &self.slots[id.index()];
        let mut state = slot.state.write().await;

        let version = state.version + 1;
        let snapshot = Arc::new(Snapshot::new(
            id,
            Arc::clone(&slot.name),
            version,
            payload,
            record,
            reservation,
        ));
        let size = snapshot.len();

        state.install(snapshot);
        let woken = state.notify_waiters();

        tracing::info!(
            topic = %slot.name,
            version = version,
            bytes = size,
            waiters = woken,
            retired_live = state.retired.len(),
            "Snapshot committed"
        );

        version
    }

    /// Register a subscription's wake source on a topic
    pub(crate) async fn register_waiter(&self, id: TopicId, notify: &Arc<Notify>) {
        if let Some(slot) = self.slot(id) {
            let mut state = slot.state.write().await;
            state.waiters.retain(|w| w.strong_count() > 0);
            state.waiters.push(Arc::downgrade(notify));
        }
    }

    /// Get topic statistics
    pub(crate) async fn stats(&self, id: TopicId) -> Option<TopicStats> {
        let slot = self.slot(id)?;
        let state = slot.state.read().await;

        Some(TopicStats {
            name: slot.name.to_string(),
            version: state.version,
            current_size: state.current.as_ref().map(|s| s.len()).unwrap_or(0),
            since_last_update: state.last_update.map(|t| t.elapsed()),
            retired_live: state.retired_live(),
            waiters: state.waiters.iter().filter(|w| w.strong_count() > 0).count(),
            updates: slot.counters.snapshot(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MemoryQuota;

    fn store() -> TopicStore {
        TopicStore::new(
            vec![TopicSpec::new("logger"), TopicSpec::new("system")],
            Duration::ZERO,
        )
        .unwrap()
    }

    async fn commit(
        store: &TopicStore,
        quota: &Arc<MemoryQuota>,
        id: TopicId,
        data: &'static [u8],
    ) -> u64 {
        let reservation = quota.reserve(data.len()).unwrap();
        store
            .commit(id, Bytes::from_static(data), None, reservation)
            .await
    }

    #[test]
    fn test_duplicate_topic_rejected() {
        let result = TopicStore::new(
            vec![TopicSpec::new("logger"), TopicSpec::new("logger")],
            Duration::ZERO,
        );
        assert!(matches!(result, Err(ConfigError::DuplicateTopic(_))));
    }

    #[tokio::test]
    async fn test_read_unpublished() {
        let store = store();
        let id = store.topic_id("logger").unwrap();

        let (snapshot, version) = store.read(id).await;
        assert!(snapshot.is_none());
        assert_eq!(version, 0);
        assert!(store.acquire_current(id).await.is_none());
    }

    #[tokio::test]
    async fn test_versions_strictly_increase() {
        let store = store();
        let quota = MemoryQuota::new(1024);
        let id = store.topic_id("system").unwrap();

        let mut last = 0;
        for _ in 0..5 {
            let version = commit(&store, &quota, id, b"v").await;
            assert!(version > last);
            last = version;
        }
        assert_eq!(store.version(id).await, 5);
    }

    #[tokio::test]
    async fn test_commit_isolated_per_topic() {
        let store = store();
        let quota = MemoryQuota::new(1024);
        let logger = store.topic_id("logger").unwrap();
        let system = store.topic_id("system").unwrap();

        commit(&store, &quota, logger, b"a").await;

        assert_eq!(store.version(logger).await, 1);
        assert_eq!(store.version(system).await, 0);
    }

    #[tokio::test]
    async fn test_retired_snapshot_outlives_commits() {
        let store = store();
        let quota = MemoryQuota::new(1024);
        let id = store.topic_id("system").unwrap();

        commit(&store, &quota, id, b"first").await;
        let held = store.acquire_current(id).await.unwrap();

        commit(&store, &quota, id, b"second").await;
        commit(&store, &quota, id, b"third").await;

        assert_eq!(held.version(), 1);
        assert_eq!(held.payload().as_ref(), b"first");
        assert_eq!(store.stats(id).await.unwrap().retired_live, 1);

        let reference = held.downgrade();
        held.release();
        assert!(!reference.is_live());
        assert_eq!(store.stats(id).await.unwrap().retired_live, 0);
        assert_eq!(quota.used(), b"third".len());
    }

    #[tokio::test]
    async fn test_commit_wakes_waiters() {
        let store = store();
        let quota = MemoryQuota::new(1024);
        let id = store.topic_id("logger").unwrap();
        let notify = Arc::new(Notify::new());

        store.register_waiter(id, &notify).await;
        commit(&store, &quota, id, b"x").await;

        // Permit stored by notify_one
        tokio::time::timeout(Duration::from_millis(10), notify.notified())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_waiters_pruned() {
        let store = store();
        let quota = MemoryQuota::new(1024);
        let id = store.topic_id("logger").unwrap();

        let notify = Arc::new(Notify::new());
        store.register_waiter(id, &notify).await;
        assert_eq!(store.stats(id).await.unwrap().waiters, 1);

        drop(notify);
        commit(&store, &quota, id, b"x").await;
        assert_eq!(store.stats(id).await.unwrap().waiters, 0);
    }
}
