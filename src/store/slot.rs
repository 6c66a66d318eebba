//! Per-topic slot
//!
//! A slot holds everything the store knows about one topic: the current
//! snapshot and its version, snapshots that were superseded but are still
//! held by readers, the subscriptions waiting for changes, and the writer
//! lock that serializes updates.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::Instant;

use super::rate_limit::RateLimiter;
use crate::snapshot::Snapshot;
use crate::stats::UpdateCounters;
use crate::topic::{TopicId, TopicSpec};

/// Mutable state of a topic, guarded by the slot's `RwLock`
#[derive(Debug, Default)]
pub(crate) struct SlotState {
    /// Current snapshot (`None` until the first commit)
    pub current: Option<Arc<Snapshot>>,

    /// Version of `current` (0 = never published)
    pub version: u64,

    /// When `current` was committed
    pub last_update: Option<Instant>,

    /// Superseded snapshots, alive only while a reader holds them
    pub retired: Vec<Weak<Snapshot>>,

    /// Subscriptions to wake on commit
    pub waiters: Vec<Weak<Notify>>,
}

impl SlotState {
    /// Install `snapshot` as current and retire the previous one
    pub fn install(&mut self, snapshot: Arc<Snapshot>) {
        self.version = snapshot.version();
        self.last_update = Some(snapshot.created_at());

        if let Some(previous) = self.current.replace(snapshot) {
            self.retired.push(Arc::downgrade(&previous));
        }

        self.retired.retain(|w| w.strong_count() > 0);
    }

    /// Wake every live waiter, dropping those whose subscription is gone
    ///
    /// Returns the number of waiters notified.
    pub fn notify_waiters(&mut self) -> usize {
        let mut woken = 0;
        self.waiters.retain(|w| match w.upgrade() {
            Some(notify) => {
                notify.notify_one();
                woken += 1;
                true
            }
            None => false,
        });
        woken
    }

    /// Number of retired snapshots still alive
    pub fn retired_live(&self) -> usize {
        self.retired.iter().filter(|w| w.strong_count() > 0).count()
    }
}

/// Entry for a single topic in the store
#[derive(Debug)]
pub struct TopicSlot {
    pub(crate) id: TopicId,

    pub(crate) name: Arc<str>,

    pub(crate) spec: TopicSpec,

    /// Topic-local writer lock; also owns the rate-limiter state
    pub(crate) writer: Mutex<RateLimiter>,

    pub(crate) state: RwLock<SlotState>,

    pub(crate) counters: UpdateCounters,
}

impl TopicSlot {
    pub(crate) fn new(id: TopicId, spec: TopicSpec, default_interval: Duration) -> Self {
        let min_interval = spec.min_interval.unwrap_or(default_interval);

        Self {
            id,
            name: Arc::from(spec.name.as_str()),
            spec,
            writer: Mutex::new(RateLimiter::new(min_interval)),
            state: RwLock::new(SlotState::default()),
            counters: UpdateCounters::default(),
        }
    }

    /// Topic id
    pub fn id(&self) -> TopicId {
        self.id
    }

    /// Topic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static declaration
    pub fn spec(&self) -> &TopicSpec {
        &self.spec
    }
}
