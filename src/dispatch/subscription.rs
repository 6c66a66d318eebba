//! Per-reader subscription and dispatch loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use super::handler::ConfigHandler;
use super::state::DispatchPhase;
use crate::broker::ConfigBroker;
use crate::capability::{Direction, Token};
use crate::error::{BrokerError, Result};
use crate::snapshot::SnapshotHandle;
use crate::topic::TopicId;

/// One topic a reader listens to
struct Entry {
    token: Token,
    name: String,
    handler: Box<dyn ConfigHandler>,
    last_seen: u64,
    held: Option<SnapshotHandle>,
}

/// Outcome of delivering one changed topic
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Topic that changed
    pub topic: TopicId,
    /// Topic name
    pub name: String,
    /// Version last delivered before this batch
    pub previous_version: u64,
    /// Version delivered now
    pub version: u64,
    /// Handler error, if it failed
    pub error: Option<String>,
}

/// Result of one dispatch batch
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Deliveries in registration order
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    /// Whether nothing was delivered (e.g. the wait timed out)
    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Topics delivered in this batch
    pub fn topics(&self) -> Vec<TopicId> {
        self.deliveries.iter().map(|d| d.topic).collect()
    }

    /// Number of handlers that returned an error
    pub fn failures(&self) -> usize {
        self.deliveries.iter().filter(|d| d.error.is_some()).count()
    }
}

/// A reader's subscription to a fixed list of topics
///
/// Owned by exactly one task. Every subscribed topic wakes the same
/// [`Notify`]; a commit stores a permit even if the reader is busy, so no
/// change is missed, and any number of commits before the reader gets to run
/// collapse into a single wake-up. On waking, the subscription compares each
/// topic's version to the last one it delivered and dispatches only the
/// topics that moved, showing their newest value.
pub struct Subscription {
    broker: Arc<ConfigBroker>,
    entries: Vec<Entry>,
    notify: Arc<Notify>,
    phase: DispatchPhase,
    wait_timeout: Option<Duration>,
}

impl Subscription {
    pub(crate) async fn new(
        broker: Arc<ConfigBroker>,
        items: Vec<(Token, Box<dyn ConfigHandler>)>,
    ) -> Result<Self> {
        let notify = Arc::new(Notify::new());
        let mut entries = Vec::with_capacity(items.len());

        for (token, handler) in items {
            let topic = token.topic();
            let name = broker.topic_name(topic).unwrap_or_default().to_string();

            if !broker.check(&token, topic, Direction::Read) {
                tracing::warn!(topic = %name, "Subscription rejected: access denied");
                return Err(BrokerError::AccessDenied {
                    topic: name,
                    direction: Direction::Read,
                });
            }

            entries.push(Entry {
                token,
                name,
                handler,
                last_seen: 0,
                held: None,
            });
        }

        let topics: Vec<TopicId> = entries.iter().map(|e| e.token.topic()).collect();
        for topic in topics {
            broker.store().register_waiter(topic, &notify).await;
        }

        tracing::info!(
            topics = ?entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            "Subscription started"
        );

        let wait_timeout = broker.config().wait_timeout;

        Ok(Self {
            broker,
            entries,
            notify,
            phase: DispatchPhase::Idle,
            wait_timeout,
        })
    }

    /// Current phase of the dispatch loop
    pub fn phase(&self) -> DispatchPhase {
        self.phase
    }

    /// Number of subscribed entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the subscription has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last delivered version of the entry at `index`
    pub fn last_seen(&self, index: usize) -> Option<u64> {
        self.entries.get(index).map(|e| e.last_seen)
    }

    /// Snapshot currently held for the entry at `index`
    pub fn held(&self, index: usize) -> Option<&SnapshotHandle> {
        self.entries.get(index).and_then(|e| e.held.as_ref())
    }

    /// Set the bound applied to each wait by [`run`](Self::run)
    pub fn set_wait_timeout(&mut self, timeout: Option<Duration>) {
        self.wait_timeout = timeout;
    }

    /// Topic and last delivered version of every entry
    fn observed(&self) -> Vec<(TopicId, u64)> {
        self.entries
            .iter()
            .map(|e| (e.token.topic(), e.last_seen))
            .collect()
    }

    /// Suspend until at least one subscribed topic changes
    ///
    /// Returns the changed topics, or an empty list if `timeout` elapsed
    /// first. A timeout is not an error.
    pub async fn wait(&mut self, timeout: Option<Duration>) -> Vec<TopicId> {
        let changed = self.wait_changed(timeout).await;
        self.phase.finish();

        changed
            .into_iter()
            .map(|index| self.entries[index].token.topic())
            .collect()
    }

    async fn wait_changed(&mut self, timeout: Option<Duration>) -> Vec<usize> {
        self.phase.start_wait();
        let deadline = timeout.map(|t| Instant::now() + t);
        let observed = self.observed();
        let broker = Arc::clone(&self.broker);
        let notify = Arc::clone(&self.notify);

        loop {
            let changed = changed_since(&broker, &observed).await;
            if !changed.is_empty() {
                return changed;
            }

            // A permit left by a commit we already delivered just loops back
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notify.notified())
                        .await
                        .is_err()
                    {
                        self.phase.finish();
                        return Vec::new();
                    }
                }
                None => notify.notified().await,
            }
        }
    }

    /// Run handlers for the given entries in registration order
    async fn dispatch(&mut self, mut changed: Vec<usize>) -> DispatchReport {
        self.phase.start_dispatch();
        changed.sort_unstable();

        let broker = Arc::clone(&self.broker);
        let mut report = DispatchReport::default();

        for index in changed {
            let entry = &mut self.entries[index];
            let topic = entry.token.topic();

            // Acquire the new snapshot before giving up the old one
            let handle = match broker.store().acquire_current(topic).await {
                Some(handle) => handle,
                None => {
                    tracing::error!(
                        topic = %entry.name,
                        last_seen = entry.last_seen,
                        "Changed topic has no current snapshot"
                    );
                    continue;
                }
            };

            let version = handle.version();
            if version == entry.last_seen {
                continue;
            }

            let error = match entry.handler.on_update(&handle) {
                Ok(()) => None,
                Err(err) => {
                    tracing::warn!(
                        topic = %entry.name,
                        version = version,
                        error = %err,
                        "Handler failed"
                    );
                    Some(err.to_string())
                }
            };

            if let Some(previous) = entry.held.replace(handle) {
                previous.release();
            }

            tracing::debug!(
                topic = %entry.name,
                from = entry.last_seen,
                to = version,
                "Dispatched"
            );

            report.deliveries.push(Delivery {
                topic,
                name: entry.name.clone(),
                previous_version: entry.last_seen,
                version,
                error,
            });
            entry.last_seen = version;
        }

        self.phase.finish();
        report
    }

    /// Run one wait-and-dispatch cycle
    ///
    /// Returns an empty report if `timeout` elapsed with no change.
    pub async fn next_batch(&mut self, timeout: Option<Duration>) -> DispatchReport {
        let changed = self.wait_changed(timeout).await;
        if changed.is_empty() {
            return DispatchReport::default();
        }
        self.dispatch(changed).await
    }

    /// Dispatch forever
    ///
    /// This is the entry point a consumer task calls once at startup.
    pub async fn run(mut self) {
        loop {
            let timeout = self.wait_timeout;
            self.next_batch(timeout).await;
        }
    }

    /// Dispatch until `shutdown` completes
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let timeout = self.wait_timeout;
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(topics = self.entries.len(), "Subscription shut down");
                    self.close();
                    return;
                }
                _ = self.next_batch(timeout) => {}
            }
        }
    }

    /// Stop dispatching and release every held snapshot
    pub fn close(&mut self) {
        self.phase.close();
        for entry in &mut self.entries {
            if let Some(held) = entry.held.take() {
                held.release();
            }
        }
    }
}

/// Indices of `observed` entries whose topic version has moved
async fn changed_since(broker: &ConfigBroker, observed: &[(TopicId, u64)]) -> Vec<usize> {
    let mut changed = Vec::new();

    for (index, (topic, last_seen)) in observed.iter().enumerate() {
        if broker.store().version(*topic).await != *last_seen {
            changed.push(index);
        }
    }

    changed
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field(
                "topics",
                &self.entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            )
            .field("phase", &self.phase)
            .finish()
    }
}
