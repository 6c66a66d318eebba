//! Statistics for topics and updates

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::ErrorKind;

/// Update outcome counters for one topic
#[derive(Debug, Default)]
pub struct UpdateCounters {
    accepted: AtomicU64,
    access_denied: AtomicU64,
    rate_limited: AtomicU64,
    malformed: AtomicU64,
    out_of_range: AtomicU64,
    allocation_failures: AtomicU64,
}

impl UpdateCounters {
    /// Count an accepted update
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a rejected update
    pub fn record_rejected(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::AccessDenied => &self.access_denied,
            ErrorKind::RateLimited => &self.rate_limited,
            ErrorKind::Malformed => &self.malformed,
            ErrorKind::OutOfRange => &self.out_of_range,
            ErrorKind::AllocationFailure => &self.allocation_failures,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy
    pub fn snapshot(&self) -> UpdateStats {
        UpdateStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            access_denied: self.access_denied.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            out_of_range: self.out_of_range.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
        }
    }
}

/// Update outcome totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Updates committed
    pub accepted: u64,
    /// Updates presented with a token that did not match
    pub access_denied: u64,
    /// Updates rejected by the rate limiter
    pub rate_limited: u64,
    /// Updates that failed to parse
    pub malformed: u64,
    /// Updates with a field outside its legal range
    pub out_of_range: u64,
    /// Updates that could not be allocated
    pub allocation_failures: u64,
}

impl UpdateStats {
    /// Total rejected updates
    pub fn rejected(&self) -> u64 {
        self.access_denied
            + self.rate_limited
            + self.malformed
            + self.out_of_range
            + self.allocation_failures
    }
}

/// Statistics for a topic
#[derive(Debug, Clone)]
pub struct TopicStats {
    /// Topic name
    pub name: String,
    /// Current version (0 = never published)
    pub version: u64,
    /// Size of the current payload in bytes
    pub current_size: usize,
    /// Time since the last accepted update
    pub since_last_update: Option<Duration>,
    /// Superseded snapshots still held by readers
    pub retired_live: usize,
    /// Subscriptions registered for change notifications
    pub waiters: usize,
    /// Update outcome totals
    pub updates: UpdateStats,
}
