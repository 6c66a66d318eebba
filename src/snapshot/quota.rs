//! Memory quota for live snapshots
//!
//! Every snapshot reserves its payload size when it is created and returns
//! it when it is destroyed, so the total held by current, retired and
//! reader-held snapshots together is bounded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Broker-wide byte budget for snapshot payloads
#[derive(Debug)]
pub struct MemoryQuota {
    limit: usize,
    used: AtomicUsize,
}

impl MemoryQuota {
    /// Create a quota of `limit` bytes
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            limit,
            used: AtomicUsize::new(0),
        })
    }

    /// Reserve `bytes`
    ///
    /// Returns the number of bytes still available if the reservation does
    /// not fit.
    pub fn reserve(self: &Arc<Self>, bytes: usize) -> Result<Reservation, usize> {
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            let available = self.limit.saturating_sub(used);
            if bytes > available {
                return Err(available);
            }

            match self.used.compare_exchange_weak(
                used,
                used + bytes,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Ok(Reservation {
                        quota: Arc::clone(self),
                        bytes,
                    })
                }
                Err(actual) => used = actual,
            }
        }
    }

    /// Bytes currently reserved
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// Bytes still available
    pub fn available(&self) -> usize {
        self.limit.saturating_sub(self.used())
    }

    /// Total budget
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Bytes held against a [`MemoryQuota`], returned on drop
#[derive(Debug)]
pub struct Reservation {
    quota: Arc<MemoryQuota>,
    bytes: usize,
}

impl Reservation {
    /// Reserved size
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.quota.used.fetch_sub(self.bytes, Ordering::AcqRel);
    }
}
