//! Per-topic minimum-interval gate

use std::time::Duration;

use tokio::time::Instant;

/// Tracks the last accepted update of a topic
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_accepted: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter that admits one update per `min_interval`
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
        }
    }

    /// Check whether an update at `now` may proceed
    ///
    /// On rejection returns how long the caller has to wait.
    pub fn check(&self, now: Instant) -> Result<(), Duration> {
        match self.last_accepted {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed >= self.min_interval {
                    Ok(())
                } else {
                    Err(self.min_interval - elapsed)
                }
            }
            None => Ok(()),
        }
    }

    /// Record an accepted update
    pub fn record(&mut self, now: Instant) {
        self.last_accepted = Some(now);
    }

    /// Minimum interval between accepted updates
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time of the last accepted update
    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }
}
