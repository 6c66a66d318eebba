//! Dispatcher state machine
//!
//! ```text
//!   Idle ──wait()──► Waiting ──change──► Dispatching ──batch done──► Idle
//!                       │
//!                       └──timeout──► Idle
//! ```

/// Phase of a subscription's dispatch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    /// Not waiting and not dispatching
    Idle,
    /// Suspended until a subscribed topic changes
    Waiting,
    /// Running handlers for a batch of changed topics
    Dispatching,
    /// Shut down
    Closed,
}

impl DispatchPhase {
    /// Move to `Waiting`
    pub fn start_wait(&mut self) {
        if *self == DispatchPhase::Idle {
            *self = DispatchPhase::Waiting;
        }
    }

    /// Move to `Dispatching`
    pub fn start_dispatch(&mut self) {
        if matches!(self, DispatchPhase::Idle | DispatchPhase::Waiting) {
            *self = DispatchPhase::Dispatching;
        }
    }

    /// Return to `Idle`
    pub fn finish(&mut self) {
        if *self != DispatchPhase::Closed {
            *self = DispatchPhase::Idle;
        }
    }

    /// Shut down
    pub fn close(&mut self) {
        *self = DispatchPhase::Closed;
    }
}
