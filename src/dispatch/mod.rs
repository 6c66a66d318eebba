//! Subscription dispatcher
//!
//! Lets a reader block on a set of topics at once and wakes it with the
//! topics that changed. Each reader owns one [`Subscription`] and drives it
//! from its own task:
//!
//! ```text
//!   ┌──────┐ wait  ┌─────────┐ change ┌─────────────┐
//!   │ Idle │──────►│ Waiting │───────►│ Dispatching │
//!   └──────┘       └─────────┘        └──────┬──────┘
//!      ▲                                     │
//!      └─────────────────────────────────────┘
//! ```
//!
//! For each changed topic, in registration order, the dispatcher acquires
//! the new snapshot, runs the handler, releases the previously held snapshot
//! and records the delivered version. A failing handler is logged and does
//! not stop the batch or the subscription.

pub mod handler;
pub mod state;
pub mod subscription;

pub use handler::{typed, ConfigHandler, Typed};
pub use state::DispatchPhase;
pub use subscription::{Delivery, DispatchReport, Subscription};
