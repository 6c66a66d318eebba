//! Topic store
//!
//! The authoritative per-topic record: current snapshot, version counter,
//! last update time and rate-limiter state.
//!
//! # Architecture
//!
//! ```text
//!                        TopicStore
//!              ┌────────────────────────────┐
//!              │ slots: Vec<TopicSlot {     │
//!              │   writer: Mutex<RateLim>,  │
//!              │   state: RwLock<SlotState>,│
//!              │ }>                         │
//!              └─────────────┬──────────────┘
//!                            │
//!        ┌───────────────────┼───────────────────┐
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//!   [Producer]          [Reader]            [Reader]
//!   commit()            notified()          notified()
//!        │                   │                   │
//!        └──► state.install()──► notify_one() ───┘
//! ```
//!
//! Versions are strictly increasing per topic. Readers may observe several
//! commits as a single change.

pub mod rate_limit;
pub mod slot;
pub mod topic_store;

pub use rate_limit::RateLimiter;
pub use slot::TopicSlot;
pub use topic_store::TopicStore;
