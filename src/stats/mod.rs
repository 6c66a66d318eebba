//! Broker statistics

pub mod metrics;

pub use metrics::{TopicStats, UpdateCounters, UpdateStats};
