//! Broker error types
//!
//! Every failure is returned to the immediate caller. A failed update never
//! affects the state of any other topic.

use std::time::Duration;

use crate::capability::Direction;

/// Result type for broker operations
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Error returned by consumer handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Flat classification of [`BrokerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AccessDenied,
    RateLimited,
    Malformed,
    OutOfRange,
    AllocationFailure,
    AcquireOnDestroyed,
    TimedOut,
    UnknownTopic,
}

/// Error type for broker operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Token does not grant `direction` on `topic`
    AccessDenied { topic: String, direction: Direction },
    /// Update arrived before the topic's minimum interval elapsed
    RateLimited { topic: String, retry_after: Duration },
    /// Payload could not be parsed
    Malformed { topic: String, reason: String },
    /// Payload parsed but a field is outside its legal range
    OutOfRange { topic: String, reason: String },
    /// Snapshot could not be allocated within the broker's limits
    AllocationFailure {
        topic: String,
        requested: usize,
        available: usize,
    },
    /// A snapshot was acquired after its last owner released it
    AcquireOnDestroyed { topic: String, version: u64 },
    /// Caller-supplied timeout elapsed before the operation committed
    TimedOut { topic: String },
    /// No route or topic with this name
    UnknownTopic(String),
}

impl BrokerError {
    /// Get the error classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrokerError::AccessDenied { .. } => ErrorKind::AccessDenied,
            BrokerError::RateLimited { .. } => ErrorKind::RateLimited,
            BrokerError::Malformed { .. } => ErrorKind::Malformed,
            BrokerError::OutOfRange { .. } => ErrorKind::OutOfRange,
            BrokerError::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            BrokerError::AcquireOnDestroyed { .. } => ErrorKind::AcquireOnDestroyed,
            BrokerError::TimedOut { .. } => ErrorKind::TimedOut,
            BrokerError::UnknownTopic(_) => ErrorKind::UnknownTopic,
        }
    }

    /// Whether resubmitting the same request later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrokerError::RateLimited { .. } | BrokerError::TimedOut { .. }
        )
    }

    pub(crate) fn from_decode(topic: &str, err: DecodeError) -> Self {
        match err {
            DecodeError::Malformed(reason) => BrokerError::Malformed {
                topic: topic.to_string(),
                reason,
            },
            DecodeError::OutOfRange(reason) => BrokerError::OutOfRange {
                topic: topic.to_string(),
                reason,
            },
        }
    }
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerError::AccessDenied { topic, direction } => {
                write!(f, "Access denied: {} on {}", direction, topic)
            }
            BrokerError::RateLimited { topic, retry_after } => write!(
                f,
                "Rate limited: {} (retry after {}ms)",
                topic,
                retry_after.as_millis()
            ),
            BrokerError::Malformed { topic, reason } => {
                write!(f, "Malformed update for {}: {}", topic, reason)
            }
            BrokerError::OutOfRange { topic, reason } => {
                write!(f, "Out of range update for {}: {}", topic, reason)
            }
            BrokerError::AllocationFailure {
                topic,
                requested,
                available,
            } => write!(
                f,
                "Allocation failure for {}: requested {} bytes, {} available",
                topic, requested, available
            ),
            BrokerError::AcquireOnDestroyed { topic, version } => {
                write!(f, "Acquire on destroyed snapshot: {} v{}", topic, version)
            }
            BrokerError::TimedOut { topic } => write!(f, "Timed out: {}", topic),
            BrokerError::UnknownTopic(name) => write!(f, "Unknown topic: {}", name),
        }
    }
}

impl std::error::Error for BrokerError {}

/// Error returned by a topic decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Syntactically invalid input
    Malformed(String),
    /// Well-formed input with a value outside its declared range
    OutOfRange(String),
}

impl DecodeError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        DecodeError::Malformed(reason.into())
    }

    pub fn out_of_range(reason: impl Into<String>) -> Self {
        DecodeError::OutOfRange(reason.into())
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Malformed(reason) => write!(f, "Malformed: {}", reason),
            DecodeError::OutOfRange(reason) => write!(f, "Out of range: {}", reason),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Malformed(err.to_string())
    }
}

/// Error raised while wiring topics and grants at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Topic declared twice
    DuplicateTopic(String),
    /// Grant requested for an undeclared topic
    UnknownTopic(String),
    /// Topic name is empty, too long or uses disallowed characters
    InvalidTopicName(String),
    /// Second write grant requested for a single-writer topic
    WriterAlreadyGranted(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::DuplicateTopic(name) => write!(f, "Topic declared twice: {}", name),
            ConfigError::UnknownTopic(name) => write!(f, "Topic not declared: {}", name),
            ConfigError::InvalidTopicName(name) => write!(f, "Invalid topic name: {:?}", name),
            ConfigError::WriterAlreadyGranted(name) => {
                write!(f, "Single-writer topic already has a writer: {}", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
