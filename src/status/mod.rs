//! Signed status reports
//!
//! Reads the `system` topic and turns it into a small JSON status message,
//! signed by an external [`StatusSigner`] before it leaves the device.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::broker::ConfigBroker;
use crate::capability::Token;
use crate::error::{BrokerError, HandlerError};
use crate::snapshot::SnapshotHandle;
use crate::topics::system::{SystemConfig, SWITCH_COUNT};

/// Context label status messages are signed under
pub const DEFAULT_CONTEXT: &str = "StatusCX";

/// Signs outbound status messages
pub trait StatusSigner: Send + Sync {
    /// Sign `message` under `context`, returning the signed envelope
    fn sign(&self, context: &str, message: &[u8]) -> Result<Bytes, HandlerError>;
}

/// Errors from [`StatusPublisher`]
#[derive(Debug)]
pub enum StatusError {
    /// Reading the `system` topic failed
    Broker(BrokerError),
    /// The snapshot holds no system record
    NotSystem { topic: String, version: u64 },
    /// The report could not be serialized
    Encode(serde_json::Error),
    /// The signer refused the message
    Signing(HandlerError),
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusError::Broker(e) => write!(f, "{}", e),
            StatusError::NotSystem { topic, version } => {
                write!(f, "{} v{} is not a system record", topic, version)
            }
            StatusError::Encode(e) => write!(f, "Status encoding failed: {}", e),
            StatusError::Signing(e) => write!(f, "Status signing failed: {}", e),
        }
    }
}

impl std::error::Error for StatusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatusError::Broker(e) => Some(e),
            StatusError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BrokerError> for StatusError {
    fn from(err: BrokerError) -> Self {
        StatusError::Broker(err)
    }
}

/// Status message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    #[serde(rename = "Status")]
    status: &'static str,
    switches: [u8; SWITCH_COUNT],
}

impl StatusReport {
    /// Report the switch bank of `config`
    pub fn from_system(config: &SystemConfig) -> Self {
        let mut switches = [0; SWITCH_COUNT];
        for (out, on) in switches.iter_mut().zip(config.switches) {
            *out = u8::from(on);
        }

        Self {
            status: "On",
            switches,
        }
    }

    /// Switch positions as 0/1
    pub fn switches(&self) -> &[u8; SWITCH_COUNT] {
        &self.switches
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// A signed status ready to send
#[derive(Debug, Clone)]
pub struct SignedStatus {
    /// `system` version the report was built from
    pub version: u64,
    /// Unsigned report
    pub report: StatusReport,
    /// Signed envelope
    pub message: Bytes,
}

/// Builds signed status messages from the `system` topic
pub struct StatusPublisher<S> {
    broker: Arc<ConfigBroker>,
    token: Token,
    signer: S,
    context: String,
}

impl<S: StatusSigner> StatusPublisher<S> {
    /// Create a publisher reading through `token`
    pub fn new(broker: Arc<ConfigBroker>, token: Token, signer: S) -> Self {
        Self {
            broker,
            token,
            signer,
            context: DEFAULT_CONTEXT.to_string(),
        }
    }

    /// Set the signing context label
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Sign a status for the current `system` value
    ///
    /// Returns `None` if nothing was published yet.
    pub async fn publish(&self) -> Result<Option<SignedStatus>, StatusError> {
        let handle = match self.broker.acquire_current(&self.token).await? {
            Some(handle) => handle,
            None => return Ok(None),
        };

        let signed = self.sign_snapshot(&handle);
        handle.release();
        signed.map(Some)
    }

    /// Sign a status for a snapshot the caller already holds
    pub fn sign_snapshot(&self, snapshot: &SnapshotHandle) -> Result<SignedStatus, StatusError> {
        let config = snapshot
            .decoded::<SystemConfig>()
            .ok_or_else(|| StatusError::NotSystem {
                topic: snapshot.topic_name().to_string(),
                version: snapshot.version(),
            })?;

        let report = StatusReport::from_system(config);
        let json = report.to_json().map_err(StatusError::Encode)?;
        let message = self
            .signer
            .sign(&self.context, &json)
            .map_err(StatusError::Signing)?;

        tracing::debug!(version = snapshot.version(), bytes = message.len(), "Status signed");

        Ok(SignedStatus {
            version: snapshot.version(),
            report,
            message,
        })
    }

    /// Zero-length message that clears a retained status
    pub fn clear(&self) -> Bytes {
        Bytes::new()
    }
}

impl<S> std::fmt::Debug for StatusPublisher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPublisher")
            .field("token", &self.token)
            .field("context", &self.context)
            .finish()
    }
}
