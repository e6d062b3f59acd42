//! # Error Types
//!
//! Recoverable protocol failures. These never abort the consumer loop or the
//! heartbeat timer; they travel to the caller inside an `Error` event.

use thiserror::Error;

/// Steady-state failures surfaced through the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Inbound body was not valid JSON. The message is rejected without requeue.
    #[error("Malformed inbound message: {reason}")]
    MessageParse { reason: String },

    /// The broker refused an ack or nack for a delivery.
    #[error("Failed to settle delivery {delivery_tag}: {reason}")]
    Acknowledgement { delivery_tag: u64, reason: String },

    /// A heartbeat fired by the timer could not be published.
    #[error("Heartbeat failed: {reason}")]
    HeartbeatFailed { reason: String },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::MessageParse {
            reason: err.to_string(),
        }
    }
}
