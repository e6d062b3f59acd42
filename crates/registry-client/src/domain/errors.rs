//! Domain Errors for the Registry Client
//!
//! Setup-time failures propagate to the caller through these. Steady-state
//! failures on the consumer or timer never do; they become `Error` events
//! (see `registry_types::ProtocolError`).

use crate::ports::TransportError;
use thiserror::Error;

/// Errors returned by `QueueManager` and `RegistryClient` operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A required construction parameter was missing or empty.
    #[error("Missing required configuration: {field}")]
    Configuration { field: &'static str },

    /// A construction parameter was present but unusable.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// The broker was unreachable or refused the connection.
    #[error("Broker connection failed: {0}")]
    Connection(#[source] TransportError),

    /// Operation requires `init()` / `initialize()` first.
    #[error("Not initialized: call init() first")]
    NotInitialized,

    /// `init()` / `initialize()` was already called.
    #[error("Already initialized")]
    AlreadyInitialized,

    /// The client has been closed.
    #[error("Client is closed")]
    Closed,

    /// The heartbeat timer is already armed.
    #[error("Heartbeat already active: call stop_heartbeat() first")]
    HeartbeatAlreadyActive,

    /// A broker operation failed after setup.
    #[error("Broker operation failed: {0}")]
    Transport(#[source] TransportError),

    /// An outbound payload could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
