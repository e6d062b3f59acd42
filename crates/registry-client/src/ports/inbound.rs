//! # Driving Ports (Inbound API)
//!
//! The operations a host service uses to take part in the registration
//! protocol.

use crate::domain::RegistryError;
use async_trait::async_trait;
use registry_bus::{EventFilter, Subscription};
use registry_types::ProtocolMessage;
use serde_json::Value;

/// Primary API of the registry client.
///
/// # Example
///
/// ```rust,ignore
/// use registry_client::ports::RegistryApi;
///
/// async fn answer<T: RegistryApi>(api: &T) -> Result<(), RegistryError> {
///     api.send_api_description(serde_json::json!({ "endpoints": [] })).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Connect, declare queues and start consuming registry requests.
    ///
    /// Must complete before any send. Does not start the heartbeat.
    async fn init(&self) -> Result<(), RegistryError>;

    /// Publish one heartbeat to the API queue.
    async fn send_heartbeat(&self) -> Result<ProtocolMessage, RegistryError>;

    /// Publish an API description to the registry queue.
    ///
    /// `description` is embedded verbatim.
    async fn send_api_description(&self, description: Value)
        -> Result<ProtocolMessage, RegistryError>;

    /// Send a heartbeat now, then every configured interval.
    async fn start_heartbeat(&self) -> Result<(), RegistryError>;

    /// Cancel periodic heartbeats. No-op when none are running.
    fn stop_heartbeat(&self);

    /// Stop the heartbeat and release the broker connection. Idempotent.
    async fn close(&self) -> Result<(), RegistryError>;

    /// Register an event listener.
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}
