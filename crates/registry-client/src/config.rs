//! # Client Configuration
//!
//! Identity, addressing and timing for a `RegistryClient`. All timeouts and
//! queue names have defaults; broker URL, service name and version do not.

use crate::domain::RegistryError;
use registry_types::{QueueAddressing, ServiceIdentity, DEFAULT_API_QUEUE, DEFAULT_REGISTRY_QUEUE};
use std::time::Duration;

/// Spacing between heartbeats when none is configured.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(10_000);

/// Recognized client options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Spacing between heartbeats.
    pub heartbeat_interval: Duration,
    /// Destination for heartbeats.
    pub api_queue: String,
    /// Queue consumed for registry requests; API descriptions are published here.
    pub registry_queue: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            api_queue: DEFAULT_API_QUEUE.to_string(),
            registry_queue: DEFAULT_REGISTRY_QUEUE.to_string(),
        }
    }
}

/// Complete construction parameters for a `RegistryClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryClientConfig {
    /// AMQP URI of the broker.
    pub broker_url: String,
    /// Name this service registers under.
    pub service_name: String,
    /// Version this service registers under.
    pub version: String,
    /// Optional settings.
    pub options: ClientOptions,
}

impl RegistryClientConfig {
    /// Required parameters with default options.
    pub fn new(
        broker_url: impl Into<String>,
        service_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            broker_url: broker_url.into(),
            service_name: service_name.into(),
            version: version.into(),
            options: ClientOptions::default(),
        }
    }

    /// Override the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.options.heartbeat_interval = interval;
        self
    }

    /// Override the API queue name.
    #[must_use]
    pub fn with_api_queue(mut self, queue: impl Into<String>) -> Self {
        self.options.api_queue = queue.into();
        self
    }

    /// Override the registry queue name.
    #[must_use]
    pub fn with_registry_queue(mut self, queue: impl Into<String>) -> Self {
        self.options.registry_queue = queue.into();
        self
    }

    /// Fail fast on missing or unusable parameters.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.broker_url.trim().is_empty() {
            return Err(RegistryError::Configuration { field: "broker_url" });
        }
        if self.service_name.trim().is_empty() {
            return Err(RegistryError::Configuration {
                field: "service_name",
            });
        }
        if self.version.trim().is_empty() {
            return Err(RegistryError::Configuration { field: "version" });
        }
        if self.options.heartbeat_interval.is_zero() {
            return Err(RegistryError::InvalidConfiguration {
                reason: "heartbeat_interval must be greater than zero".into(),
            });
        }
        if self.options.api_queue.is_empty() || self.options.registry_queue.is_empty() {
            return Err(RegistryError::InvalidConfiguration {
                reason: "queue names must not be empty".into(),
            });
        }
        Ok(())
    }

    /// The identity embedded in every outbound message.
    #[must_use]
    pub fn identity(&self) -> ServiceIdentity {
        ServiceIdentity::new(&self.service_name, &self.version)
    }

    /// The queues this configuration uses.
    #[must_use]
    pub fn queues(&self) -> QueueAddressing {
        QueueAddressing::new(
            &self.service_name,
            &self.options.api_queue,
            &self.options.registry_queue,
        )
    }
}
