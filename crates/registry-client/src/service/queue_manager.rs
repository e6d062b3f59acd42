//! # Queue Manager
//!
//! Owns the broker connection and its single channel, and guarantees the
//! durable queues the protocol needs exist before traffic flows.
//!
//! Lifecycle: `new` → `initialize` → `ensure_queues` → (traffic) → `close`.

use std::sync::Arc;

use parking_lot::Mutex;
use registry_types::fixed_queues;
use tracing::{debug, info, warn};

use crate::domain::RegistryError;
use crate::ports::{BrokerChannel, BrokerConnection, BrokerConnector, QueueOptions};

/// Broker connection and queue lifecycle for one service.
///
/// The channel is handed out by reference through [`QueueManager::channel`];
/// the manager remains the only party that tears it down.
pub struct QueueManager {
    broker_url: String,
    service_name: String,
    connector: Arc<dyn BrokerConnector>,
    connection: Mutex<Option<Box<dyn BrokerConnection>>>,
    channel: Mutex<Option<Arc<dyn BrokerChannel>>>,
}

impl QueueManager {
    /// Create a manager. Fails immediately if either parameter is empty.
    pub fn new(
        broker_url: impl Into<String>,
        service_name: impl Into<String>,
        connector: Arc<dyn BrokerConnector>,
    ) -> Result<Self, RegistryError> {
        let broker_url = broker_url.into();
        let service_name = service_name.into();

        if broker_url.trim().is_empty() {
            return Err(RegistryError::Configuration { field: "broker_url" });
        }
        if service_name.trim().is_empty() {
            return Err(RegistryError::Configuration {
                field: "service_name",
            });
        }

        Ok(Self {
            broker_url,
            service_name,
            connector,
            connection: Mutex::new(None),
            channel: Mutex::new(None),
        })
    }

    /// Connect to the broker and open one channel.
    ///
    /// Connection failures propagate as [`RegistryError::Connection`]; there is
    /// no retry.
    pub async fn initialize(&self) -> Result<(), RegistryError> {
        if self.is_initialized() {
            return Err(RegistryError::AlreadyInitialized);
        }

        let connection = self
            .connector
            .connect(&self.broker_url)
            .await
            .map_err(RegistryError::Connection)?;

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                // Don't leak the half-open connection
                if let Err(close_err) = connection.close().await {
                    warn!(error = %close_err, "Failed to close connection after channel error");
                }
                return Err(RegistryError::Connection(e));
            }
        };

        *self.connection.lock() = Some(connection);
        *self.channel.lock() = Some(channel);

        info!(service = %self.service_name, "Connected to broker");
        Ok(())
    }

    /// Declare the fixed queues, then every queue in `extra`, all durable.
    ///
    /// Re-declaring an existing queue is a no-op at the broker.
    pub async fn ensure_queues(&self, extra: &[String]) -> Result<(), RegistryError> {
        let channel = self.channel()?;

        for queue in self.fixed_queues().iter().chain(extra) {
            channel
                .assert_queue(queue, QueueOptions::durable())
                .await
                .map_err(RegistryError::Transport)?;
            debug!(queue = %queue, "Queue ensured");
        }

        info!(
            service = %self.service_name,
            queues = 2 + extra.len(),
            "Queues ensured"
        );
        Ok(())
    }

    /// The active channel.
    pub fn channel(&self) -> Result<Arc<dyn BrokerChannel>, RegistryError> {
        self.channel
            .lock()
            .as_ref()
            .map(Arc::clone)
            .ok_or(RegistryError::NotInitialized)
    }

    /// True between a successful `initialize` and `close`.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.channel.lock().is_some()
    }

    /// `workflow` and `<service_name>.registry`.
    #[must_use]
    pub fn fixed_queues(&self) -> [String; 2] {
        fixed_queues(&self.service_name)
    }

    /// Service name this manager was created for.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Release the channel, then the connection.
    ///
    /// Each is released at most once; calling this when nothing was ever
    /// opened is a no-op. Both are attempted even if the first fails, and the
    /// first failure is returned.
    pub async fn close(&self) -> Result<(), RegistryError> {
        let channel = self.channel.lock().take();
        let connection = self.connection.lock().take();

        let mut first_error = None;

        if let Some(channel) = channel {
            if let Err(e) = channel.close().await {
                warn!(error = %e, "Failed to close channel");
                first_error.get_or_insert(RegistryError::Transport(e));
            }
        }

        if let Some(connection) = connection {
            if let Err(e) = connection.close().await {
                warn!(error = %e, "Failed to close connection");
                first_error.get_or_insert(RegistryError::Transport(e));
            }
            info!(service = %self.service_name, "Broker connection closed");
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
