//! # Agent Runtime
//!
//! Drives one registry client for the lifetime of the process.
//!
//! ## Startup Sequence
//!
//! 1. Subscribe to client events
//! 2. `init` (connect, declare queues, consume)
//! 3. Start the heartbeat
//! 4. Spawn the event loop
//!
//! ## Shutdown Sequence
//!
//! 1. Signal the event loop and wait for it
//! 2. Close the client (heartbeat, channel, connection)

use std::sync::Arc;
use std::time::Duration;

use registry_bus::{EventFilter, RegistryEvent, Subscription};
use registry_client::{RegistryApi, RegistryError};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long shutdown waits for the event loop to finish its current event.
const EVENT_LOOP_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Owns the client and the task answering its events.
pub struct AgentRuntime {
    api: Arc<dyn RegistryApi>,
    description: Value,
    shutdown_tx: watch::Sender<bool>,
    event_loop: Option<JoinHandle<()>>,
}

impl AgentRuntime {
    pub fn new(api: Arc<dyn RegistryApi>, description: Value) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            api,
            description,
            shutdown_tx,
            event_loop: None,
        }
    }

    /// Bring the client up and start answering requests.
    pub async fn start(&mut self) -> Result<(), RegistryError> {
        // Subscribe first so nothing emitted during init is missed
        let events = self.api.subscribe(EventFilter::all());

        self.api.init().await?;
        self.api.start_heartbeat().await?;

        self.event_loop = Some(tokio::spawn(run_event_loop(
            Arc::clone(&self.api),
            events,
            self.description.clone(),
            self.shutdown_tx.subscribe(),
        )));

        info!("Registry agent started");
        Ok(())
    }

    /// Stop the event loop and close the client.
    pub async fn shutdown(&mut self) -> Result<(), RegistryError> {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            debug!("Event loop already gone: {}", e);
        }
        if let Some(handle) = self.event_loop.take() {
            if tokio::time::timeout(EVENT_LOOP_DRAIN_TIMEOUT, handle).await.is_err() {
                warn!("Event loop did not stop in time");
            }
        }

        self.api.close().await?;
        info!("Shutdown complete");
        Ok(())
    }
}

/// Answer description requests and log everything else until shutdown.
pub async fn run_event_loop(
    api: Arc<dyn RegistryApi>,
    mut events: Subscription,
    description: Value,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                info!("Shutdown signal received");
                break;
            }
            event = events.recv() => match event {
                Some(event) => handle_event(api.as_ref(), &description, event).await,
                None => break,
            }
        }
    }
}

async fn handle_event(api: &dyn RegistryApi, description: &Value, event: RegistryEvent) {
    match event {
        RegistryEvent::ApiDescriptionRequest(request) => {
            info!(
                request_id = request.id.as_deref().unwrap_or("-"),
                "Answering API description request"
            );
            if let Err(e) = api.send_api_description(description.clone()).await {
                error!(error = %e, "Failed to send API description");
            }
        }
        RegistryEvent::HeartbeatSent(message) => {
            debug!(id = %message.id, timestamp = %message.timestamp, "Heartbeat sent");
        }
        RegistryEvent::ApiDescriptionSent(message) => {
            info!(id = %message.id, "API description sent");
        }
        RegistryEvent::Error(e) => {
            warn!(error = %e, "Registry protocol error");
        }
    }
}
