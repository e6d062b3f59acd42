//! # Registry Agent
//!
//! Registers one service with the registry office and keeps it registered
//! until interrupted.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (flags/env)
//! 2. Initialize logging
//! 3. Load the API description
//! 4. Connect, declare queues, start heartbeats
//! 5. Run until Ctrl+C or SIGTERM, then close

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use registry_agent::{init_logging, load_description, AgentConfig, AgentRuntime};
use registry_client::{AmqpConnector, RegistryClient};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AgentConfig::parse();

    init_logging(&config.log_level, config.log_json)?;

    let description = load_description(config.api_description.as_deref())?;

    let connector = AmqpConnector::new().with_connection_name(format!(
        "{}@{}",
        config.service_name, config.service_version
    ));
    let client = RegistryClient::new(config.client_config(), Arc::new(connector))
        .context("Invalid client configuration")?;

    info!(
        service = %config.service_name,
        version = %config.service_version,
        interval_ms = config.heartbeat_interval,
        "Starting registry agent"
    );

    let mut runtime = AgentRuntime::new(Arc::new(client), description);
    runtime
        .start()
        .await
        .context("Failed to start registry client")?;

    info!("Agent is running. Press Ctrl+C to stop.");
    shutdown_signal().await?;

    runtime.shutdown().await.context("Failed to close registry client")?;
    Ok(())
}

/// Resolve on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    Ok(())
}
