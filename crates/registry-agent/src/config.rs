//! Agent configuration from command line and environment.
//!
//! Every option can be set through its environment variable; flags win over
//! the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use registry_client::RegistryClientConfig;

/// Smallest heartbeat interval accepted, in milliseconds.
pub const MIN_HEARTBEAT_INTERVAL_MS: u64 = 1_000;

/// Registry agent CLI
#[derive(Parser, Debug, Clone)]
#[command(name = "registry-agent")]
#[command(about = "Registers a service with the registry office over AMQP", long_about = None)]
#[command(version)]
pub struct AgentConfig {
    /// AMQP broker URI
    #[arg(long, env = "AMQP_URL", value_parser = parse_amqp_url)]
    pub amqp_url: String,

    /// Name this service registers under
    #[arg(long, env = "SERVICE_NAME", value_parser = parse_non_empty)]
    pub service_name: String,

    /// Version this service registers under
    #[arg(long, env = "SERVICE_VERSION", value_parser = parse_non_empty)]
    pub service_version: String,

    /// Milliseconds between heartbeats
    #[arg(
        long,
        env = "HEARTBEAT_INTERVAL",
        default_value_t = 10_000,
        value_parser = clap::value_parser!(u64).range(MIN_HEARTBEAT_INTERVAL_MS..)
    )]
    pub heartbeat_interval: u64,

    /// Queue heartbeats are published to
    #[arg(long, env = "API_QUEUE", default_value = "api_services_queue")]
    pub api_queue: String,

    /// Queue consumed for registry requests
    #[arg(long, env = "REGISTRY_QUEUE", default_value = "registry_office")]
    pub registry_queue: String,

    /// JSON file served as the API description
    #[arg(long, env = "API_DESCRIPTION_PATH")]
    pub api_description: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "REGISTRY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "REGISTRY_LOG_JSON")]
    pub log_json: bool,
}

impl AgentConfig {
    /// Client configuration for these settings.
    #[must_use]
    pub fn client_config(&self) -> RegistryClientConfig {
        RegistryClientConfig::new(&self.amqp_url, &self.service_name, &self.service_version)
            .with_heartbeat_interval(Duration::from_millis(self.heartbeat_interval))
            .with_api_queue(&self.api_queue)
            .with_registry_queue(&self.registry_queue)
    }
}

fn parse_amqp_url(value: &str) -> Result<String, String> {
    let Some((scheme, rest)) = value.split_once("://") else {
        return Err(format!("'{value}' is not a URI"));
    };
    if scheme != "amqp" && scheme != "amqps" {
        return Err(format!("unsupported scheme '{scheme}', expected amqp or amqps"));
    }
    if rest.is_empty() {
        return Err("missing broker host".into());
    }
    Ok(value.to_string())
}

fn parse_non_empty(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("must not be empty".into());
    }
    Ok(value.to_string())
}
