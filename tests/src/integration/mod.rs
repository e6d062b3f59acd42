//! Cross-crate scenarios: client, event bus and wire types together.

pub mod heartbeat_schedule;
pub mod lifecycle;
pub mod protocol_flows;

use registry_client::testing::InMemoryBroker;
use registry_client::{RegistryClient, RegistryClientConfig};
use std::time::Duration;

/// The `invoicing` service on `apiQ`/`regQ` with a 5 s heartbeat.
pub fn invoicing_config() -> RegistryClientConfig {
    RegistryClientConfig::new("amqp://localhost", "invoicing", "1.0.0")
        .with_heartbeat_interval(Duration::from_millis(5_000))
        .with_api_queue("apiQ")
        .with_registry_queue("regQ")
}

/// A client for `config` on `broker`, already initialized.
pub async fn started_client(broker: &InMemoryBroker, config: RegistryClientConfig) -> RegistryClient {
    let client = match RegistryClient::new(config, broker.connector()) {
        Ok(client) => client,
        Err(e) => panic!("client construction failed: {e}"),
    };
    if let Err(e) = client.init().await {
        panic!("client init failed: {e}");
    }
    client
}
