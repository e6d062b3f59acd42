//! # Queue Addressing
//!
//! Names of the durable queues the protocol depends on.

use serde::{Deserialize, Serialize};

/// Reserved internal queue. Always declared, unused by the protocol itself.
pub const WORKFLOW_QUEUE: &str = "workflow";

/// Suffix of the per-service reserved queue.
pub const SERVICE_QUEUE_SUFFIX: &str = ".registry";

/// Default queue for heartbeats and description-request traffic.
pub const DEFAULT_API_QUEUE: &str = "api_services_queue";

/// Default queue the agent consumes for registry-originated requests.
pub const DEFAULT_REGISTRY_QUEUE: &str = "registry_office";

/// The two queues every agent declares regardless of configuration:
/// `workflow` and `<service_name>.registry`, in that order.
#[must_use]
pub fn fixed_queues(service_name: &str) -> [String; 2] {
    [WORKFLOW_QUEUE.to_string(), service_queue(service_name)]
}

fn service_queue(service_name: &str) -> String {
    format!("{service_name}{SERVICE_QUEUE_SUFFIX}")
}

/// The full set of queues a client uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueAddressing {
    /// `<service_name>.registry`
    pub service_queue: String,
    /// Outbound queue for heartbeats.
    pub api_queue: String,
    /// Inbound queue this agent consumes.
    pub registry_queue: String,
}

impl QueueAddressing {
    /// Build the addressing for a service.
    pub fn new(
        service_name: &str,
        api_queue: impl Into<String>,
        registry_queue: impl Into<String>,
    ) -> Self {
        Self {
            service_queue: service_queue(service_name),
            api_queue: api_queue.into(),
            registry_queue: registry_queue.into(),
        }
    }

    /// The fixed queues, declared before any caller-supplied ones.
    #[must_use]
    pub fn fixed(&self) -> [String; 2] {
        [WORKFLOW_QUEUE.to_string(), self.service_queue.clone()]
    }

    /// The caller-configured queues, in declaration order.
    #[must_use]
    pub fn configured(&self) -> [String; 2] {
        [self.api_queue.clone(), self.registry_queue.clone()]
    }

    /// Every queue in declaration order: fixed first, then configured.
    #[must_use]
    pub fn all(&self) -> Vec<String> {
        self.fixed().into_iter().chain(self.configured()).collect()
    }
}
