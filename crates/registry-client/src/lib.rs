//! # Registry Client
//!
//! Lets a service announce itself to a central registry over a message
//! broker: periodic heartbeats, answers to API description requests, and the
//! queue plumbing both need.
//!
//! ## Architecture
//!
//! - **Domain Layer:** error taxonomy and pure inbound classification
//! - **Ports Layer:** the driving `RegistryApi` and the driven broker/clock traits
//! - **Service Layer:** `QueueManager` and `RegistryClient`
//! - **Adapters Layer:** the AMQP transport (feature `amqp`)
//!
//! ## Acknowledgement Policy
//!
//! Every inbound delivery is settled exactly once, after classification.
//! Bodies that are not JSON are rejected without requeue; everything else is
//! acked, whether or not it was addressed to this service.
//!
//! ## Example
//!
//! ```rust,ignore
//! use registry_client::{adapters::AmqpConnector, RegistryClient, RegistryClientConfig};
//! use registry_bus::{EventFilter, EventKind, RegistryEvent};
//! use std::sync::Arc;
//!
//! let config = RegistryClientConfig::new("amqp://localhost", "invoicing", "1.0.0");
//! let client = RegistryClient::new(config, Arc::new(AmqpConnector::new()))?;
//!
//! let mut requests = client.subscribe(EventFilter::only(EventKind::ApiDescriptionRequest));
//! client.init().await?;
//! client.start_heartbeat().await?;
//!
//! while let Some(RegistryEvent::ApiDescriptionRequest(_)) = requests.recv().await {
//!     client.send_api_description(&serde_json::json!({ "endpoints": [] })).await?;
//! }
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// FEATURE-GATED MODULES
// =============================================================================

/// Broker transports.
/// Requires feature: `amqp`
pub mod adapters;

/// In-memory broker and manual clock.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use config::{ClientOptions, RegistryClientConfig, DEFAULT_HEARTBEAT_INTERVAL};
pub use domain::{classify, IgnoreReason, Inbound, RegistryError};
pub use ports::{
    BrokerChannel, BrokerConnection, BrokerConnector, Clock, RegistryApi, SystemClock,
    TransportError,
};
pub use service::{ClientState, QueueManager, RegistryClient};

#[cfg(feature = "amqp")]
pub use adapters::AmqpConnector;
