//! # Registry Types
//!
//! Single source of truth for the types exchanged between a service agent and
//! the registry office.
//!
//! ## Contents
//!
//! - [`ServiceIdentity`]: the immutable `(service_name, version)` pair embedded
//!   in every outbound message.
//! - [`ProtocolMessage`]: the JSON envelope carried in every broker message body.
//! - [`Timestamp`]: millisecond-precision UTC instant, serialized as ISO-8601.
//! - [`ApiDescriptionRequest`]: an inbound description request addressed to us.
//! - [`QueueAddressing`]: the durable queues the protocol depends on.
//! - [`ProtocolError`]: recoverable steady-state failures surfaced as events.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod errors;
pub mod identity;
pub mod message;
pub mod queues;
pub mod request;

pub use errors::ProtocolError;
pub use identity::ServiceIdentity;
pub use message::{MessageType, ProtocolMessage, Timestamp};
pub use queues::{
    fixed_queues, QueueAddressing, DEFAULT_API_QUEUE, DEFAULT_REGISTRY_QUEUE, SERVICE_QUEUE_SUFFIX,
    WORKFLOW_QUEUE,
};
pub use request::ApiDescriptionRequest;
