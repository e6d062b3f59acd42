//! # Registry Service
//!
//! Application layer wiring the domain rules to the transport port.
//!
//! - `queue_manager`: connection, channel and queue declaration
//! - `client`: the registration protocol and its event surface
//! - `heartbeat`: the periodic timer behind `start_heartbeat`

mod client;
mod heartbeat;
mod queue_manager;

pub use client::{ClientState, RegistryClient};
pub use heartbeat::HeartbeatTimer;
pub use queue_manager::QueueManager;
