//! # Ports Layer
//!
//! Trait definitions for everything outside the protocol engine.
//!
//! - `inbound`: the API host services drive
//! - `outbound`: the broker transport and clock the engine requires

pub mod inbound;
pub mod outbound;

pub use inbound::RegistryApi;
pub use outbound::{
    BrokerChannel, BrokerConnection, BrokerConnector, Clock, ConsumeOptions, Deliveries, Delivery,
    NackOptions, PublishOptions, QueueOptions, SystemClock, TransportError,
};
