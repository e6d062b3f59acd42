//! # Adapters Layer
//!
//! Concrete implementations of the outbound ports.
//!
//! Requires feature: `amqp`

#[cfg(feature = "amqp")]
pub mod amqp;

#[cfg(feature = "amqp")]
pub use amqp::{AmqpChannel, AmqpConnection, AmqpConnector};
