//! # Driven Ports (Outbound SPI)
//!
//! The interfaces this crate **requires** from its host: a broker transport
//! and a clock.
//!
//! The transport mirrors the narrow surface of an AMQP client library:
//! connect, open a channel, declare a queue, publish, consume, ack/nack and
//! close. Connection establishment, channel multiplexing and framing stay
//! inside the implementation.

use async_trait::async_trait;
use registry_types::Timestamp;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from broker transport operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The broker could not be reached.
    #[error("broker unreachable: {0}")]
    Unreachable(String),
    /// The broker refused the connection or operation.
    #[error("broker rejected request: {0}")]
    Rejected(String),
    /// The channel is no longer open.
    #[error("channel closed")]
    ChannelClosed,
    /// Any other protocol-level failure.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// A message delivered by the broker to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Broker-assigned tag used to ack or nack this delivery.
    pub delivery_tag: u64,
    /// Raw message body.
    pub body: Vec<u8>,
}

/// Stream of deliveries for one consumer, in broker order.
pub type Deliveries = mpsc::UnboundedReceiver<Delivery>;

/// Options for queue declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    /// Survive broker restarts.
    pub durable: bool,
}

impl QueueOptions {
    /// Durable queue declaration (the only kind this protocol uses).
    #[must_use]
    pub fn durable() -> Self {
        Self { durable: true }
    }
}

/// Options for publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    /// Ask the broker to persist the message to disk.
    pub persistent: bool,
}

impl PublishOptions {
    /// Persistent delivery (the only kind this protocol uses).
    #[must_use]
    pub fn persistent() -> Self {
        Self { persistent: true }
    }
}

/// Options for consumer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOptions {
    /// When `true` the broker considers messages settled on delivery.
    pub no_ack: bool,
}

impl ConsumeOptions {
    /// Every delivery must be explicitly acked or nacked.
    #[must_use]
    pub fn manual_ack() -> Self {
        Self { no_ack: false }
    }
}

/// Options for negative acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NackOptions {
    /// Also reject every earlier unsettled delivery.
    pub multiple: bool,
    /// Return the message to the queue for redelivery.
    pub requeue: bool,
}

impl NackOptions {
    /// Reject a single delivery and discard it.
    #[must_use]
    pub fn discard() -> Self {
        Self {
            multiple: false,
            requeue: false,
        }
    }
}

/// Opens connections to the broker.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Connect to the broker at `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn BrokerConnection>, TransportError>;
}

/// An open broker connection.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Open a channel on this connection.
    async fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, TransportError>;

    /// Close the connection.
    async fn close(&self) -> Result<(), TransportError>;
}

/// A communication channel on a broker connection.
///
/// Implementations must serialize operations internally if the underlying
/// transport requires it.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Declare a queue. Re-declaring with the same options is a no-op.
    async fn assert_queue(&self, queue: &str, options: QueueOptions) -> Result<(), TransportError>;

    /// Publish `body` to `queue` through the default exchange.
    async fn send_to_queue(
        &self,
        queue: &str,
        body: Vec<u8>,
        options: PublishOptions,
    ) -> Result<(), TransportError>;

    /// Register a consumer on `queue`.
    async fn consume(&self, queue: &str, options: ConsumeOptions)
        -> Result<Deliveries, TransportError>;

    /// Positively acknowledge a delivery.
    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError>;

    /// Negatively acknowledge a delivery.
    async fn nack(&self, delivery: &Delivery, options: NackOptions) -> Result<(), TransportError>;

    /// Close the channel.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Abstract interface for the current time.
///
/// Enables deterministic testing by injecting controllable time sources.
pub trait Clock: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
