//! # AMQP Transport
//!
//! Implements the broker port over AMQP 0-9-1 using `lapin`.
//!
//! Publishes go through the default exchange with the queue name as routing
//! key, so every queue is addressable by name without extra bindings.

use std::sync::Arc;

use async_trait::async_trait;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::ports::{
    BrokerChannel, BrokerConnection, BrokerConnector, ConsumeOptions, Deliveries, Delivery,
    NackOptions, PublishOptions, QueueOptions, TransportError,
};

/// AMQP delivery mode for messages written to disk.
const PERSISTENT_DELIVERY_MODE: u8 = 2;
const TRANSIENT_DELIVERY_MODE: u8 = 1;

/// AMQP reply code for a normal shutdown.
const REPLY_SUCCESS: u16 = 200;

fn map_error(error: lapin::Error) -> TransportError {
    match error {
        lapin::Error::IOError(e) => TransportError::Unreachable(e.to_string()),
        lapin::Error::ProtocolError(e) => TransportError::Rejected(e.to_string()),
        lapin::Error::InvalidChannelState(_) => TransportError::ChannelClosed,
        other => TransportError::Protocol(other.to_string()),
    }
}

/// Opens AMQP connections with default connection properties.
#[derive(Debug, Clone, Default)]
pub struct AmqpConnector {
    connection_name: Option<String>,
}

impl AmqpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise `name` to the broker as the connection name.
    #[must_use]
    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.connection_name = Some(name.into());
        self
    }
}

#[async_trait]
impl BrokerConnector for AmqpConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn BrokerConnection>, TransportError> {
        let mut properties = ConnectionProperties::default();
        if let Some(name) = &self.connection_name {
            properties = properties.with_connection_name(name.clone().into());
        }

        let connection = Connection::connect(url, properties)
            .await
            .map_err(map_error)?;
        debug!("AMQP connection established");
        Ok(Box::new(AmqpConnection { connection }))
    }
}

/// An open AMQP connection.
pub struct AmqpConnection {
    connection: Connection,
}

#[async_trait]
impl BrokerConnection for AmqpConnection {
    async fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, TransportError> {
        let channel = self.connection.create_channel().await.map_err(map_error)?;
        debug!(channel_id = channel.id(), "AMQP channel opened");
        Ok(Arc::new(AmqpChannel { channel }))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connection
            .close(REPLY_SUCCESS, "OK")
            .await
            .map_err(map_error)
    }
}

/// An AMQP channel. lapin serializes frames per channel internally.
pub struct AmqpChannel {
    channel: Channel,
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    async fn assert_queue(&self, queue: &str, options: QueueOptions) -> Result<(), TransportError> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: options.durable,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn send_to_queue(
        &self,
        queue: &str,
        body: Vec<u8>,
        options: PublishOptions,
    ) -> Result<(), TransportError> {
        let delivery_mode = if options.persistent {
            PERSISTENT_DELIVERY_MODE
        } else {
            TRANSIENT_DELIVERY_MODE
        };

        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(delivery_mode),
            )
            .await
            .map_err(map_error)?
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        options: ConsumeOptions,
    ) -> Result<Deliveries, TransportError> {
        let mut consumer = self
            .channel
            .basic_consume(
                queue,
                "",
                BasicConsumeOptions {
                    no_ack: options.no_ack,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(map_error)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = queue.to_string();

        tokio::spawn(async move {
            while let Some(next) = consumer.next().await {
                match next {
                    Ok(delivery) => {
                        let forwarded = sender.send(Delivery {
                            delivery_tag: delivery.delivery_tag,
                            body: delivery.data,
                        });
                        if forwarded.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(queue = %queue, error = %e, "AMQP consumer failed");
                        break;
                    }
                }
            }
            debug!(queue = %queue, "AMQP consumer ended");
        });

        Ok(receiver)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        self.channel
            .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
            .await
            .map_err(map_error)
    }

    async fn nack(&self, delivery: &Delivery, options: NackOptions) -> Result<(), TransportError> {
        self.channel
            .basic_nack(
                delivery.delivery_tag,
                BasicNackOptions {
                    multiple: options.multiple,
                    requeue: options.requeue,
                },
            )
            .await
            .map_err(map_error)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.channel
            .close(REPLY_SUCCESS, "OK")
            .await
            .map_err(map_error)
    }
}
