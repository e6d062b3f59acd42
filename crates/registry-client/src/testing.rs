//! Testing Utilities
//!
//! An in-process broker that records every call made through the transport
//! port, plus a manually driven clock. Available with the `test-utils`
//! feature flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use registry_client::testing::InMemoryBroker;
//!
//! let broker = InMemoryBroker::new();
//! let client = RegistryClient::new(config, broker.connector())?;
//! client.init().await?;
//! broker.deliver("registry_office", br#"{"type":"apiDescriptionRequest"}"#.to_vec());
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use registry_types::Timestamp;
use tokio::sync::mpsc;

use crate::ports::{
    BrokerChannel, BrokerConnection, BrokerConnector, Clock, ConsumeOptions, Deliveries, Delivery,
    NackOptions, PublishOptions, QueueOptions, TransportError,
};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCall {
    Connect(String),
    CreateChannel,
    AssertQueue { queue: String, durable: bool },
    Consume { queue: String, no_ack: bool },
    Publish { queue: String, persistent: bool },
    Ack(u64),
    Nack { tag: u64, multiple: bool, requeue: bool },
    CloseChannel,
    CloseConnection,
}

/// A message published through the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub queue: String,
    pub body: Vec<u8>,
    pub persistent: bool,
}

impl PublishedMessage {
    /// Decode the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Default)]
struct BrokerState {
    calls: Vec<BrokerCall>,
    queues: BTreeSet<String>,
    published: Vec<PublishedMessage>,
    consumers: HashMap<String, mpsc::UnboundedSender<Delivery>>,
    next_tag: u64,
    refuse_connections: bool,
    fail_publishes: bool,
    fail_settlements: bool,
    publish_latency: Option<Duration>,
}

/// Shared in-memory broker. Clones observe the same state.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector bound to this broker.
    pub fn connector(&self) -> Arc<dyn BrokerConnector> {
        Arc::new(InMemoryConnector {
            broker: self.clone(),
        })
    }

    /// Make subsequent `connect` calls fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.lock().refuse_connections = refuse;
    }

    /// Make subsequent publishes fail.
    pub fn fail_publishes(&self, fail: bool) {
        self.state.lock().fail_publishes = fail;
    }

    /// Hold every publish for `latency` before it reaches the queue. The
    /// channel is checked again afterwards, so a close in between fails it.
    pub fn delay_publishes(&self, latency: Option<Duration>) {
        self.state.lock().publish_latency = latency;
    }

    /// Make subsequent acks and nacks fail.
    pub fn fail_settlements(&self, fail: bool) {
        self.state.lock().fail_settlements = fail;
    }

    /// Push a message to the consumer of `queue`. Returns its delivery tag, or
    /// `None` when nobody consumes the queue.
    pub fn deliver(&self, queue: &str, body: impl Into<Vec<u8>>) -> Option<u64> {
        let mut state = self.state.lock();
        let sender = state.consumers.get(queue)?.clone();
        state.next_tag += 1;
        let delivery_tag = state.next_tag;
        sender
            .send(Delivery {
                delivery_tag,
                body: body.into(),
            })
            .ok()?;
        Some(delivery_tag)
    }

    /// Every call in order.
    pub fn calls(&self) -> Vec<BrokerCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&BrokerCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Queue names in declaration order, repeats included.
    pub fn declared_queues(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BrokerCall::AssertQueue { queue, .. } => Some(queue.clone()),
                _ => None,
            })
            .collect()
    }

    /// Distinct queues that exist, sorted.
    pub fn existing_queues(&self) -> Vec<String> {
        self.state.lock().queues.iter().cloned().collect()
    }

    /// Every published message in order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state.lock().published.clone()
    }

    /// Published messages for one queue.
    pub fn published_to(&self, queue: &str) -> Vec<PublishedMessage> {
        self.state
            .lock()
            .published
            .iter()
            .filter(|m| m.queue == queue)
            .cloned()
            .collect()
    }

    /// Acked delivery tags.
    pub fn acks(&self) -> Vec<u64> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BrokerCall::Ack(tag) => Some(*tag),
                _ => None,
            })
            .collect()
    }

    /// Nacked deliveries as `(tag, requeue)`.
    pub fn nacks(&self) -> Vec<(u64, bool)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BrokerCall::Nack { tag, requeue, .. } => Some((*tag, *requeue)),
                _ => None,
            })
            .collect()
    }

    /// True when a consumer is registered on `queue`.
    pub fn has_consumer(&self, queue: &str) -> bool {
        self.state
            .lock()
            .consumers
            .get(queue)
            .is_some_and(|s| !s.is_closed())
    }

    /// Wait until at least `count` deliveries have been acked or nacked.
    pub async fn wait_for_settlements(&self, count: usize) -> bool {
        for _ in 0..1_000 {
            if self.acks().len() + self.nacks().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        false
    }

    fn record(&self, call: BrokerCall) {
        self.state.lock().calls.push(call);
    }
}

struct InMemoryConnector {
    broker: InMemoryBroker,
}

#[async_trait]
impl BrokerConnector for InMemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn BrokerConnection>, TransportError> {
        self.broker.record(BrokerCall::Connect(url.to_string()));
        if self.broker.state.lock().refuse_connections {
            return Err(TransportError::Unreachable(format!("connection refused: {url}")));
        }
        Ok(Box::new(InMemoryConnection {
            broker: self.broker.clone(),
            open: AtomicBool::new(true),
        }))
    }
}

struct InMemoryConnection {
    broker: InMemoryBroker,
    open: AtomicBool,
}

#[async_trait]
impl BrokerConnection for InMemoryConnection {
    async fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::ChannelClosed);
        }
        self.broker.record(BrokerCall::CreateChannel);
        Ok(Arc::new(InMemoryChannel {
            broker: self.broker.clone(),
            open: AtomicBool::new(true),
        }))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.open.store(false, Ordering::SeqCst);
        self.broker.record(BrokerCall::CloseConnection);
        Ok(())
    }
}

struct InMemoryChannel {
    broker: InMemoryBroker,
    open: AtomicBool,
}

impl InMemoryChannel {
    fn check_open(&self) -> Result<(), TransportError> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::ChannelClosed)
        }
    }
}

#[async_trait]
impl BrokerChannel for InMemoryChannel {
    async fn assert_queue(&self, queue: &str, options: QueueOptions) -> Result<(), TransportError> {
        self.check_open()?;
        let mut state = self.broker.state.lock();
        state.calls.push(BrokerCall::AssertQueue {
            queue: queue.to_string(),
            durable: options.durable,
        });
        state.queues.insert(queue.to_string());
        Ok(())
    }

    async fn send_to_queue(
        &self,
        queue: &str,
        body: Vec<u8>,
        options: PublishOptions,
    ) -> Result<(), TransportError> {
        self.check_open()?;
        let latency = self.broker.state.lock().publish_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
            self.check_open()?;
        }
        let mut state = self.broker.state.lock();
        if state.fail_publishes {
            return Err(TransportError::Protocol("publish refused".into()));
        }
        state.calls.push(BrokerCall::Publish {
            queue: queue.to_string(),
            persistent: options.persistent,
        });
        state.published.push(PublishedMessage {
            queue: queue.to_string(),
            body,
            persistent: options.persistent,
        });
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        options: ConsumeOptions,
    ) -> Result<Deliveries, TransportError> {
        self.check_open()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.broker.state.lock();
        state.calls.push(BrokerCall::Consume {
            queue: queue.to_string(),
            no_ack: options.no_ack,
        });
        state.consumers.insert(queue.to_string(), sender);
        Ok(receiver)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        self.check_open()?;
        let mut state = self.broker.state.lock();
        if state.fail_settlements {
            return Err(TransportError::Protocol("unknown delivery tag".into()));
        }
        state.calls.push(BrokerCall::Ack(delivery.delivery_tag));
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, options: NackOptions) -> Result<(), TransportError> {
        self.check_open()?;
        let mut state = self.broker.state.lock();
        if state.fail_settlements {
            return Err(TransportError::Protocol("unknown delivery tag".into()));
        }
        state.calls.push(BrokerCall::Nack {
            tag: delivery.delivery_tag,
            multiple: options.multiple,
            requeue: options.requeue,
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.open.store(false, Ordering::SeqCst);
        let mut state = self.broker.state.lock();
        // Dropping the senders ends every consumer stream
        state.consumers.clear();
        state.calls.push(BrokerCall::CloseChannel);
        Ok(())
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start at `millis` since the Unix epoch.
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let millis = self.millis.load(Ordering::SeqCst);
        Timestamp::from_millis(millis).unwrap_or_else(Timestamp::now)
    }
}
