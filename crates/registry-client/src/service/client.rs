//! # Registry Client
//!
//! Runs the registration protocol for one service on top of a
//! [`QueueManager`]: periodic heartbeats, inbound description requests and
//! outbound API descriptions, with every outcome surfaced on the event bus.
//!
//! ## Concurrency
//!
//! - One consumer task handles deliveries strictly in arrival order and
//!   settles each before taking the next.
//! - One timer task sends periodic heartbeats; a tick never overlaps the
//!   next one.
//! - Public sends may run concurrently with both. Each publishes exactly one
//!   message and emits exactly one event.

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use registry_bus::{
    EventFilter, EventPublisher, EventStream, InMemoryEventBus, RegistryEvent, Subscription,
};
use registry_types::{ProtocolError, ProtocolMessage, QueueAddressing, ServiceIdentity, Timestamp};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::heartbeat::HeartbeatTimer;
use super::queue_manager::QueueManager;
use crate::config::{ClientOptions, RegistryClientConfig};
use crate::domain::{classify, Inbound, RegistryError};
use crate::ports::{
    BrokerChannel, BrokerConnector, Clock, ConsumeOptions, Deliveries, Delivery, NackOptions,
    PublishOptions, QueueOptions, SystemClock,
};

/// Lifecycle of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Constructed, `init` not yet called.
    Uninitialized,
    /// `init` in progress.
    Initializing,
    /// Connected and consuming.
    Ready,
    /// `close` has been called. Terminal.
    Closed,
}

enum HeartbeatSlot {
    Idle,
    /// Immediate heartbeat in flight; carries the generation that owns it.
    Starting(u64),
    Armed(HeartbeatTimer),
}

struct ClientInner {
    identity: ServiceIdentity,
    options: ClientOptions,
    queue_manager: QueueManager,
    bus: InMemoryEventBus,
    clock: Arc<dyn Clock>,
    last_timestamp: Mutex<Option<Timestamp>>,
    state: Mutex<ClientState>,
    heartbeat: Mutex<HeartbeatSlot>,
    heartbeat_generation: AtomicU64,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

/// Registration protocol client for one service instance.
///
/// Share it behind an `Arc` when several tasks need it; dropping the last
/// handle cancels the heartbeat and consumer tasks without closing the
/// connection gracefully. Call [`RegistryClient::close`] for that.
pub struct RegistryClient {
    inner: Arc<ClientInner>,
}

impl RegistryClient {
    /// Create a client using the wall clock.
    pub fn new(
        config: RegistryClientConfig,
        connector: Arc<dyn BrokerConnector>,
    ) -> Result<Self, RegistryError> {
        Self::with_clock(config, connector, Arc::new(SystemClock))
    }

    /// Create a client with an injected clock.
    pub fn with_clock(
        config: RegistryClientConfig,
        connector: Arc<dyn BrokerConnector>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RegistryError> {
        config.validate()?;

        let identity = config.identity();
        let queue_manager = QueueManager::new(config.broker_url, config.service_name, connector)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                identity,
                options: config.options,
                queue_manager,
                bus: InMemoryEventBus::new(),
                clock,
                last_timestamp: Mutex::new(None),
                state: Mutex::new(ClientState::Uninitialized),
                heartbeat: Mutex::new(HeartbeatSlot::Idle),
                heartbeat_generation: AtomicU64::new(0),
                consumer: Mutex::new(None),
            }),
        })
    }

    /// Connect, declare the configured queues and start consuming the
    /// registry queue with manual acknowledgement.
    ///
    /// Does not start the heartbeat. On failure the connection is released
    /// and `init` may be retried.
    pub async fn init(&self) -> Result<(), RegistryError> {
        {
            let mut state = self.inner.state.lock();
            match *state {
                ClientState::Uninitialized => *state = ClientState::Initializing,
                ClientState::Initializing | ClientState::Ready => {
                    return Err(RegistryError::AlreadyInitialized)
                }
                ClientState::Closed => return Err(RegistryError::Closed),
            }
        }

        let setup = self.inner.setup().await;

        let (channel, deliveries) = match setup {
            Ok(consumer) => consumer,
            Err(e) => {
                warn!(service = %self.inner.identity, error = %e, "Registry client init failed");
                self.inner.release_quietly().await;
                let mut state = self.inner.state.lock();
                if *state == ClientState::Initializing {
                    *state = ClientState::Uninitialized;
                }
                return Err(e);
            }
        };

        let closed_meanwhile = {
            let mut state = self.inner.state.lock();
            if *state == ClientState::Closed {
                true
            } else {
                *state = ClientState::Ready;
                let handle = tokio::spawn(consume_loop(
                    Arc::downgrade(&self.inner),
                    channel,
                    deliveries,
                ));
                *self.inner.consumer.lock() = Some(handle);
                false
            }
        };

        if closed_meanwhile {
            self.inner.release_quietly().await;
            return Err(RegistryError::Closed);
        }

        info!(
            service = %self.inner.identity,
            registry_queue = %self.inner.options.registry_queue,
            "Registry client initialized"
        );
        Ok(())
    }

    /// Publish one heartbeat to the API queue and emit `HeartbeatSent`.
    pub async fn send_heartbeat(&self) -> Result<ProtocolMessage, RegistryError> {
        self.inner.send_heartbeat().await
    }

    /// Publish an API description to the registry queue and emit
    /// `ApiDescriptionSent`.
    ///
    /// `description` is serialized once and embedded verbatim.
    pub async fn send_api_description<D>(
        &self,
        description: &D,
    ) -> Result<ProtocolMessage, RegistryError>
    where
        D: Serialize + ?Sized,
    {
        let description = serde_json::to_value(description)?;
        self.inner.send_api_description(description).await
    }

    /// Send a heartbeat immediately, then every configured interval until
    /// [`stop_heartbeat`](Self::stop_heartbeat) or [`close`](Self::close).
    ///
    /// Fails with `HeartbeatAlreadyActive` if heartbeats are already running.
    /// If the immediate send fails the timer is not armed.
    pub async fn start_heartbeat(&self) -> Result<(), RegistryError> {
        self.inner.ensure_ready()?;

        let generation = self.inner.heartbeat_generation.fetch_add(1, Ordering::Relaxed);
        {
            let mut slot = self.inner.heartbeat.lock();
            if !matches!(*slot, HeartbeatSlot::Idle) {
                return Err(RegistryError::HeartbeatAlreadyActive);
            }
            *slot = HeartbeatSlot::Starting(generation);
        }

        if let Err(e) = self.inner.send_heartbeat().await {
            let mut slot = self.inner.heartbeat.lock();
            if matches!(*slot, HeartbeatSlot::Starting(g) if g == generation) {
                *slot = HeartbeatSlot::Idle;
            }
            return Err(e);
        }

        let period = self.inner.options.heartbeat_interval;
        let mut slot = self.inner.heartbeat.lock();
        if !matches!(*slot, HeartbeatSlot::Starting(g) if g == generation) {
            // Stopped or closed while the first heartbeat was in flight
            debug!("Heartbeat start superseded");
            return Ok(());
        }

        let weak = Arc::downgrade(&self.inner);
        *slot = HeartbeatSlot::Armed(HeartbeatTimer::spawn(period, move || {
            let weak = Weak::clone(&weak);
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.heartbeat_tick().await;
                }
            }
        }));

        info!(
            service = %self.inner.identity,
            interval_ms = period.as_millis() as u64,
            "Heartbeat started"
        );
        Ok(())
    }

    /// Cancel periodic heartbeats. No-op when none are running.
    pub fn stop_heartbeat(&self) {
        self.inner.stop_heartbeat();
    }

    /// Stop the heartbeat, stop consuming and release the connection.
    ///
    /// Idempotent: later calls return `Ok` without touching the broker.
    pub async fn close(&self) -> Result<(), RegistryError> {
        {
            let mut state = self.inner.state.lock();
            if *state == ClientState::Closed {
                return Ok(());
            }
            *state = ClientState::Closed;
        }

        self.inner.stop_heartbeat();
        if let Some(consumer) = self.inner.consumer.lock().take() {
            consumer.abort();
        }

        let result = self.inner.queue_manager.close().await;
        info!(service = %self.inner.identity, "Registry client closed");
        result
    }

    /// Listen for events matching `filter`.
    ///
    /// Only events emitted after this call are received.
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.inner.bus.subscribe(filter)
    }

    /// All events as a `Stream`.
    pub fn events(&self) -> EventStream {
        self.inner.bus.event_stream(EventFilter::all())
    }

    /// Identity stamped on outbound messages.
    #[must_use]
    pub fn identity(&self) -> &ServiceIdentity {
        &self.inner.identity
    }

    /// Effective options.
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Every queue this client declares.
    #[must_use]
    pub fn queues(&self) -> QueueAddressing {
        QueueAddressing::new(
            &self.inner.identity.service_name,
            &self.inner.options.api_queue,
            &self.inner.options.registry_queue,
        )
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        *self.inner.state.lock()
    }

    /// True while periodic heartbeats are armed or starting.
    #[must_use]
    pub fn is_heartbeat_active(&self) -> bool {
        !matches!(*self.inner.heartbeat.lock(), HeartbeatSlot::Idle)
    }

    /// Total events emitted so far.
    #[must_use]
    pub fn events_emitted(&self) -> u64 {
        self.inner.bus.events_published()
    }
}

impl Drop for RegistryClient {
    fn drop(&mut self) {
        if let HeartbeatSlot::Armed(timer) =
            mem::replace(&mut *self.inner.heartbeat.lock(), HeartbeatSlot::Idle)
        {
            timer.abort();
        }
        if let Some(consumer) = self.inner.consumer.lock().take() {
            consumer.abort();
        }
    }
}

impl ClientInner {
    async fn setup(&self) -> Result<(Arc<dyn BrokerChannel>, Deliveries), RegistryError> {
        self.queue_manager.initialize().await?;
        self.queue_manager
            .ensure_queues(&[
                self.options.api_queue.clone(),
                self.options.registry_queue.clone(),
            ])
            .await?;

        let channel = self.queue_manager.channel()?;
        let deliveries = channel
            .consume(&self.options.registry_queue, ConsumeOptions::manual_ack())
            .await
            .map_err(RegistryError::Transport)?;

        Ok((channel, deliveries))
    }

    async fn release_quietly(&self) {
        if let Err(e) = self.queue_manager.close().await {
            debug!(error = %e, "Ignoring close failure during init cleanup");
        }
    }

    fn ensure_ready(&self) -> Result<(), RegistryError> {
        match *self.state.lock() {
            ClientState::Ready => Ok(()),
            ClientState::Closed => Err(RegistryError::Closed),
            ClientState::Uninitialized | ClientState::Initializing => {
                Err(RegistryError::NotInitialized)
            }
        }
    }

    /// Clock reading, bumped so timestamps strictly increase per client.
    fn next_timestamp(&self) -> Timestamp {
        let now = self.clock.now();
        let mut last = self.last_timestamp.lock();
        let timestamp = match *last {
            Some(previous) if now <= previous => previous.plus_millis(1),
            _ => now,
        };
        *last = Some(timestamp);
        timestamp
    }

    async fn emit(&self, event: RegistryEvent) {
        self.bus.publish(event).await;
    }

    async fn publish(&self, queue: &str, message: &ProtocolMessage) -> Result<(), RegistryError> {
        let channel = self.queue_manager.channel()?;
        let body = message.to_bytes()?;

        channel
            .assert_queue(queue, QueueOptions::durable())
            .await
            .map_err(RegistryError::Transport)?;
        channel
            .send_to_queue(queue, body, PublishOptions::persistent())
            .await
            .map_err(RegistryError::Transport)?;
        Ok(())
    }

    async fn send_heartbeat(&self) -> Result<ProtocolMessage, RegistryError> {
        self.ensure_ready()?;

        let message = ProtocolMessage::heartbeat(&self.identity, self.next_timestamp());
        self.publish(&self.options.api_queue, &message).await?;

        debug!(
            id = %message.id,
            queue = %self.options.api_queue,
            timestamp = %message.timestamp,
            "Heartbeat sent"
        );
        self.emit(RegistryEvent::HeartbeatSent(message.clone())).await;
        Ok(message)
    }

    async fn send_api_description(
        &self,
        description: Value,
    ) -> Result<ProtocolMessage, RegistryError> {
        self.ensure_ready()?;

        let message =
            ProtocolMessage::api_description(&self.identity, description, self.next_timestamp());
        self.publish(&self.options.registry_queue, &message).await?;

        info!(
            id = %message.id,
            queue = %self.options.registry_queue,
            "API description sent"
        );
        self.emit(RegistryEvent::ApiDescriptionSent(message.clone())).await;
        Ok(message)
    }

    async fn heartbeat_tick(&self) {
        match self.send_heartbeat().await {
            Ok(_) | Err(RegistryError::Closed) => {}
            // Lost a race with close; the channel went away mid-publish
            Err(_) if *self.state.lock() == ClientState::Closed => {}
            Err(e) => {
                warn!(service = %self.identity, error = %e, "Periodic heartbeat failed");
                self.emit(RegistryEvent::Error(ProtocolError::HeartbeatFailed {
                    reason: e.to_string(),
                }))
                .await;
            }
        }
    }

    fn stop_heartbeat(&self) {
        let previous = mem::replace(&mut *self.heartbeat.lock(), HeartbeatSlot::Idle);
        if let HeartbeatSlot::Armed(timer) = previous {
            timer.stop();
            info!(service = %self.identity, "Heartbeat stopped");
        }
    }

    /// Classify, emit, then settle exactly once.
    async fn handle_delivery(&self, channel: &dyn BrokerChannel, delivery: Delivery) {
        let tag = delivery.delivery_tag;

        match classify(&delivery.body, &self.identity) {
            Err(error) => {
                warn!(delivery_tag = tag, error = %error, "Unparseable registry message");
                self.emit(RegistryEvent::Error(error)).await;
                if let Err(e) = channel.nack(&delivery, NackOptions::discard()).await {
                    self.settlement_failed(tag, e.to_string()).await;
                }
            }
            Ok(inbound) => {
                match inbound {
                    Inbound::DescriptionRequest(request) => {
                        info!(
                            delivery_tag = tag,
                            request_id = request.id.as_deref().unwrap_or("-"),
                            "API description requested"
                        );
                        self.emit(RegistryEvent::ApiDescriptionRequest(request)).await;
                    }
                    Inbound::Ignored(reason) => {
                        debug!(delivery_tag = tag, ?reason, "Registry message ignored");
                    }
                }
                if let Err(e) = channel.ack(&delivery).await {
                    self.settlement_failed(tag, e.to_string()).await;
                }
            }
        }
    }

    async fn settlement_failed(&self, delivery_tag: u64, reason: String) {
        warn!(delivery_tag, reason = %reason, "Failed to settle delivery");
        self.emit(RegistryEvent::Error(ProtocolError::Acknowledgement {
            delivery_tag,
            reason,
        }))
        .await;
    }
}

async fn consume_loop(
    inner: Weak<ClientInner>,
    channel: Arc<dyn BrokerChannel>,
    mut deliveries: Deliveries,
) {
    while let Some(delivery) = deliveries.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.handle_delivery(channel.as_ref(), delivery).await;
    }
    debug!("Registry consumer stopped");
}

#[async_trait::async_trait]
impl crate::ports::RegistryApi for RegistryClient {
    async fn init(&self) -> Result<(), RegistryError> {
        RegistryClient::init(self).await
    }

    async fn send_heartbeat(&self) -> Result<ProtocolMessage, RegistryError> {
        RegistryClient::send_heartbeat(self).await
    }

    async fn send_api_description(
        &self,
        description: Value,
    ) -> Result<ProtocolMessage, RegistryError> {
        self.inner.send_api_description(description).await
    }

    async fn start_heartbeat(&self) -> Result<(), RegistryError> {
        RegistryClient::start_heartbeat(self).await
    }

    fn stop_heartbeat(&self) {
        RegistryClient::stop_heartbeat(self);
    }

    async fn close(&self) -> Result<(), RegistryError> {
        RegistryClient::close(self).await
    }

    fn subscribe(&self, filter: EventFilter) -> Subscription {
        RegistryClient::subscribe(self, filter)
    }
}
