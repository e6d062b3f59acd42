//! # Registry Events
//!
//! The complete observable surface of the protocol engine.

use registry_types::{ApiDescriptionRequest, ProtocolError, ProtocolMessage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every event the protocol engine can raise.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A heartbeat was published. Carries the exact message sent.
    HeartbeatSent(ProtocolMessage),

    /// The registry asked this service for its API description.
    /// Answer with `RegistryClient::send_api_description`.
    ApiDescriptionRequest(ApiDescriptionRequest),

    /// An API description was published. Carries the exact message sent.
    ApiDescriptionSent(ProtocolMessage),

    /// A recoverable failure. The consumer and timer keep running.
    Error(ProtocolError),
}

impl RegistryEvent {
    /// Get the kind of this event (for filtering).
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::HeartbeatSent(_) => EventKind::HeartbeatSent,
            Self::ApiDescriptionRequest(_) => EventKind::ApiDescriptionRequest,
            Self::ApiDescriptionSent(_) => EventKind::ApiDescriptionSent,
            Self::Error(_) => EventKind::Error,
        }
    }
}

/// Event kinds for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    HeartbeatSent,
    ApiDescriptionRequest,
    ApiDescriptionSent,
    Error,
}

impl EventKind {
    /// Canonical event name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeartbeatSent => "heartbeatSent",
            Self::ApiDescriptionRequest => "apiDescriptionRequest",
            Self::ApiDescriptionSent => "apiDescriptionSent",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Kinds to include. Empty means all kinds.
    pub kinds: Vec<EventKind>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for a single kind.
    #[must_use]
    pub fn only(kind: EventKind) -> Self {
        Self { kinds: vec![kind] }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &RegistryEvent) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&event.kind())
    }
}
