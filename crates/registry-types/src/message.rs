//! # Protocol Message Envelope
//!
//! The JSON record carried in every broker message body:
//!
//! ```text
//! { id, type: "heartbeat" | "apiDescriptionRequest" | "apiDescription",
//!   serviceName, version, timestamp: ISO-8601, description?: object }
//! ```

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use crate::identity::ServiceIdentity;

/// Discriminator of a [`ProtocolMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    /// Periodic liveness announcement.
    Heartbeat,
    /// Registry asks a service for its API description.
    ApiDescriptionRequest,
    /// Service publishes its API description.
    ApiDescription,
}

impl MessageType {
    /// Wire name of this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heartbeat => "heartbeat",
            Self::ApiDescriptionRequest => "apiDescriptionRequest",
            Self::ApiDescription => "apiDescription",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "heartbeat" => Some(Self::Heartbeat),
            "apiDescriptionRequest" => Some(Self::ApiDescriptionRequest),
            "apiDescription" => Some(Self::ApiDescription),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A UTC instant with millisecond precision.
///
/// Serialized as `YYYY-MM-DDTHH:MM:SS.sssZ`, which sorts lexicographically
/// and round-trips through ISO-8601 parsing unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Wrap a `DateTime`, truncating to millisecond precision.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(3))
    }

    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Build from milliseconds since the Unix epoch.
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// This instant shifted forward by `millis`.
    #[must_use]
    pub fn plus_millis(&self, millis: i64) -> Self {
        Self(self.0 + chrono::Duration::milliseconds(millis))
    }

    /// Parse an RFC 3339 / ISO-8601 string.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|at| Self::from_datetime(at.with_timezone(&Utc)))
    }

    /// ISO-8601 rendering with milliseconds and a `Z` suffix.
    #[must_use]
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}

/// The envelope exchanged over the broker.
///
/// Every outbound message carries a freshly generated `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMessage {
    /// Globally unique per message.
    pub id: Uuid,
    /// Message discriminator.
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Sender's service name.
    pub service_name: String,
    /// Sender's service version.
    pub version: String,
    /// Creation time.
    pub timestamp: Timestamp,
    /// Opaque API description, present only on `apiDescription`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<serde_json::Value>,
}

impl ProtocolMessage {
    /// A heartbeat for `identity` stamped at `timestamp`.
    #[must_use]
    pub fn heartbeat(identity: &ServiceIdentity, timestamp: Timestamp) -> Self {
        Self::build(MessageType::Heartbeat, identity, timestamp, None)
    }

    /// An API description carrying the caller's opaque payload.
    #[must_use]
    pub fn api_description(
        identity: &ServiceIdentity,
        description: serde_json::Value,
        timestamp: Timestamp,
    ) -> Self {
        Self::build(
            MessageType::ApiDescription,
            identity,
            timestamp,
            Some(description),
        )
    }

    fn build(
        message_type: MessageType,
        identity: &ServiceIdentity,
        timestamp: Timestamp,
        description: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_type,
            service_name: identity.service_name.clone(),
            version: identity.version.clone(),
            timestamp,
            description,
        }
    }

    /// Serialize to the JSON body published on the broker.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a broker body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
