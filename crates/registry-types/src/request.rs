//! # Inbound API Description Request
//!
//! The registry office sends these on the registry queue. Unlike outbound
//! messages, requests are only required to carry `type`, `serviceName` and
//! `version`; `id` and `timestamp` are passed through when present.

/// A parsed `apiDescriptionRequest` addressed to this service.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiDescriptionRequest {
    /// Request id, if the sender supplied one.
    pub id: Option<String>,
    /// Targeted service name.
    pub service_name: String,
    /// Targeted service version.
    pub version: String,
    /// Sender timestamp, verbatim.
    pub timestamp: Option<String>,
    /// The exact JSON record that was received.
    pub raw: serde_json::Value,
}

impl ApiDescriptionRequest {
    /// Extract the typed fields from a JSON object.
    ///
    /// Returns `None` unless `serviceName` and `version` are both strings.
    #[must_use]
    pub fn from_value(raw: serde_json::Value) -> Option<Self> {
        let service_name = raw.get("serviceName")?.as_str()?.to_string();
        let version = raw.get("version")?.as_str()?.to_string();
        let id = raw.get("id").and_then(|v| v.as_str()).map(str::to_string);
        let timestamp = raw
            .get("timestamp")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Some(Self {
            id,
            service_name,
            version,
            timestamp,
            raw,
        })
    }
}
