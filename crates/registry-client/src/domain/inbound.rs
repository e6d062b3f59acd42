//! Inbound message classification.
//!
//! Pure functions: no I/O, no events. The consumer acts on the result.
//!
//! Acknowledgement policy:
//! - body is not JSON → `Err`, the delivery is rejected without requeue.
//!   Invalid UTF-8 is replaced with U+FFFD before parsing, it is not a
//!   rejection on its own
//! - anything else → `Ok`, the delivery is acked exactly once, whether or not
//!   it was addressed to us

use registry_types::{ApiDescriptionRequest, MessageType, ProtocolError, ServiceIdentity};
use serde_json::Value;

/// Outcome of classifying a well-formed inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A description request addressed to this exact service and version.
    DescriptionRequest(ApiDescriptionRequest),
    /// Valid JSON we do not act on. Acked and dropped.
    Ignored(IgnoreReason),
}

/// Why a well-formed message was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Top-level JSON value is not an object.
    NotAnObject,
    /// No string `type` field.
    MissingType,
    /// `type` is not `apiDescriptionRequest`.
    UnhandledType(String),
    /// Request targets another service or version.
    IdentityMismatch,
}

/// Parse and route a raw delivery body.
pub fn classify(body: &[u8], identity: &ServiceIdentity) -> Result<Inbound, ProtocolError> {
    let text = String::from_utf8_lossy(body);
    let value: Value = serde_json::from_str(&text)?;
    Ok(route(value, identity))
}

/// Route an already parsed JSON value.
#[must_use]
pub fn route(value: Value, identity: &ServiceIdentity) -> Inbound {
    let message_type = match &value {
        Value::Object(fields) => match fields.get("type").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => return Inbound::Ignored(IgnoreReason::MissingType),
        },
        _ => return Inbound::Ignored(IgnoreReason::NotAnObject),
    };

    if MessageType::from_wire(&message_type) != Some(MessageType::ApiDescriptionRequest) {
        return Inbound::Ignored(IgnoreReason::UnhandledType(message_type));
    }

    match ApiDescriptionRequest::from_value(value) {
        Some(request) if identity.matches(&request.service_name, &request.version) => {
            Inbound::DescriptionRequest(request)
        }
        _ => Inbound::Ignored(IgnoreReason::IdentityMismatch),
    }
}
