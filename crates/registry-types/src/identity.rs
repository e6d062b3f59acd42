//! # Service Identity
//!
//! Identifies this agent to the registry office.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The `(service_name, version)` pair a client registers under.
///
/// Supplied once at construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIdentity {
    /// Name of the service, e.g. `invoicing`.
    pub service_name: String,
    /// Version of the service, e.g. `1.0.0`.
    pub version: String,
}

impl ServiceIdentity {
    /// Create a new identity.
    pub fn new(service_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            version: version.into(),
        }
    }

    /// Exact, case-sensitive match against a claimed name and version.
    ///
    /// Pure predicate: used to decide whether an inbound request targets us.
    #[must_use]
    pub fn matches(&self, service_name: &str, version: &str) -> bool {
        self.service_name == service_name && self.version == version
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.service_name, self.version)
    }
}
