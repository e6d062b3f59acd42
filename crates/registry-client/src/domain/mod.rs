//! # Domain Layer
//!
//! Protocol rules with no I/O: error taxonomy and inbound classification.

pub mod errors;
pub mod inbound;

pub use errors::RegistryError;
pub use inbound::{classify, route, IgnoreReason, Inbound};
