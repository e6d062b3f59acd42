//! # Registry Bus - Protocol Event Delivery
//!
//! Carries every externally visible effect of the registration protocol to
//! the caller as exactly one of four events.
//!
//! ```text
//! ┌──────────────────┐                 ┌──────────────┐
//! │  RegistryClient  │   publish()     │              │
//! │ (timer, consumer)│ ──────┐         │    Caller    │
//! └──────────────────┘       │         │              │
//!                            ▼         └──────────────┘
//!                   ┌────────────────┐        ↑
//!                   │ InMemoryEventBus│ ──────┘
//!                   └────────────────┘  subscribe()
//! ```
//!
//! ## Delivery Rules
//!
//! - Events reach subscribers in the order the producing operations completed.
//! - Subscribers only see events published after they subscribed.
//! - An event published with no subscriber is dropped; the protocol continues.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventKind, RegistryEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the slowest one lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
