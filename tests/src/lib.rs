//! # Registry Client Test Suite
//!
//! End-to-end scenarios run against the in-memory broker, with the tokio
//! clock paused wherever heartbeat timing matters.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── protocol_flows.rs     # init, inbound requests, answers
//!     ├── heartbeat_schedule.rs # timer cadence and timestamps
//!     └── lifecycle.rs          # close, shared broker, multiple services
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p registry-tests
//! cargo test -p registry-tests integration::heartbeat_schedule
//! ```

#![allow(dead_code)]

pub mod integration;
