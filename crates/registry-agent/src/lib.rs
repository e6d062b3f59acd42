//! # Registry Agent
//!
//! Process wrapper around `registry-client`: configuration from the
//! environment, structured logging, and a runtime that answers API
//! description requests with a fixed document.
//!
//! ## Modules
//!
//! - `config/` - CLI flags and environment variables
//! - `description/` - the served API description
//! - `logging/` - tracing subscriber setup
//! - `runtime/` - startup, event loop and shutdown

pub mod config;
pub mod description;
pub mod logging;
pub mod runtime;

pub use config::AgentConfig;
pub use description::{default_description, load_description, DescriptionError};
pub use logging::init_logging;
pub use runtime::AgentRuntime;
