//! # tipstream-observability
//!
//! Logging for TipStream hosts.
//!
//! - [`init_tracing`]: `tracing-subscriber` setup with per-component levels,
//!   text or JSON output
//! - [`StatusTracker`]: turns successive `StreamState` snapshots into
//!   structured transition events

pub mod status;
pub mod tracing_setup;

pub use status::{StatusTracker, StreamChange};
pub use tracing_setup::{init_tracing, LogConfig};
