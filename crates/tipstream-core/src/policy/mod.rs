//! Scheduling policies used by the stream engine.
//!
//! ```text
//! push failure  → [ReconnectBackoff] → next connect attempt
//! poll failure  → [rate_limit::detect] → delay hint | failure count
//! ```

pub mod backoff;
pub mod rate_limit;

pub use backoff::{BackoffConfig, ReconnectBackoff};
pub use rate_limit::RateLimitHint;
