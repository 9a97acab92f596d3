//! tipstream-engine — the live tip stream.
//!
//! # Architecture
//!
//! ```text
//! TipStreamBuilder → TipStream (handle) ──commands──▶ driver task
//!                         ▲                             ├── push: PushConnector + frame classification
//!                         └───watch<StreamState>────────├── pull: LogPoller (cursor pages, head window)
//!                                                       ├── TipBook (dedup, newest-first, cap 200)
//!                                                       └── LogDecoder
//! ```
//!
//! The driver prefers push delivery and degrades to polling after repeated
//! push failures, or immediately in cautious mode.

pub mod book;
pub mod builder;
pub mod engine;
pub mod pull;
pub mod push;
pub mod stats;

pub use book::{TipBook, MAX_TIPS};
pub use builder::TipStreamBuilder;
pub use engine::TipStream;
pub use pull::LogPoller;
pub use stats::TipStats;
