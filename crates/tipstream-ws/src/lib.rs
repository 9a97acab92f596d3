//! tipstream-ws — WebSocket push transport.
//!
//! [`WsConnector`] opens one connection per attempt; reconnect policy is
//! owned by the stream engine, not by this crate.

pub mod client;

pub use client::{WsConnector, WsConnectorConfig, WsSession};
