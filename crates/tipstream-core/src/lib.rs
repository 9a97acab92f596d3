//! tipstream-core — foundation types and seams for TipStream.
//!
//! # Overview
//!
//! TipStream keeps a live, de-duplicated view of `Tipped` events emitted by
//! the MegaTip `TipJar` contract. The core crate defines:
//!
//! - [`TipEntry`] / [`RawLog`] / [`StreamState`] — the data model
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`] — wire types
//! - [`RpcTransport`] / [`PushConnector`] — pull and push transport seams
//! - [`LogDecoder`] — the seam for the ABI decoder
//! - [`policy`] module — reconnect backoff and rate-limit detection
//! - [`StreamConfig`] — environment-driven configuration
//! - [`TransportControls`] — cautious/normal mode toggle with persistence

pub mod chain;
pub mod config;
pub mod decoder;
pub mod error;
pub mod mode;
pub mod policy;
pub mod request;
pub mod transport;
pub mod types;

pub use chain::ChainDescriptor;
pub use config::StreamConfig;
pub use decoder::LogDecoder;
pub use error::{ConfigError, DecodeError, TransportError};
pub use mode::{SliderFlag, TransportControls, TransportMode};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use transport::{PushConnector, PushSession, RpcTransport};
pub use types::{LogFilter, RawLog, StreamState, StreamStatus, TipEntry};
