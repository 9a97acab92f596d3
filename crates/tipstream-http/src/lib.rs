//! tipstream-http — HTTP JSON-RPC transport used by the polling fallback.

pub mod client;

pub use client::{HttpClientConfig, HttpRpcClient};
