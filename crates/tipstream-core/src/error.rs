//! Error types shared across TipStream crates.

use std::time::Duration;

use thiserror::Error;

use crate::policy::rate_limit::{self, RateLimitHint};
use crate::request::JsonRpcError;

/// Errors that can occur during a pull or push transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, timeout, non-2xx, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// WebSocket connection/send/receive error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// The provider asked us to slow down.
    #[error("Rate limit exceeded (provider: {provider})")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Classify this error as rate limiting.
    ///
    /// Explicit [`TransportError::RateLimited`] errors always qualify; any
    /// other error qualifies when its message matches a rate-limit phrase.
    pub fn rate_limit_hint(&self) -> Option<RateLimitHint> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(RateLimitHint {
                retry_after: *retry_after,
            }),
            Self::Rpc(err) => rate_limit::detect(&err.message),
            other => rate_limit::detect(&other.to_string()),
        }
    }

    /// Returns `true` if the node rejected the method itself
    /// (e.g. `eth_getLogsWithCursor` on a node without cursor support).
    pub fn is_method_unsupported(&self) -> bool {
        let Self::Rpc(err) = self else {
            return false;
        };
        if err.code == -32601 {
            return true;
        }
        let msg = err.message.to_ascii_lowercase();
        ["method not found", "not supported", "does not exist", "unsupported method"]
            .iter()
            .any(|needle| msg.contains(needle))
    }
}

/// Errors raised while decoding a single log.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("ABI decode failed: {reason}")]
    AbiDecodeFailed { reason: String },

    #[error("Invalid raw log: {reason}")]
    InvalidRawEvent { reason: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid contract address '{value}' (expected 0x followed by 40 hex chars)")]
    InvalidAddress { value: String },

    #[error("invalid value for {key}: '{value}'")]
    InvalidNumber { key: String, value: String },
}

/// Errors from the persisted transport-mode store.
#[derive(Debug, Error)]
pub enum ModeStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
