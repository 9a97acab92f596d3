//! Shared types for the tip stream.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ─── RawLog ───────────────────────────────────────────────────────────────────

/// A raw EVM log as returned by `eth_getLogs` or pushed by `eth_subscription`.
///
/// Every field except `topics`/`data` is optional: push payloads from some
/// gateways omit block metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default = "empty_data")]
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
}

fn empty_data() -> String {
    "0x".into()
}

impl RawLog {
    /// Block number as u64 (0 when absent or malformed).
    pub fn block_number_u64(&self) -> u64 {
        self.block_number.as_deref().map_or(0, parse_hex_u64)
    }

    /// Log index as u32 (0 when absent or malformed).
    pub fn log_index_u32(&self) -> u32 {
        self.log_index
            .as_deref()
            .map_or(0, |s| u32::try_from(parse_hex_u64(s)).unwrap_or(u32::MAX))
    }

    /// Transaction hash, `"0x"` when absent.
    pub fn tx_hash(&self) -> &str {
        self.transaction_hash.as_deref().unwrap_or("0x")
    }

    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }
}

/// Parse a hex-encoded string (with or without `0x`) to u64. Malformed
/// values read as 0.
pub fn parse_hex_u64(s: &str) -> u64 {
    try_parse_hex_u64(s).unwrap_or(0)
}

/// Strict variant of [`parse_hex_u64`].
pub fn try_parse_hex_u64(s: &str) -> Option<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}

/// Format a block number as a `0x`-prefixed quantity.
pub fn to_hex_quantity(n: u64) -> String {
    format!("{n:#x}")
}

// ─── LogFilter ────────────────────────────────────────────────────────────────

/// Which logs the stream follows: one contract, one event signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub address: String,
    /// Event signature hash (topic0). Empty = any event of the contract.
    pub topic0: String,
}

impl LogFilter {
    pub fn new(address: impl Into<String>, topic0: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            topic0: topic0.into(),
        }
    }

    fn topics(&self) -> Value {
        if self.topic0.is_empty() {
            Value::Null
        } else {
            json!([self.topic0])
        }
    }

    /// Filter object for `eth_subscribe("logs", …)`.
    pub fn subscription_params(&self) -> Value {
        let mut filter = json!({ "address": self.address });
        if !self.topic0.is_empty() {
            filter["topics"] = self.topics();
        }
        filter
    }

    /// Filter object for `eth_getLogs` / `eth_getLogsWithCursor`.
    pub fn range_params(&self, from_block: u64, cursor: Option<&str>) -> Value {
        let mut filter = self.subscription_params();
        filter["fromBlock"] = json!(to_hex_quantity(from_block));
        filter["toBlock"] = json!("latest");
        if let Some(cursor) = cursor {
            filter["cursor"] = json!(cursor);
        }
        filter
    }
}

// ─── TipEntry ─────────────────────────────────────────────────────────────────

/// A decoded `Tipped` event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipEntry {
    /// `"<txHash>:<logIndex>"`, the sole de-duplication key.
    pub id: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u32,
    /// Checksummed sender address.
    pub from: String,
    pub amount_wei: U256,
    /// Ether amount as a decimal string without trailing zeros.
    pub amount_eth: String,
    pub note: String,
    /// Unix seconds, as emitted by the contract.
    pub timestamp: u64,
}

impl TipEntry {
    /// Build the de-duplication id for a log position.
    pub fn make_id(tx_hash: &str, log_index: u32) -> String {
        format!("{tx_hash}:{log_index}")
    }
}

// ─── StreamState ──────────────────────────────────────────────────────────────

/// Connectivity status of the stream engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// No contract address configured.
    Idle,
    /// Attempting the push transport.
    Connecting,
    /// Push transport live.
    Connected,
    /// Pull transport active.
    Polling,
    /// Unrecoverable until an explicit reconnect.
    Error,
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Polling => write!(f, "polling"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Snapshot published by the engine after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    /// Newest first, at most 200 entries.
    pub tips: Vec<TipEntry>,
    pub status: StreamStatus,
    pub error: Option<String>,
}

impl StreamState {
    pub fn new(status: StreamStatus) -> Self {
        Self {
            tips: Vec::new(),
            status,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_log_from_rpc_json() {
        let log: RawLog = serde_json::from_str(
            r#"{
                "address":"0x2222222222222222222222222222222222222222",
                "topics":["0xabc"],
                "data":"0x",
                "blockNumber":"0x64",
                "transactionHash":"0xbbbb",
                "logIndex":"0x1",
                "blockHash":"0xignored"
            }"#,
        )
        .unwrap();
        assert_eq!(log.block_number_u64(), 100);
        assert_eq!(log.log_index_u32(), 1);
        assert_eq!(log.tx_hash(), "0xbbbb");
        assert!(!log.is_removed());
    }

    #[test]
    fn raw_log_defaults_when_metadata_missing() {
        let log: RawLog = serde_json::from_str(r#"{"topics":[]}"#).unwrap();
        assert_eq!(log.data, "0x");
        assert_eq!(log.block_number_u64(), 0);
        assert_eq!(log.log_index_u32(), 0);
        assert_eq!(log.tx_hash(), "0x");
    }

    #[test]
    fn hex_quantities() {
        assert_eq!(try_parse_hex_u64("0x1f"), Some(31));
        assert_eq!(try_parse_hex_u64("1f"), Some(31));
        assert_eq!(try_parse_hex_u64("0xzz"), None);
        assert_eq!(try_parse_hex_u64(""), None);
        assert_eq!(parse_hex_u64("0xzz"), 0);
    }

    #[test]
    fn range_params_carry_cursor() {
        let filter = LogFilter::new("0x22", "0xtopic");
        let params = filter.range_params(255, Some("next-page"));
        assert_eq!(params["fromBlock"], "0xff");
        assert_eq!(params["toBlock"], "latest");
        assert_eq!(params["topics"], json!(["0xtopic"]));
        assert_eq!(params["cursor"], "next-page");

        let first = filter.range_params(0, None);
        assert_eq!(first["fromBlock"], "0x0");
        assert!(first.get("cursor").is_none());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&StreamStatus::Polling).unwrap(), "\"polling\"");
        assert_eq!(StreamStatus::Connected.to_string(), "connected");
    }
}
