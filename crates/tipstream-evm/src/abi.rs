//! The `TipJar` contract ABI.

use alloy_json_abi::{Event, JsonAbi};

/// Canonical signature of the event the stream follows.
pub const TIPPED_SIGNATURE: &str = "Tipped(address,uint256,string,uint256)";

/// Full `TipJar` ABI (constructor, events, functions) as JSON.
pub const TIPJAR_ABI: &str = r#"[
  {"type":"constructor","inputs":[{"name":"_owner","type":"address","internalType":"address"}],"stateMutability":"nonpayable"},
  {"type":"event","name":"Tipped","anonymous":false,"inputs":[
    {"indexed":true,"name":"from","type":"address","internalType":"address"},
    {"indexed":false,"name":"amount","type":"uint256","internalType":"uint256"},
    {"indexed":false,"name":"note","type":"string","internalType":"string"},
    {"indexed":false,"name":"timestamp","type":"uint256","internalType":"uint256"}
  ]},
  {"type":"event","name":"Withdraw","anonymous":false,"inputs":[
    {"indexed":true,"name":"to","type":"address","internalType":"address"},
    {"indexed":false,"name":"amount","type":"uint256","internalType":"uint256"}
  ]},
  {"type":"function","stateMutability":"view","name":"MAX_NOTE_LENGTH","inputs":[],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}]},
  {"type":"function","stateMutability":"view","name":"owner","inputs":[],"outputs":[{"name":"","type":"address","internalType":"address"}]},
  {"type":"function","stateMutability":"payable","name":"tip","inputs":[{"name":"note","type":"string","internalType":"string"}],"outputs":[]},
  {"type":"function","stateMutability":"view","name":"tipsByUser","inputs":[{"name":"","type":"address","internalType":"address"}],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}]},
  {"type":"function","stateMutability":"view","name":"totalTips","inputs":[],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}]},
  {"type":"function","stateMutability":"nonpayable","name":"withdraw","inputs":[
    {"name":"to","type":"address","internalType":"address payable"},
    {"name":"amount","type":"uint256","internalType":"uint256"}
  ],"outputs":[]}
]"#;

/// Parse [`TIPJAR_ABI`].
pub fn parse_abi() -> Result<JsonAbi, serde_json::Error> {
    serde_json::from_str(TIPJAR_ABI)
}

/// Look up an event by name in the parsed ABI.
pub fn event(abi: &JsonAbi, name: &str) -> Option<Event> {
    abi.events.get(name).and_then(|overloads| overloads.first().cloned())
}
