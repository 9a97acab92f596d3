//! Push-path wire handling: the `eth_subscribe` request and frame classification.

use serde_json::{json, Value};

use tipstream_core::request::{JsonRpcError, JsonRpcRequest};
use tipstream_core::types::{LogFilter, RawLog};

/// A classified push frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushFrame {
    /// `eth_subscription` notification carrying one log.
    Log(RawLog),
    /// Acknowledgement of our subscribe request, with the subscription id.
    Subscribed(String),
    /// Error reply to our subscribe request.
    SubscriptionFailed(JsonRpcError),
    /// Anything else (other ids, notifications without a result, ...).
    Ignored,
}

/// Build the `eth_subscribe("logs", filter)` request.
pub fn subscribe_request(id: u64, filter: &LogFilter) -> JsonRpcRequest {
    JsonRpcRequest::new(
        id,
        "eth_subscribe",
        vec![json!("logs"), filter.subscription_params()],
    )
}

/// Classify a text frame relative to the pending subscribe request `subscription_id`.
///
/// Only malformed JSON (or a log payload that is not log-shaped) is an error.
pub fn classify(text: &str, subscription_id: u64) -> Result<PushFrame, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;

    if value.get("method").and_then(Value::as_str) == Some("eth_subscription") {
        return match value.get("params").and_then(|p| p.get("result")) {
            Some(result) if !result.is_null() => {
                serde_json::from_value(result.clone()).map(PushFrame::Log)
            }
            _ => Ok(PushFrame::Ignored),
        };
    }

    if value.get("id").and_then(Value::as_u64) != Some(subscription_id) {
        return Ok(PushFrame::Ignored);
    }

    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        let err = serde_json::from_value::<JsonRpcError>(err.clone()).unwrap_or_else(|_| {
            JsonRpcError {
                code: 0,
                message: err.as_str().map_or_else(|| err.to_string(), str::to_owned),
                data: None,
            }
        });
        return Ok(PushFrame::SubscriptionFailed(err));
    }

    match value.get("result") {
        Some(Value::String(sub)) => Ok(PushFrame::Subscribed(sub.clone())),
        Some(other) if !other.is_null() => Ok(PushFrame::Subscribed(other.to_string())),
        _ => Ok(PushFrame::Ignored),
    }
}
