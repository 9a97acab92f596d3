//! `TipJarDecoder` — the [`LogDecoder`] implementation for `Tipped` logs.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, U256};
use tipstream_core::{
    decoder::LogDecoder,
    error::DecodeError,
    types::{RawLog, TipEntry},
};

use crate::{abi::TIPPED_SIGNATURE, fingerprint, units};

/// Decodes `Tipped(address indexed from, uint256 amount, string note, uint256 timestamp)`.
/// Thread-safe, cheap to clone.
#[derive(Debug, Clone)]
pub struct TipJarDecoder {
    topic0: String,
    body: DynSolType,
}

impl Default for TipJarDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TipJarDecoder {
    pub fn new() -> Self {
        Self {
            topic0: fingerprint::keccak256_signature(TIPPED_SIGNATURE),
            body: DynSolType::Tuple(vec![
                DynSolType::Uint(256),
                DynSolType::String,
                DynSolType::Uint(256),
            ]),
        }
    }

    /// Indexed `address` topic: 32 bytes, address in the low 20.
    fn decode_address_topic(topic: &str) -> Result<Address, DecodeError> {
        let bytes = decode_hex(topic)?;
        if bytes.len() != 32 {
            return Err(DecodeError::InvalidRawEvent {
                reason: format!("address topic is {} bytes, expected 32", bytes.len()),
            });
        }
        Ok(Address::from_slice(&bytes[12..]))
    }

    fn decode_body(&self, data: &str) -> Result<(U256, String, U256), DecodeError> {
        let bytes = decode_hex(data)?;
        let decoded = self
            .body
            .abi_decode_params(&bytes)
            .map_err(|e| {
                tracing::debug!(error = %e, bytes = bytes.len(), "Tipped body did not decode");
                DecodeError::AbiDecodeFailed {
                    reason: e.to_string(),
                }
            })?;

        let values = match decoded {
            DynSolValue::Tuple(vals) => vals,
            other => vec![other],
        };
        match <[DynSolValue; 3]>::try_from(values) {
            Ok([DynSolValue::Uint(amount, _), DynSolValue::String(note), DynSolValue::Uint(ts, _)]) => {
                Ok((amount, note, ts))
            }
            _ => Err(DecodeError::AbiDecodeFailed {
                reason: "Tipped body is not (uint256,string,uint256)".into(),
            }),
        }
    }
}

impl LogDecoder for TipJarDecoder {
    fn topic0(&self) -> String {
        self.topic0.clone()
    }

    fn decode(&self, log: &RawLog) -> Result<Option<TipEntry>, DecodeError> {
        let Some(first) = log.topics.first() else {
            tracing::trace!(tx = log.tx_hash(), "log without topics skipped");
            return Ok(None);
        };
        if !fingerprint::matches(first, &self.topic0) {
            tracing::trace!(tx = log.tx_hash(), topic0 = %first, "not a Tipped log");
            return Ok(None);
        }

        let Some(from_topic) = log.topics.get(1) else {
            tracing::debug!(tx = log.tx_hash(), "Tipped log without indexed sender");
            return Err(DecodeError::MissingField {
                field: "from".into(),
            });
        };
        let from = Self::decode_address_topic(from_topic)?;
        let (amount, note, timestamp) = self.decode_body(&log.data)?;

        let tx_hash = log.tx_hash().to_string();
        let log_index = log.log_index_u32();
        Ok(Some(TipEntry {
            id: TipEntry::make_id(&tx_hash, log_index),
            tx_hash,
            block_number: log.block_number_u64(),
            log_index,
            from: from.to_checksum(None),
            amount_eth: units::format_ether(amount),
            amount_wei: amount,
            note,
            timestamp: u64::try_from(timestamp).unwrap_or(u64::MAX),
        }))
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, DecodeError> {
    let h = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(h).map_err(|e| DecodeError::InvalidRawEvent {
        reason: format!("invalid hex: {e}"),
    })
}
