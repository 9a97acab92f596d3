//! EVM event fingerprint computation.
//!
//! The fingerprint of an EVM event is the keccak256 hash of its canonical
//! signature string; for raw logs it is simply `topics[0]`.

use tiny_keccak::{Hasher, Keccak};

/// keccak256 of an event signature as a `0x`-prefixed lowercase hex string.
pub fn keccak256_signature(signature: &str) -> String {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut output);
    format!("0x{}", hex::encode(output))
}

/// Returns `true` if `topic` is the given fingerprint, ignoring hex case.
pub fn matches(topic: &str, fingerprint: &str) -> bool {
    topic.eq_ignore_ascii_case(fingerprint)
}
