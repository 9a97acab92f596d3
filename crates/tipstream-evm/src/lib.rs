//! # tipstream-evm
//!
//! Decoder for the MegaTip `TipJar` contract's `Tipped` event.
//!
//! ## Implementation notes
//! - Uses `alloy-core` dyn-abi for ABI decode
//! - topics[0] → event signature (keccak256 of the canonical signature)
//! - topics[1] → indexed `from` address
//! - `data` → `(uint256 amount, string note, uint256 timestamp)`

pub mod abi;
pub mod decoder;
pub mod fingerprint;
pub mod units;

pub use abi::{TIPJAR_ABI, TIPPED_SIGNATURE};
pub use decoder::TipJarDecoder;
pub use units::format_ether;
