//! Wei ↔ ether formatting.

use alloy_primitives::utils::{self, UnitsError};
use alloy_primitives::U256;

/// Format a wei amount as ether, trimming trailing zeros.
///
/// `1_000_000_000_000_000_000` → `"1"`, `123456789` → `"0.000000000123456789"`.
pub fn format_ether(wei: U256) -> String {
    trim_fraction(utils::format_ether(wei))
}

/// Format `value` with `decimals` fractional digits, trimming trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> Result<String, UnitsError> {
    utils::format_units(value, decimals).map(trim_fraction)
}

/// `"2.500"` → `"2.5"`, `"1.000"` → `"1"`.
fn trim_fraction(formatted: String) -> String {
    match formatted.split_once('.') {
        Some((int_part, frac)) => match frac.trim_end_matches('0') {
            "" => int_part.to_string(),
            frac => format!("{int_part}.{frac}"),
        },
        None => formatted,
    }
}
