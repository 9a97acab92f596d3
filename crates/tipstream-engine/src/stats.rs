//! Aggregates over the tip history: volume, tippers, largest tip, rate.

use std::collections::HashSet;

use alloy_primitives::U256;
use serde::Serialize;

use tipstream_core::types::TipEntry;
use tipstream_evm::format_ether;

/// Default rate window in minutes.
pub const DEFAULT_WINDOW_MINUTES: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TipStats {
    pub total_wei: U256,
    pub total_eth: String,
    /// Distinct senders, compared case-insensitively.
    pub unique_tippers: usize,
    pub largest_wei: U256,
    pub largest_eth: String,
    pub tips_in_window: usize,
    pub tips_per_minute: f64,
    pub window_minutes: u64,
}

impl TipStats {
    /// Compute stats as of `now_unix_secs`.
    ///
    /// The rate divides the tips inside the window by the time since the
    /// oldest of them, clamped to between one minute and the full window.
    pub fn compute(tips: &[TipEntry], now_unix_secs: u64, window_minutes: u64) -> Self {
        let total_wei = tips
            .iter()
            .fold(U256::ZERO, |acc, tip| acc.saturating_add(tip.amount_wei));
        let largest_wei = tips
            .iter()
            .map(|tip| tip.amount_wei)
            .max()
            .unwrap_or(U256::ZERO);
        let unique_tippers = tips
            .iter()
            .map(|tip| tip.from.to_ascii_lowercase())
            .collect::<HashSet<_>>()
            .len();

        let window_secs = window_minutes.saturating_mul(60);
        let threshold = now_unix_secs.saturating_sub(window_secs);
        let in_window: Vec<&TipEntry> = tips.iter().filter(|t| t.timestamp >= threshold).collect();

        let tips_per_minute = match in_window.iter().map(|t| t.timestamp).min() {
            Some(oldest) => {
                let elapsed = now_unix_secs
                    .saturating_sub(oldest)
                    .min(window_secs)
                    .max(60);
                in_window.len() as f64 / (elapsed as f64 / 60.0)
            }
            None => 0.0,
        };

        Self {
            total_eth: format_ether(total_wei),
            total_wei,
            unique_tippers,
            largest_eth: format_ether(largest_wei),
            largest_wei,
            tips_in_window: in_window.len(),
            tips_per_minute,
            window_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETH: u64 = 1_000_000_000_000_000_000;

    fn tip(id: &str, from: &str, wei: u64, timestamp: u64) -> TipEntry {
        TipEntry {
            id: id.into(),
            tx_hash: id.into(),
            block_number: 1,
            log_index: 0,
            from: from.into(),
            amount_wei: U256::from(wei),
            amount_eth: format_ether(U256::from(wei)),
            note: String::new(),
            timestamp,
        }
    }

    #[test]
    fn empty_history() {
        let stats = TipStats::compute(&[], 1_000, DEFAULT_WINDOW_MINUTES);
        assert_eq!(stats.total_wei, U256::ZERO);
        assert_eq!(stats.total_eth, "0");
        assert_eq!(stats.unique_tippers, 0);
        assert_eq!(stats.tips_per_minute, 0.0);
    }

    #[test]
    fn totals_and_case_insensitive_tippers() {
        let tips = [
            tip("a", "0xAbC0000000000000000000000000000000000001", ETH, 0),
            tip("b", "0xabc0000000000000000000000000000000000001", ETH / 2, 0),
            tip("c", "0x2222222222222222222222222222222222222222", 2 * ETH, 0),
        ];
        let stats = TipStats::compute(&tips, 10_000, DEFAULT_WINDOW_MINUTES);
        assert_eq!(stats.total_eth, "3.5");
        assert_eq!(stats.unique_tippers, 2);
        assert_eq!(stats.largest_eth, "2");
        assert_eq!(stats.tips_in_window, 0);
    }

    #[test]
    fn rate_uses_at_least_one_minute() {
        let now = 10_000;
        let tips = [tip("a", "0x1", 1, now - 10), tip("b", "0x2", 1, now - 5)];
        let stats = TipStats::compute(&tips, now, DEFAULT_WINDOW_MINUTES);
        assert_eq!(stats.tips_in_window, 2);
        assert!((stats.tips_per_minute - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rate_over_elapsed_span() {
        let now = 10_000;
        let tips = [
            tip("a", "0x1", 1, now - 240),
            tip("b", "0x2", 1, now - 120),
            tip("c", "0x3", 1, now),
            // outside the 10-minute window
            tip("d", "0x4", 1, now - 3_600),
        ];
        let stats = TipStats::compute(&tips, now, DEFAULT_WINDOW_MINUTES);
        assert_eq!(stats.tips_in_window, 3);
        assert!((stats.tips_per_minute - 0.75).abs() < 1e-9);
    }
}
