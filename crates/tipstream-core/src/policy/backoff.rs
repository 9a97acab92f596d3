//! Exponential backoff for push-transport reconnection.

use std::time::Duration;

/// Configuration for the reconnect backoff.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Maximum delay (caps exponential growth).
    pub max: Duration,
    /// Multiplier applied per failed attempt.
    pub multiplier: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

/// Stateless backoff policy: computes the delay for an attempt number.
///
/// The attempt counter itself lives with the caller so that a successful
/// handshake can reset it.
#[derive(Debug, Clone, Default)]
pub struct ReconnectBackoff {
    pub config: BackoffConfig,
}

impl ReconnectBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Returns the delay after the `attempt`-th consecutive failure (1-based).
    ///
    /// `initial * multiplier^(attempt - 1)`, capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let factor = self
            .config
            .multiplier
            .checked_pow(exp)
            .unwrap_or(u32::MAX);
        self.config
            .initial
            .checked_mul(factor)
            .map_or(self.config.max, |d| d.min(self.config.max))
    }
}
