//! Stream configuration.
//!
//! Loaded from the process environment at startup. Every variable is looked
//! up with the `NEXT_PUBLIC_` prefix first, then `PUBLIC_`, so the same `.env`
//! file serves the web client and native hosts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mode::{SliderFlag, TransportMode};

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
/// Minimum polling interval in cautious mode.
pub const CAUTIOUS_POLL_INTERVAL_MS: u64 = 20_000;
/// Default number of WebSocket attempts before falling back to polling.
pub const DEFAULT_MAX_WS_RETRIES: u32 = 3;
/// Cursor pages drained per poll tick.
pub const DEFAULT_MAX_PAGES_PER_TICK: usize = 3;
pub const CAUTIOUS_MAX_PAGES_PER_TICK: usize = 1;

/// Top-level configuration for a tip stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// TipJar contract address. `None` leaves the engine idle.
    #[serde(default)]
    pub contract_address: Option<String>,
    /// WebSocket endpoint for `eth_subscribe`.
    #[serde(default)]
    pub push_url: Option<String>,
    /// HTTP JSON-RPC endpoint for polling.
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_ws_retries")]
    pub max_ws_retries: u32,
    /// Mode-toggle feature flag.
    #[serde(default)]
    pub slider: SliderFlag,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_max_ws_retries() -> u32 {
    DEFAULT_MAX_WS_RETRIES
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            contract_address: None,
            push_url: None,
            rpc_url: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_ws_retries: DEFAULT_MAX_WS_RETRIES,
            slider: SliderFlag::Hidden,
        }
    }
}

impl StreamConfig {
    /// Create a config for a single contract and pair of endpoints.
    pub fn new(
        contract_address: impl Into<String>,
        push_url: Option<String>,
        rpc_url: Option<String>,
    ) -> Self {
        Self {
            contract_address: Some(contract_address.into()),
            push_url,
            rpc_url,
            ..Self::default()
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| -> Option<String> {
            ["NEXT_PUBLIC_", "PUBLIC_"]
                .iter()
                .find_map(|prefix| lookup(&format!("{prefix}{name}")))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let contract_address = get("TIPJAR_ADDRESS")
            .map(|addr| validate_address(&addr).map(|_| addr))
            .transpose()?;

        let push_url = get("REALTIME_WS").or_else(|| get("RPC_WS"));
        let rpc_url = get("RPC_HTTP");

        let poll_interval_ms = match get("TIPSTREAM_POLL_MS") {
            Some(v) => match parse_number::<u64>("TIPSTREAM_POLL_MS", &v)? {
                0 => {
                    return Err(ConfigError::InvalidNumber {
                        key: "TIPSTREAM_POLL_MS".into(),
                        value: v,
                    })
                }
                ms => ms,
            },
            None => DEFAULT_POLL_INTERVAL_MS,
        };
        let max_ws_retries = match get("TIPSTREAM_MAX_WS_RETRIES") {
            Some(v) => parse_number("TIPSTREAM_MAX_WS_RETRIES", &v)?,
            None => DEFAULT_MAX_WS_RETRIES,
        };
        let slider = SliderFlag::parse(get("TRANSPORT_SLIDER_MODE").as_deref());

        Ok(Self {
            contract_address,
            push_url,
            rpc_url,
            poll_interval_ms,
            max_ws_retries,
            slider,
        })
    }

    /// Resolve the effective transport settings for `mode`.
    pub fn settings(&self, mode: TransportMode) -> TransportSettings {
        let base = Duration::from_millis(self.poll_interval_ms);
        match mode {
            TransportMode::Normal => TransportSettings {
                mode,
                poll_interval: base,
                max_ws_retries: self.max_ws_retries,
                max_pages_per_tick: DEFAULT_MAX_PAGES_PER_TICK,
            },
            TransportMode::Cautious => TransportSettings {
                mode,
                poll_interval: base.max(Duration::from_millis(CAUTIOUS_POLL_INTERVAL_MS)),
                max_ws_retries: 0,
                max_pages_per_tick: CAUTIOUS_MAX_PAGES_PER_TICK,
            },
        }
    }
}

/// Per-mode knobs derived from [`StreamConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    pub mode: TransportMode,
    pub poll_interval: Duration,
    /// 0 disables the push transport.
    pub max_ws_retries: u32,
    pub max_pages_per_tick: usize,
}

/// Check `0x` + 40 hex characters.
pub fn validate_address(value: &str) -> Result<(), ConfigError> {
    let hex = value.strip_prefix("0x").unwrap_or("");
    if hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidAddress {
            value: value.to_string(),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}
