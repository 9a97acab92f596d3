//! Rate-limit detection from provider error messages.
//!
//! Providers report throttling in prose, e.g.
//! `"request limit reached, retry in 5 seconds"` or `"429 Too Many Requests"`.
//! Detection is substring/pattern based; a match is a scheduling hint, never
//! a failure.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Delay applied when a rate-limit response carries no explicit hint.
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(30);

/// A detected rate limit, with the provider's suggested delay if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHint {
    pub retry_after: Option<Duration>,
}

impl RateLimitHint {
    /// The delay to honour: the suggestion, or [`DEFAULT_RATE_LIMIT_DELAY`].
    pub fn delay(&self) -> Duration {
        self.retry_after.unwrap_or(DEFAULT_RATE_LIMIT_DELAY)
    }
}

fn retry_in_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)retry\s+(?:in|after)\s+(\d+(?:\.\d+)?)\s*(ms|milliseconds?|s|secs?|seconds?)?\b")
                .ok()
        })
        .as_ref()
}

const RATE_LIMIT_PHRASES: &[&str] = &[
    "429",
    "too many requests",
    "rate limit",
    "rate-limit",
    "ratelimit",
    "rate limited",
];

/// Detect a rate-limit message. Returns `None` for ordinary errors.
pub fn detect(message: &str) -> Option<RateLimitHint> {
    if let Some(caps) = retry_in_pattern().and_then(|re| re.captures(message)) {
        let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
        let millis = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
            Some(unit) if unit.starts_with("ms") || unit.starts_with("milli") => amount,
            _ => amount * 1_000.0,
        };
        return Some(RateLimitHint {
            retry_after: Some(Duration::from_millis(millis.ceil() as u64)),
        });
    }

    let lower = message.to_ascii_lowercase();
    RATE_LIMIT_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
        .then_some(RateLimitHint { retry_after: None })
}
