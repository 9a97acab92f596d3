//! `LogDecoder` trait: the seam between the stream engine and the ABI library.

use crate::error::DecodeError;
use crate::types::{RawLog, TipEntry};

/// Turns raw contract logs into [`TipEntry`] records.
///
/// Implementations must be cheap to call per log and must not panic on
/// malformed input; the engine logs and drops any `Err`.
pub trait LogDecoder: Send + Sync {
    /// The event signature hash (topic0) the stream subscribes to.
    fn topic0(&self) -> String;

    /// Decode a log.
    ///
    /// Returns `Ok(None)` when the log is not the expected event.
    fn decode(&self, log: &RawLog) -> Result<Option<TipEntry>, DecodeError>;
}
