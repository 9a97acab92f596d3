//! Structured logging of stream state changes.

use tipstream_core::types::{StreamState, StreamStatus, TipEntry};

/// What changed between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChange {
    Status {
        from: Option<StreamStatus>,
        to: StreamStatus,
        error: Option<String>,
    },
    Error(String),
    NewTips(Vec<TipEntry>),
}

/// Remembers the last snapshot and reports the difference to the next one.
#[derive(Debug, Default)]
pub struct StatusTracker {
    status: Option<StreamStatus>,
    error: Option<String>,
    newest_id: Option<String>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `state` with the previous snapshot, emit a tracing event per
    /// change and return the changes.
    ///
    /// New tips are those ahead of the previously newest tip, oldest first.
    pub fn observe(&mut self, state: &StreamState) -> Vec<StreamChange> {
        let mut changes = Vec::new();

        if self.status != Some(state.status) {
            match state.status {
                StreamStatus::Error => tracing::error!(
                    from = ?self.status,
                    to = %state.status,
                    error = state.error.as_deref(),
                    "stream status changed"
                ),
                _ => tracing::info!(
                    from = ?self.status,
                    to = %state.status,
                    error = state.error.as_deref(),
                    "stream status changed"
                ),
            }
            changes.push(StreamChange::Status {
                from: self.status,
                to: state.status,
                error: state.error.clone(),
            });
            self.status = Some(state.status);
        } else if state.error != self.error {
            if let Some(err) = &state.error {
                tracing::warn!(status = %state.status, error = %err, "stream error");
                changes.push(StreamChange::Error(err.clone()));
            }
        }
        self.error = state.error.clone();

        let fresh: Vec<TipEntry> = state
            .tips
            .iter()
            .take_while(|tip| Some(&tip.id) != self.newest_id.as_ref())
            .cloned()
            .collect();
        if !fresh.is_empty() {
            self.newest_id = state.tips.first().map(|tip| tip.id.clone());
            for tip in fresh.iter().rev() {
                tracing::info!(
                    id = %tip.id,
                    from = %tip.from,
                    amount_eth = %tip.amount_eth,
                    block = tip.block_number,
                    "tip received"
                );
            }
            changes.push(StreamChange::NewTips(fresh.into_iter().rev().collect()));
        }

        changes
    }
}
