//! De-duplicated, newest-first tip history.

use std::collections::HashSet;

use tipstream_core::types::TipEntry;

/// Maximum number of tips retained.
pub const MAX_TIPS: usize = 200;

/// Tip history keyed by `TipEntry::id`.
///
/// Ids are remembered for the life of the book, so a tip evicted by the cap
/// is never re-inserted by a late duplicate delivery.
#[derive(Debug, Default)]
pub struct TipBook {
    tips: Vec<TipEntry>,
    seen: HashSet<String>,
}

impl TipBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch in arrival order. Each new entry lands in front of the
    /// ones before it; the list is then truncated to [`MAX_TIPS`].
    ///
    /// Returns the number of entries actually inserted.
    pub fn insert_batch(&mut self, entries: impl IntoIterator<Item = TipEntry>) -> usize {
        let mut fresh: Vec<TipEntry> = entries
            .into_iter()
            .filter(|entry| self.seen.insert(entry.id.clone()))
            .collect();
        if fresh.is_empty() {
            return 0;
        }

        let added = fresh.len();
        fresh.reverse();
        fresh.append(&mut self.tips);
        fresh.truncate(MAX_TIPS);
        self.tips = fresh;
        added
    }

    /// Newest first.
    pub fn tips(&self) -> &[TipEntry] {
        &self.tips
    }
}
