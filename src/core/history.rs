use std::collections::VecDeque;
use uuid::Uuid;
use crate::models::{SwipeHistoryEntry, SwipePhase};

/// Number of recent swipes kept for undo
pub const DEFAULT_HISTORY_CAP: usize = 10;

/// Bounded undo stack of recent swipe decisions
///
/// New entries go on the back. Once the cap is exceeded the oldest entry is
/// evicted from the front. Undo only ever targets the back.
#[derive(Debug, Clone)]
pub struct SwipeHistory {
    entries: VecDeque<SwipeHistoryEntry>,
    cap: usize,
}

impl Default for SwipeHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl SwipeHistory {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            entries: VecDeque::with_capacity(cap + 1),
            cap,
        }
    }

    /// Append an entry, returning the evicted oldest entry if the cap was hit
    pub fn push(&mut self, entry: SwipeHistoryEntry) -> Option<SwipeHistoryEntry> {
        self.entries.push_back(entry);
        if self.entries.len() > self.cap {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn last(&self) -> Option<&SwipeHistoryEntry> {
        self.entries.back()
    }

    pub fn is_last(&self, id: Uuid) -> bool {
        self.last().map(|e| e.id == id).unwrap_or(false)
    }

    /// Remove an entry wherever it sits
    ///
    /// Concurrent swipes can push after the entry being rolled back, so
    /// rollback removes by id rather than popping the back.
    pub fn remove(&mut self, id: Uuid) -> Option<SwipeHistoryEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        self.entries.remove(index)
    }

    pub fn mark_persisted(&mut self, id: Uuid) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.phase = SwipePhase::Persisted;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&SwipeHistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &SwipeHistoryEntry> {
        self.entries.iter()
    }
}
