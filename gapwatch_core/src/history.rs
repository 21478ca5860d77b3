use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::table::Outcome;

/// Default bound on stored outcomes.
pub const DEFAULT_HISTORY_CAPACITY: usize = 150;

/// Bounded outcome sequence with a linear undo/redo pointer.
///
/// `pointer == None` means the live head is shown. `Some(p)` means the view is
/// the prefix `sequence[..=p]`, and then always `p < len - 1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawHistory")]
pub struct OutcomeHistory {
    sequence: Vec<Outcome>,
    pointer: Option<usize>,
    capacity: usize,
}

#[derive(Deserialize)]
struct RawHistory {
    sequence: Vec<Outcome>,
    pointer: Option<usize>,
    capacity: usize,
}

impl From<RawHistory> for OutcomeHistory {
    fn from(raw: RawHistory) -> Self {
        OutcomeHistory::from_parts(raw.capacity, raw.sequence, raw.pointer)
    }
}

impl Default for OutcomeHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl OutcomeHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sequence: Vec::new(),
            pointer: None,
            capacity: capacity.max(1),
        }
    }

    /// Rebuild from stored parts, trimming to capacity and dropping a pointer
    /// that no longer names an undo position.
    pub fn from_parts(capacity: usize, sequence: Vec<Outcome>, pointer: Option<usize>) -> Self {
        let mut h = Self::with_capacity(capacity);
        h.sequence = sequence;
        let evicted = h.evict();
        h.pointer = pointer
            .and_then(|p| p.checked_sub(evicted))
            .filter(|&p| p + 1 < h.sequence.len());
        h
    }

    fn evict(&mut self) -> usize {
        let overflow = self.sequence.len().saturating_sub(self.capacity);
        if overflow > 0 {
            self.sequence.drain(..overflow);
            trace!(overflow, capacity = self.capacity, "history evicted oldest outcomes");
        }
        overflow
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored length, regardless of pointer.
    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    #[inline]
    pub fn pointer(&self) -> Option<usize> {
        self.pointer
    }

    /// Raw stored sequence (what export serializes).
    pub fn stored(&self) -> &[Outcome] {
        &self.sequence
    }

    /// Pointer-selected prefix. The only view analysis may consume.
    pub fn active(&self) -> &[Outcome] {
        match self.pointer {
            None => &self.sequence,
            Some(p) => &self.sequence[..=p],
        }
    }

    /// Append at the current position, discarding any redo branch first.
    pub fn append(&mut self, outcome: Outcome) {
        if let Some(p) = self.pointer.take() {
            self.sequence.truncate(p + 1);
        }
        self.sequence.push(outcome);
        self.evict();
    }

    pub fn can_undo(&self) -> bool {
        match self.pointer {
            None => self.sequence.len() >= 2,
            Some(p) => p > 0,
        }
    }

    pub fn can_redo(&self) -> bool {
        self.pointer.is_some()
    }

    /// Step back one outcome. Returns false when already at the earliest state.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.pointer = match self.pointer {
            None => Some(self.sequence.len() - 2),
            Some(p) => Some(p - 1),
        };
        true
    }

    /// Step forward one outcome, snapping to the head sentinel at the end.
    pub fn redo(&mut self) -> bool {
        let Some(p) = self.pointer else {
            return false;
        };
        let next = p + 1;
        self.pointer = if next + 1 >= self.sequence.len() { None } else { Some(next) };
        true
    }

    pub fn clear(&mut self) {
        self.sequence.clear();
        self.pointer = None;
    }

    /// Wholesale substitution. Keeps the most recent `capacity` outcomes.
    pub fn replace(&mut self, sequence: Vec<Outcome>) {
        self.sequence = sequence;
        self.pointer = None;
        self.evict();
    }
}
