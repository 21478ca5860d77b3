use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::table::{Outcome, OutcomeSet};

// ---------------------------------------------------------------------
// Map-then-analyze gap statistics
// ---------------------------------------------------------------------

/// Gap statistics for one member set over one history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapStats {
    /// Outcomes since the most recent member; history length if none occurred.
    pub last_seen_ago: usize,
    /// Longest run of non-members, including runs touching either end.
    pub longest_gap: usize,
}

/// Per-target entry of a `GapMap`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapEntry {
    pub stats: GapStats,
    /// `true` = member hit, oldest first.
    pub hit_miss: Vec<bool>,
}

/// Target id -> entry. Ordered by id so iteration is deterministic.
pub type GapMap = BTreeMap<String, GapEntry>;

/// Anything whose gaps can be tracked: generated entities and trackers.
pub trait GapTarget {
    fn target_id(&self) -> &str;
    fn members(&self) -> OutcomeSet;
}

/// Map step: one bit per outcome, `true` when it is a member.
pub fn map_hits(history: &[Outcome], members: OutcomeSet) -> Vec<bool> {
    history.iter().map(|o| members.contains(*o)).collect()
}

/// Analyze step: one backward scan from the most recent outcome.
pub fn analyze(bits: &[bool]) -> GapStats {
    let mut last_seen_ago: Option<usize> = None;
    let mut longest_gap = 0usize;
    let mut current_gap = 0usize;

    for (i, &hit) in bits.iter().enumerate().rev() {
        if hit {
            longest_gap = longest_gap.max(current_gap);
            if last_seen_ago.is_none() {
                last_seen_ago = Some(bits.len() - 1 - i);
            }
            current_gap = 0;
        } else {
            current_gap += 1;
        }
    }

    // gap reaching the oldest outcome
    longest_gap = longest_gap.max(current_gap);

    GapStats {
        last_seen_ago: last_seen_ago.unwrap_or(bits.len()),
        longest_gap,
    }
}

/// Outcomes since any member last occurred.
pub fn spins_since_hit(history: &[Outcome], members: OutcomeSet) -> usize {
    history
        .iter()
        .rev()
        .position(|o| members.contains(*o))
        .unwrap_or(history.len())
}

/// Longest run of non-members in `history`.
pub fn longest_gap(history: &[Outcome], members: OutcomeSet) -> usize {
    history
        .split(|o| members.contains(*o))
        .map(<[Outcome]>::len)
        .max()
        .unwrap_or(0)
}

/// Full mode: map and analyze the whole history for every target. Stateless.
pub fn recompute<T: GapTarget>(history: &[Outcome], targets: &[T]) -> GapMap {
    targets
        .iter()
        .map(|t| {
            let hit_miss = map_hits(history, t.members());
            let stats = analyze(&hit_miss);
            (t.target_id().to_string(), GapEntry { stats, hit_miss })
        })
        .collect()
}

/// Incremental mode: keeps each target's accumulated hit/miss sequence and
/// only maps newly arrived outcomes.
#[derive(Clone, Debug, Default)]
pub struct IncrementalGapEngine {
    gap_map: GapMap,
}

impl IncrementalGapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `new_outcomes` to every target's sequence and re-analyze it.
    pub fn extend<T: GapTarget>(&mut self, targets: &[T], new_outcomes: &[Outcome]) -> &GapMap {
        for t in targets {
            let entry = self.gap_map.entry(t.target_id().to_string()).or_default();
            entry.hit_miss.extend(map_hits(new_outcomes, t.members()));
            entry.stats = analyze(&entry.hit_miss);
        }
        &self.gap_map
    }

    /// Drop all accumulated state (history cleared or rewritten).
    pub fn reset(&mut self) {
        self.gap_map.clear();
    }

    pub fn gap_map(&self) -> &GapMap {
        &self.gap_map
    }
}
