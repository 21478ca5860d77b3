use serde::{Deserialize, Serialize};

use crate::gaps::{GapStats, GapTarget};
use crate::lexicon::EntityDefinition;
use crate::table::OutcomeSet;
use crate::threshold::{expected_gap, initial_threshold};

/// An entity definition plus its live gap and threshold state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackableEntity {
    pub id: String,
    pub name: String,
    pub numbers: OutcomeSet,
    pub score: usize,
    pub last_seen_ago: usize,
    pub longest_gap: usize,
    pub expected_gap: f64,
    pub threshold: f64,
    pub auto_threshold: bool,
}

impl TrackableEntity {
    pub fn from_definition(def: &EntityDefinition, multiplier: f64, auto_threshold: bool) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            numbers: def.numbers,
            score: def.score,
            last_seen_ago: 0,
            longest_gap: 0,
            expected_gap: expected_gap(def.score),
            threshold: initial_threshold(def.score, multiplier),
            auto_threshold,
        }
    }

    #[inline]
    pub fn apply(&mut self, stats: GapStats) {
        self.last_seen_ago = stats.last_seen_ago;
        self.longest_gap = stats.longest_gap;
    }
}

impl GapTarget for TrackableEntity {
    fn target_id(&self) -> &str {
        &self.id
    }

    fn members(&self) -> OutcomeSet {
        self.numbers
    }
}

impl GapTarget for EntityDefinition {
    fn target_id(&self) -> &str {
        &self.id
    }

    fn members(&self) -> OutcomeSet {
        self.numbers
    }
}
