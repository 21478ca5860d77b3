//gapwatch_core/alerts.rs

use serde::{Deserialize, Serialize};

use crate::entity::TrackableEntity;
use crate::table::{Outcome, OutcomeSet, DOMAIN_SIZE};

/// Highest score an entity may have and still raise an alert.
pub const DEFAULT_ALERT_MAX_SCORE: usize = 6;

/// An entity whose current gap has reached its threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub entity_id: String,
    pub name: String,
    pub numbers: OutcomeSet,
    pub score: usize,
    pub last_seen_ago: usize,
    pub threshold: f64,
    pub expected_gap: f64,
}

impl From<&TrackableEntity> for Alert {
    fn from(e: &TrackableEntity) -> Self {
        Self {
            entity_id: e.id.clone(),
            name: e.name.clone(),
            numbers: e.numbers,
            score: e.score,
            last_seen_ago: e.last_seen_ago,
            threshold: e.threshold,
            expected_gap: e.expected_gap,
        }
    }
}

/// Alert predicate. Note `>=`; tracker triggering is strict.
#[inline]
pub fn is_alert(entity: &TrackableEntity, max_score: usize) -> bool {
    entity.score <= max_score && entity.last_seen_ago as f64 >= entity.threshold
}

/// Most pinpointed first, then longest current gap.
pub fn rank_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        a.score
            .cmp(&b.score)
            .then_with(|| b.last_seen_ago.cmp(&a.last_seen_ago))
    });
}

pub fn active_alerts(entities: &[TrackableEntity], max_score: usize) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = entities
        .iter()
        .filter(|e| is_alert(e, max_score))
        .map(Alert::from)
        .collect();
    rank_alerts(&mut alerts);
    alerts
}

// ---------------------------------------------------------------------
// Cross-candidate intersections
// ---------------------------------------------------------------------

/// Gates for `intersect`: how many candidates must be active, and how many of
/// them an outcome must belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntersectionRule {
    pub min_candidates: usize,
    pub min_count: usize,
}

impl IntersectionRule {
    pub const ALERTS: IntersectionRule = IntersectionRule { min_candidates: 3, min_count: 3 };
    pub const TRACKERS: IntersectionRule = IntersectionRule { min_candidates: 4, min_count: 4 };
}

/// An outcome shared by `count` candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intersection {
    pub outcome: Outcome,
    pub count: usize,
}

/// Count member occurrences across candidate sets and keep those reaching
/// `rule.min_count`, by descending count then ascending outcome.
pub fn intersect<I>(candidates: I, rule: IntersectionRule) -> Vec<Intersection>
where
    I: IntoIterator<Item = OutcomeSet>,
{
    let mut counts = [0usize; DOMAIN_SIZE];
    let mut n = 0usize;
    for set in candidates {
        n += 1;
        for o in set.iter() {
            counts[o.value() as usize] += 1;
        }
    }
    if n < rule.min_candidates {
        return Vec::new();
    }

    let mut out: Vec<Intersection> = Outcome::all()
        .map(|o| Intersection { outcome: o, count: counts[o.value() as usize] })
        .filter(|i| i.count > 0 && i.count >= rule.min_count)
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.outcome.cmp(&b.outcome)));
    out
}
