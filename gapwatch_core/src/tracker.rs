use serde::{Deserialize, Serialize};

use crate::error::{GapwatchError, Result};
use crate::gaps::{longest_gap, spins_since_hit, GapTarget};
use crate::table::{Outcome, OutcomeSet};
use crate::wheel::{neighbors, wheel_section, DEFAULT_NEIGHBOR_RADIUS};

// ---------------------------------------------------------------------
// Trackers: explicit-membership groups authored by a user or a preset
// ---------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: String,
    pub name: String,
    pub numbers: OutcomeSet,
    pub threshold: f64,
    /// When set, the threshold rises to the longest observed gap once warm.
    pub auto_threshold: bool,
}

impl GapTarget for Tracker {
    fn target_id(&self) -> &str {
        &self.id
    }

    fn members(&self) -> OutcomeSet {
        self.numbers
    }
}

/// Everything but the id, as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerDraft {
    pub name: String,
    pub numbers: OutcomeSet,
    pub threshold: f64,
    pub auto_threshold: bool,
}

impl TrackerDraft {
    /// User-authored tracker; auto threshold on.
    pub fn new(name: impl Into<String>, numbers: impl IntoIterator<Item = Outcome>, threshold: f64) -> Self {
        Self {
            name: name.into(),
            numbers: numbers.into_iter().collect(),
            threshold,
            auto_threshold: true,
        }
    }

    pub fn fixed(mut self) -> Self {
        self.auto_threshold = false;
        self
    }
}

/// Partial edit; `None` fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerPatch {
    pub name: Option<String>,
    pub numbers: Option<OutcomeSet>,
    pub threshold: Option<f64>,
    pub auto_threshold: Option<bool>,
}

/// Ordered tracker collection with sequential ids (`t1`, `t2`, ...).
#[derive(Clone, Debug)]
pub struct TrackerSet {
    trackers: Vec<Tracker>,
    next_id: u64,
}

impl Default for TrackerSet {
    fn default() -> Self {
        Self {
            trackers: Vec::new(),
            next_id: 1,
        }
    }
}

/// Thresholds must survive a JSON round trip, so NaN and infinities are out.
pub fn check_threshold(threshold: f64) -> Result<f64> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(threshold)
    } else {
        Err(GapwatchError::InvalidThreshold(threshold))
    }
}

fn id_seq(id: &str) -> Option<u64> {
    id.strip_prefix('t')?.parse().ok()
}

impl TrackerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored trackers; new ids continue after the highest one seen.
    pub fn from_trackers(trackers: Vec<Tracker>) -> Self {
        let next_id = trackers
            .iter()
            .filter_map(|t| id_seq(&t.id))
            .max()
            .unwrap_or(0)
            + 1;
        Self { trackers, next_id }
    }

    pub fn add(&mut self, draft: TrackerDraft) -> Result<String> {
        if draft.numbers.is_empty() {
            return Err(GapwatchError::EmptyTracker);
        }
        check_threshold(draft.threshold)?;
        let id = format!("t{}", self.next_id);
        self.next_id += 1;
        self.trackers.push(Tracker {
            id: id.clone(),
            name: draft.name,
            numbers: draft.numbers,
            threshold: draft.threshold,
            auto_threshold: draft.auto_threshold,
        });
        Ok(id)
    }

    pub fn update(&mut self, id: &str, patch: TrackerPatch) -> Result<()> {
        if patch.numbers.is_some_and(|n| n.is_empty()) {
            return Err(GapwatchError::EmptyTracker);
        }
        if let Some(threshold) = patch.threshold {
            check_threshold(threshold)?;
        }
        let t = self
            .trackers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| GapwatchError::UnknownTracker(id.to_string()))?;

        if let Some(name) = patch.name {
            t.name = name;
        }
        if let Some(numbers) = patch.numbers {
            t.numbers = numbers;
        }
        if let Some(threshold) = patch.threshold {
            t.threshold = threshold;
        }
        if let Some(auto) = patch.auto_threshold {
            t.auto_threshold = auto;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Tracker> {
        let idx = self
            .trackers
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| GapwatchError::UnknownTracker(id.to_string()))?;
        Ok(self.trackers.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&Tracker> {
        self.trackers.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tracker> {
        self.trackers.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Tracker> {
        self.trackers.iter_mut()
    }

    pub fn as_slice(&self) -> &[Tracker] {
        &self.trackers
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

/// Evaluated tracker state over one active history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerStatus {
    pub id: String,
    pub name: String,
    pub numbers: OutcomeSet,
    pub threshold: f64,
    pub spins_since_hit: usize,
    pub longest_gap: usize,
    /// Strictly past threshold.
    pub triggered: bool,
}

impl TrackerStatus {
    pub fn evaluate(tracker: &Tracker, history: &[Outcome]) -> Self {
        let spins = spins_since_hit(history, tracker.numbers);
        Self {
            id: tracker.id.clone(),
            name: tracker.name.clone(),
            numbers: tracker.numbers,
            threshold: tracker.threshold,
            spins_since_hit: spins,
            longest_gap: longest_gap(history, tracker.numbers),
            triggered: spins as f64 > tracker.threshold,
        }
    }
}

// ---------------------------------------------------------------------
// Preset catalog
// ---------------------------------------------------------------------

fn outcome(n: u8) -> Outcome {
    // preset literals are all in 0..=36
    Outcome::new(n as i64).unwrap_or(Outcome::ZERO)
}

fn set(ns: &[u8]) -> OutcomeSet {
    ns.iter().map(|&n| outcome(n)).collect()
}

/// Designer presets. Thresholds are fixed for their lifetime.
pub fn preset_catalog() -> Vec<TrackerDraft> {
    let preset = |name: &str, numbers: OutcomeSet, threshold: f64| TrackerDraft {
        name: name.to_string(),
        numbers,
        threshold,
        auto_threshold: false,
    };

    vec![
        preset("Voisins du Zero", wheel_section(outcome(22), 17), 8.0),
        preset("Tiers du Cylindre", wheel_section(outcome(27), 12), 10.0),
        preset(
            "Orphelins",
            wheel_section(outcome(1), 5).union(wheel_section(outcome(17), 3)),
            14.0,
        ),
        preset("Jeu Zero", wheel_section(outcome(12), 7), 16.0),
        preset(
            "Zero Neighbours",
            neighbors(Outcome::ZERO, DEFAULT_NEIGHBOR_RADIUS).into_iter().collect(),
            16.0,
        ),
        preset("Snake", set(&[1, 5, 9, 12, 14, 16, 19, 23, 27, 30, 32, 34]), 10.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_survive_rebuild() {
        let mut ts = TrackerSet::new();
        let a = ts.add(TrackerDraft::new("a", [outcome(1)], 5.0)).unwrap();
        let b = ts.add(TrackerDraft::new("b", [outcome(2)], 5.0)).unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("t1", "t2"));

        let mut rebuilt = TrackerSet::from_trackers(ts.as_slice().to_vec());
        assert_eq!(rebuilt.add(TrackerDraft::new("c", [outcome(3)], 5.0)).unwrap(), "t3");
    }

    #[test]
    fn empty_and_unknown_are_errors() {
        let mut ts = TrackerSet::new();
        assert_eq!(ts.add(TrackerDraft::new("x", Vec::<Outcome>::new(), 5.0)), Err(GapwatchError::EmptyTracker));
        assert_eq!(
            ts.update("t9", TrackerPatch::default()),
            Err(GapwatchError::UnknownTracker("t9".into()))
        );
        assert!(ts.remove("t9").is_err());
    }

    #[test]
    fn non_finite_or_negative_thresholds_are_rejected() {
        let mut ts = TrackerSet::new();
        assert_eq!(
            ts.add(TrackerDraft::new("inf", [outcome(1)], f64::INFINITY)),
            Err(GapwatchError::InvalidThreshold(f64::INFINITY))
        );
        assert!(matches!(
            ts.add(TrackerDraft::new("nan", [outcome(1)], f64::NAN)),
            Err(GapwatchError::InvalidThreshold(_))
        ));
        assert_eq!(
            ts.add(TrackerDraft::new("neg", [outcome(1)], -1.0)),
            Err(GapwatchError::InvalidThreshold(-1.0))
        );
        assert!(ts.is_empty());

        let id = ts.add(TrackerDraft::new("ok", [outcome(1)], 0.0)).unwrap();
        let patch = TrackerPatch { threshold: Some(f64::NEG_INFINITY), ..Default::default() };
        assert!(ts.update(&id, patch).is_err());
        assert_eq!(ts.get(&id).unwrap().threshold, 0.0);
    }

    #[test]
    fn update_applies_only_given_fields() {
        let mut ts = TrackerSet::new();
        let id = ts.add(TrackerDraft::new("a", [outcome(1)], 5.0)).unwrap();
        ts.update(&id, TrackerPatch { threshold: Some(9.0), ..Default::default() }).unwrap();
        let t = ts.get(&id).unwrap();
        assert_eq!(t.threshold, 9.0);
        assert_eq!(t.name, "a");
        assert!(t.auto_threshold);
    }

    #[test]
    fn status_trigger_is_strict() {
        let t = Tracker {
            id: "t1".into(),
            name: "one".into(),
            numbers: set(&[1]),
            threshold: 3.0,
            auto_threshold: false,
        };
        let h3: Vec<Outcome> = [1, 2, 2, 2].iter().map(|&n| outcome(n)).collect();
        assert!(!TrackerStatus::evaluate(&t, &h3).triggered);
        let h4: Vec<Outcome> = [1, 2, 2, 2, 2].iter().map(|&n| outcome(n)).collect();
        let s = TrackerStatus::evaluate(&t, &h4);
        assert_eq!(s.spins_since_hit, 4);
        assert!(s.triggered);
    }

    #[test]
    fn presets_are_fixed_and_sized() {
        let p = preset_catalog();
        assert!(p.iter().all(|d| !d.auto_threshold && !d.numbers.is_empty()));
        let sizes: Vec<usize> = p.iter().map(|d| d.numbers.len()).collect();
        assert_eq!(sizes, vec![17, 12, 8, 7, 7, 12]);
    }
}
