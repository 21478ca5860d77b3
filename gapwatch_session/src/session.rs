//! Reactive session.
//!
//! The outside-world facing orchestration layer around `gapwatch_core`:
//! - owns the outcome history, the generated entity table and the tracker set
//! - validates boundary input through `adapter`
//! - after every mutation recomputes gaps, adapts thresholds and aggregates
//!   alerts and intersections into one immutable `SessionView`
//!
//! No IO. No async. Single-threaded; every method that mutates takes `&mut self`.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gapwatch_core::{
    active_alerts, check_threshold, gaps, generate_lexicon, intersect, longest_gap, preset_catalog, Alert,
    GapMap, GapwatchCfg, IncrementalGapEngine, Intersection, Outcome, OutcomeHistory, Result,
    ThresholdPolicy, TrackableEntity, Tracker, TrackerDraft, TrackerPatch, TrackerSet,
    TrackerStatus,
};

use crate::adapter::{export_json, parse_import_json, validate_outcomes, PeerMessage};

/// Derived state after one recompute. Never mutated once published.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionView {
    pub active_len: usize,
    pub stored_len: usize,
    pub pointer: Option<usize>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub entities: Vec<TrackableEntity>,
    pub trackers: Vec<TrackerStatus>,
    /// Ranked: most pinpointed first.
    pub alerts: Vec<Alert>,
    pub alert_intersections: Vec<Intersection>,
    pub tracker_intersections: Vec<Intersection>,
    /// Growth in alert count since the previous view.
    pub new_alerts: usize,
}

/// Result of offering a remote sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    Replaced { len: usize },
    Kept,
}

/// What a peer message did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerEffect {
    Appended(Outcome),
    Merged(MergeOutcome),
    Ignored,
}

/// Storage-agnostic persistence of a session. Callers decide where it goes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub history: OutcomeHistory,
    pub trackers: Vec<Tracker>,
    /// Entity thresholds, so adapted values survive a restore.
    pub entity_thresholds: Vec<(String, f64)>,
}

/// Counters returned by `restore`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreStats {
    /// Entity thresholds applied from the snapshot.
    pub applied: usize,
    /// Snapshot entries naming an entity this session does not have.
    pub skipped: usize,
}

#[derive(Clone, Copy, Debug)]
enum Change {
    Appended(Outcome),
    Rewritten,
    TrackersOnly,
}

#[derive(Debug)]
pub struct Session {
    cfg: GapwatchCfg,
    policy: ThresholdPolicy,
    history: OutcomeHistory,
    entities: Vec<TrackableEntity>,
    trackers: TrackerSet,
    verifier: Option<IncrementalGapEngine>,
    view: Arc<SessionView>,
    /// Locally originated outcomes keyed by a monotonic sequence number.
    outbox: VecDeque<(u64, Outcome)>,
    local_seq: u64,
}

impl Session {
    /// Create a session with the generated entity catalog and no trackers.
    pub fn new(cfg: GapwatchCfg) -> Self {
        let cfg = cfg.normalized();
        let entities = generate_lexicon()
            .iter()
            .map(|def| {
                TrackableEntity::from_definition(
                    def,
                    cfg.threshold_multiplier,
                    cfg.entity_auto_threshold,
                )
            })
            .collect::<Vec<_>>();
        info!(entities = entities.len(), capacity = cfg.history_capacity, "session created");

        let mut session = Self {
            policy: ThresholdPolicy::new(cfg.auto_warmup),
            history: OutcomeHistory::with_capacity(cfg.history_capacity),
            entities,
            trackers: TrackerSet::new(),
            verifier: cfg.verify_incremental.then(IncrementalGapEngine::new),
            view: Arc::default(),
            outbox: VecDeque::new(),
            local_seq: 0,
            cfg,
        };
        session.recompute(Change::Rewritten);
        session
    }

    /// Like `new`, plus the preset tracker catalog.
    pub fn with_presets(cfg: GapwatchCfg) -> Self {
        let mut session = Self::new(cfg);
        session.load_presets();
        session
    }

    /// Add every preset not already present by name. Returns how many were added.
    pub fn load_presets(&mut self) -> usize {
        let missing: Vec<TrackerDraft> = preset_catalog()
            .into_iter()
            .filter(|draft| !self.trackers.iter().any(|t| t.name == draft.name))
            .collect();
        if missing.is_empty() {
            debug!("presets already loaded");
            return 0;
        }
        let added = missing
            .into_iter()
            .filter_map(|draft| self.trackers.add(draft).ok())
            .count();
        self.recompute(Change::TrackersOnly);
        added
    }

    pub fn cfg(&self) -> &GapwatchCfg {
        &self.cfg
    }

    pub fn history(&self) -> &OutcomeHistory {
        &self.history
    }

    pub fn trackers(&self) -> &TrackerSet {
        &self.trackers
    }

    /// Latest published view.
    pub fn view(&self) -> Arc<SessionView> {
        Arc::clone(&self.view)
    }

    // -----------------------------------------------------------------
    // History mutations
    // -----------------------------------------------------------------

    pub fn push(&mut self, outcome: Outcome) {
        self.record_local(outcome);
        self.append(outcome);
    }

    fn record_local(&mut self, outcome: Outcome) {
        self.local_seq += 1;
        self.outbox.push_back((self.local_seq, outcome));
        while self.outbox.len() > self.history.capacity() {
            self.outbox.pop_front();
        }
    }

    fn append(&mut self, outcome: Outcome) {
        let pure_append =
            self.history.pointer().is_none() && self.history.len() < self.history.capacity();
        self.history.append(outcome);
        self.recompute(if pure_append { Change::Appended(outcome) } else { Change::Rewritten });
    }

    /// Input surface: validate a raw value, then push it.
    pub fn push_value(&mut self, value: i64) -> Result<Outcome> {
        let outcome = Outcome::new(value).inspect_err(|e| warn!(value, error = %e, "outcome rejected"))?;
        self.push(outcome);
        Ok(outcome)
    }

    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo();
        if moved {
            self.recompute(Change::Rewritten);
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo();
        if moved {
            self.recompute(Change::Rewritten);
        }
        moved
    }

    pub fn clear(&mut self) {
        self.history.clear();
        info!("history cleared");
        self.recompute(Change::Rewritten);
    }

    /// Longer sequence wins: replace local history only when `remote` is
    /// strictly longer than what is stored.
    pub fn merge_remote(&mut self, remote: Vec<Outcome>) -> MergeOutcome {
        if remote.len() <= self.history.len() {
            debug!(remote = remote.len(), local = self.history.len(), "remote sequence not longer; kept local");
            return MergeOutcome::Kept;
        }
        self.history.replace(remote);
        info!(len = self.history.len(), "history replaced by remote sequence");
        self.recompute(Change::Rewritten);
        MergeOutcome::Replaced {
            len: self.history.len(),
        }
    }

    /// Validate every value, then append them in order. Nothing changes on error.
    pub fn import(&mut self, values: &[i64]) -> Result<usize> {
        let outcomes = validate_outcomes(values)
            .inspect_err(|e| warn!(error = %e, "import rejected"))?;
        Ok(self.append_all(outcomes))
    }

    pub fn import_json(&mut self, payload: &str) -> Result<usize> {
        let outcomes = parse_import_json(payload)
            .inspect_err(|e| warn!(error = %e, "import rejected"))?;
        Ok(self.append_all(outcomes))
    }

    fn append_all(&mut self, outcomes: Vec<Outcome>) -> usize {
        for &o in &outcomes {
            self.record_local(o);
            self.history.append(o);
        }
        info!(imported = outcomes.len(), stored = self.history.len(), "outcomes imported");
        self.recompute(Change::Rewritten);
        outcomes.len()
    }

    /// Raw stored sequence, ignoring the undo pointer.
    pub fn export(&self) -> Vec<Outcome> {
        self.history.stored().to_vec()
    }

    pub fn export_json(&self) -> Result<String> {
        export_json(self.history.stored())
    }

    // -----------------------------------------------------------------
    // Peer replication
    // -----------------------------------------------------------------

    pub fn apply_peer(&mut self, msg: PeerMessage) -> Result<PeerEffect> {
        match msg {
            PeerMessage::Spin { number } => {
                let outcome = Outcome::new(number)
                    .inspect_err(|e| warn!(number, error = %e, "peer spin rejected"))?;
                // not recorded in the outbox, so it is never echoed back
                self.append(outcome);
                Ok(PeerEffect::Appended(outcome))
            }
            PeerMessage::Sync { data } => {
                let remote = validate_outcomes(&data)
                    .inspect_err(|e| warn!(error = %e, "peer sync rejected"))?;
                Ok(PeerEffect::Merged(self.merge_remote(remote)))
            }
            PeerMessage::Chat { .. } => Ok(PeerEffect::Ignored),
        }
    }

    pub fn apply_peer_json(&mut self, payload: &str) -> Result<PeerEffect> {
        self.apply_peer(PeerMessage::from_json(payload)?)
    }

    /// Sequence number of the latest locally originated outcome. Never decreases;
    /// eviction, undo and merges do not move it.
    pub fn local_seq(&self) -> u64 {
        self.local_seq
    }

    /// Locally originated outcomes numbered after `cursor`, as spin messages.
    ///
    /// Only the most recent `capacity` local outcomes are retained; a peer
    /// further behind than that should be sent `sync_message()` instead.
    pub fn outgoing_since(&self, cursor: u64) -> Vec<PeerMessage> {
        self.outbox
            .iter()
            .filter(|(seq, _)| *seq > cursor)
            .map(|&(_, o)| PeerMessage::spin(o))
            .collect()
    }

    /// Full-sequence message sent when a peer connects.
    pub fn sync_message(&self) -> PeerMessage {
        PeerMessage::sync(self.history.stored())
    }

    // -----------------------------------------------------------------
    // Trackers
    // -----------------------------------------------------------------

    pub fn add_tracker(&mut self, draft: TrackerDraft) -> Result<String> {
        let id = self.trackers.add(draft)?;
        self.recompute(Change::TrackersOnly);
        Ok(id)
    }

    pub fn update_tracker(&mut self, id: &str, patch: TrackerPatch) -> Result<()> {
        self.trackers.update(id, patch)?;
        self.recompute(Change::TrackersOnly);
        Ok(())
    }

    pub fn remove_tracker(&mut self, id: &str) -> Result<Tracker> {
        let removed = self.trackers.remove(id)?;
        self.recompute(Change::TrackersOnly);
        Ok(removed)
    }

    // -----------------------------------------------------------------
    // Snapshot / restore
    // -----------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            history: self.history.clone(),
            trackers: self.trackers.as_slice().to_vec(),
            entity_thresholds: self
                .entities
                .iter()
                .map(|e| (e.id.clone(), e.threshold))
                .collect(),
        }
    }

    /// Replace history, trackers and entity thresholds with the snapshot's.
    /// Unknown entity ids and unusable thresholds are skipped.
    pub fn restore(&mut self, snap: SessionSnapshot) -> RestoreStats {
        self.history = OutcomeHistory::from_parts(
            self.cfg.history_capacity,
            snap.history.stored().to_vec(),
            snap.history.pointer(),
        );
        let (trackers, rejected): (Vec<Tracker>, Vec<Tracker>) = snap
            .trackers
            .into_iter()
            .partition(|t| !t.numbers.is_empty() && check_threshold(t.threshold).is_ok());
        if !rejected.is_empty() {
            warn!(rejected = rejected.len(), "snapshot trackers dropped");
        }
        self.trackers = TrackerSet::from_trackers(trackers);

        let mut stats = RestoreStats::default();
        for (id, threshold) in snap.entity_thresholds {
            match self.entities.iter_mut().find(|e| e.id == id) {
                Some(e) if check_threshold(threshold).is_ok() => {
                    e.threshold = threshold;
                    stats.applied += 1;
                }
                _ => stats.skipped += 1,
            }
        }
        info!(
            stored = self.history.len(),
            trackers = self.trackers.len(),
            applied = stats.applied,
            skipped = stats.skipped,
            "session restored"
        );
        self.recompute(Change::Rewritten);
        stats
    }

    // -----------------------------------------------------------------
    // Recompute
    // -----------------------------------------------------------------

    fn recompute(&mut self, change: Change) {
        let active = self.history.active();
        let active_len = active.len();

        let gap_map = gaps::recompute(active, &self.entities);
        for e in &mut self.entities {
            let stats = gap_map.get(&e.id).map(|g| g.stats).unwrap_or_default();
            e.apply(stats);
            e.threshold = self
                .policy
                .adapt(e.threshold, stats.longest_gap, active_len, e.auto_threshold);
        }

        for t in self.trackers.iter_mut() {
            let longest = longest_gap(active, t.numbers);
            t.threshold = self
                .policy
                .adapt(t.threshold, longest, active_len, t.auto_threshold);
        }
        let trackers: Vec<TrackerStatus> = self
            .trackers
            .iter()
            .map(|t| TrackerStatus::evaluate(t, active))
            .collect();

        if let Some(engine) = self.verifier.as_mut() {
            cross_check(engine, change, active, &self.entities, &gap_map);
        }

        let alerts = active_alerts(&self.entities, self.cfg.alert_max_score);
        let alert_intersections = intersect(alerts.iter().map(|a| a.numbers), self.cfg.alert_rule);
        let tracker_intersections = intersect(
            trackers.iter().filter(|s| s.triggered).map(|s| s.numbers),
            self.cfg.tracker_rule,
        );
        let new_alerts = alerts.len().saturating_sub(self.view.alerts.len());

        debug!(
            active_len,
            alerts = alerts.len(),
            alert_intersections = alert_intersections.len(),
            triggered = trackers.iter().filter(|s| s.triggered).count(),
            "recomputed"
        );
        if new_alerts > 0 {
            info!(new_alerts, total = alerts.len(), "new alerts");
        }

        self.view = Arc::new(SessionView {
            active_len,
            stored_len: self.history.len(),
            pointer: self.history.pointer(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            entities: self.entities.clone(),
            trackers,
            alerts,
            alert_intersections,
            tracker_intersections,
            new_alerts,
        });
    }
}

/// Feed the incremental engine the same change and compare against the full map.
fn cross_check(
    engine: &mut IncrementalGapEngine,
    change: Change,
    active: &[Outcome],
    entities: &[TrackableEntity],
    full: &GapMap,
) {
    match change {
        Change::TrackersOnly => return,
        Change::Appended(o) => {
            engine.extend(entities, &[o]);
        }
        Change::Rewritten => {
            engine.reset();
            engine.extend(entities, active);
        }
    }

    let diverged = entities
        .iter()
        .filter(|e| {
            engine.gap_map().get(&e.id).map(|g| g.stats) != full.get(&e.id).map(|g| g.stats)
        })
        .count();
    if diverged > 0 {
        warn!(diverged, "incremental gap engine diverged from full recompute");
    }
}
