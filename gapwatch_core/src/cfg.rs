use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::alerts::{IntersectionRule, DEFAULT_ALERT_MAX_SCORE};
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::threshold::{DEFAULT_AUTO_WARMUP, DEFAULT_THRESHOLD_MULTIPLIER};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GapwatchCfg {
    pub history_capacity: usize,
    pub threshold_multiplier: f64,
    pub auto_warmup: usize,
    pub alert_max_score: usize,
    pub alert_rule: IntersectionRule,
    pub tracker_rule: IntersectionRule,
    /// Let generated entities adapt thresholds like auto trackers.
    pub entity_auto_threshold: bool,
    /// Cross-check full recomputes against an incremental engine.
    pub verify_incremental: bool,
}

impl Default for GapwatchCfg {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            threshold_multiplier: DEFAULT_THRESHOLD_MULTIPLIER,
            auto_warmup: DEFAULT_AUTO_WARMUP,
            alert_max_score: DEFAULT_ALERT_MAX_SCORE,
            alert_rule: IntersectionRule::ALERTS,
            tracker_rule: IntersectionRule::TRACKERS,
            entity_auto_threshold: false,
            verify_incremental: false,
        }
    }
}

impl GapwatchCfg {
    /// Replace a multiplier that would produce non-finite or negative
    /// thresholds with the default one.
    pub fn normalized(mut self) -> Self {
        if !(self.threshold_multiplier.is_finite() && self.threshold_multiplier > 0.0) {
            warn!(
                multiplier = self.threshold_multiplier,
                "threshold multiplier rejected; using default"
            );
            self.threshold_multiplier = DEFAULT_THRESHOLD_MULTIPLIER;
        }
        self
    }
}
