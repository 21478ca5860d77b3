use serde::{Deserialize, Serialize};

use crate::table::DOMAIN_SIZE;

/// Default trigger: three times the expected gap.
pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 3.0;

/// Active history length before auto thresholds start adapting.
pub const DEFAULT_AUTO_WARMUP: usize = 30;

/// Mean outcomes between hits for a group of `score` members.
pub fn expected_gap(score: usize) -> f64 {
    DOMAIN_SIZE as f64 / score.max(1) as f64
}

pub fn initial_threshold(score: usize, multiplier: f64) -> f64 {
    multiplier * expected_gap(score)
}

/// Auto-adapting threshold rule. Once warm, thresholds rise to the longest
/// observed gap and never fall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    pub warmup: usize,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            warmup: DEFAULT_AUTO_WARMUP,
        }
    }
}

impl ThresholdPolicy {
    pub fn new(warmup: usize) -> Self {
        Self { warmup }
    }

    #[inline]
    pub fn is_warm(&self, active_len: usize) -> bool {
        active_len >= self.warmup
    }

    /// Next threshold for a target. Fixed targets keep `current`.
    pub fn adapt(&self, current: f64, longest_gap: usize, active_len: usize, auto: bool) -> f64 {
        if !auto || !self.is_warm(active_len) {
            return current;
        }
        current.max(longest_gap as f64)
    }
}
