pub mod error;
pub mod table;
pub mod wheel;
pub mod lexicon;

pub mod history;
pub mod gaps;
pub mod threshold;
pub mod entity;
pub mod tracker;
pub mod alerts;
pub mod cfg;

pub use error::{GapwatchError, Result};
pub use table::{
    classify, master_table, partition, resolve_by_tags, Attribute, Color, Column, Dozen, Outcome,
    OutcomeProperties, OutcomeSet, Parity, Range, Street, Tag, TagSet, DOMAIN_SIZE, MAX_OUTCOME,
};
pub use wheel::{neighbors, wheel_position, wheel_section, DEFAULT_NEIGHBOR_RADIUS, WHEEL_ORDER};
pub use lexicon::{create_entity, generate_lexicon, EntityDefinition};

pub use history::{OutcomeHistory, DEFAULT_HISTORY_CAPACITY};
pub use gaps::{
    analyze, longest_gap, map_hits, recompute, spins_since_hit, GapEntry, GapMap, GapStats,
    GapTarget, IncrementalGapEngine,
};
pub use threshold::{expected_gap, initial_threshold, ThresholdPolicy};
pub use entity::TrackableEntity;
pub use tracker::{check_threshold, preset_catalog, Tracker, TrackerDraft, TrackerPatch, TrackerSet, TrackerStatus};
pub use alerts::{active_alerts, intersect, is_alert, rank_alerts, Alert, Intersection, IntersectionRule};
pub use cfg::GapwatchCfg;
