//! gapwatch_session
//!
//! Outside-world facing orchestration layer for `gapwatch_core`.
//!
//! Responsibilities:
//! - own one outcome history, the generated entity table and the tracker set
//! - validate boundary input (single outcomes, imports, peer messages)
//! - recompute gaps, thresholds, alerts and intersections after every change
//! - publish each result as an immutable `SessionView`
//!
//! Non-goals:
//! - no IO, no transport (peer messages arrive already framed)
//! - no async
//! - no classification or gap logic (lives in core)

pub mod adapter;
pub mod session;

pub use adapter::{export_json, parse_import_json, validate_outcomes, PeerMessage};

pub use session::{
    MergeOutcome,
    PeerEffect,
    RestoreStats,
    Session,
    SessionSnapshot,
    SessionView,
};
