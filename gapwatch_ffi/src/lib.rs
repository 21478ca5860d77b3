#![allow(clippy::missing_safety_doc)]

use std::ptr;

use tracing::{debug, warn};

use gapwatch_core::{GapwatchCfg, GapwatchError, Intersection, OutcomeSet, TrackerDraft};
use gapwatch_session::{Session, SessionSnapshot};

/// FFI ABI version for gapwatch_ffi.
///
/// Bump this when any `#[repr(C)]` struct layout or exported function signature changes.
pub const GAPWATCH_FFI_VERSION: u32 = 2;

#[no_mangle]
pub extern "C" fn gapwatch_ffi_version() -> u32 {
    GAPWATCH_FFI_VERSION
}

// Return codes shared by every call that returns `i32`.
pub const GW_OK: i32 = 0;
pub const GW_ERR_NULL: i32 = -1;
pub const GW_ERR_RANGE: i32 = -2;
pub const GW_ERR_PARSE: i32 = -3;
pub const GW_ERR_IMPORT: i32 = -4;
pub const GW_ERR_UTF8: i32 = -5;
pub const GW_ERR_EMPTY_TRACKER: i32 = -6;
pub const GW_ERR_UNKNOWN_TRACKER: i32 = -7;
pub const GW_ERR_THRESHOLD: i32 = -8;

fn rc_of(e: &GapwatchError) -> i32 {
    match e {
        GapwatchError::OutcomeOutOfRange(_) => GW_ERR_RANGE,
        GapwatchError::Parse(_) => GW_ERR_PARSE,
        GapwatchError::Import { .. } => GW_ERR_IMPORT,
        GapwatchError::EmptyTracker => GW_ERR_EMPTY_TRACKER,
        GapwatchError::UnknownTracker(_) => GW_ERR_UNKNOWN_TRACKER,
        GapwatchError::InvalidThreshold(_) => GW_ERR_THRESHOLD,
    }
}

/// Opaque handle exposed over FFI.
#[repr(C)]
pub struct GwSession {
    inner: Session,
}

/// FFI string view (UTF-8 bytes).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GwStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl GwStr {
    fn as_str(&self) -> Option<&str> {
        if self.ptr.is_null() {
            return None;
        }
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr, self.len) };
        std::str::from_utf8(bytes).ok()
    }
}

/// Owned byte buffer (JSON payloads, ids). Free with `gapwatch_bytes_free`.
#[repr(C)]
pub struct GwBytes {
    pub ptr: *mut u8,
    pub len: usize,
}

impl GwBytes {
    fn null() -> Self {
        GwBytes { ptr: ptr::null_mut(), len: 0 }
    }

    fn from_vec(buf: Vec<u8>) -> Self {
        let mut boxed = buf.into_boxed_slice();
        let ptr = boxed.as_mut_ptr();
        let len = boxed.len();
        std::mem::forget(boxed);
        GwBytes { ptr, len }
    }
}

/// Session cfg for FFI. Intersection rules keep their defaults.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GwCfg {
    pub history_capacity: u32,
    pub threshold_multiplier: f64,
    pub auto_warmup: u32,
    pub alert_max_score: u32,
    pub entity_auto_threshold: u8,
    pub verify_incremental: u8,
}

#[no_mangle]
pub extern "C" fn gapwatch_cfg_default() -> GwCfg {
    let d = GapwatchCfg::default();
    GwCfg {
        history_capacity: d.history_capacity as u32,
        threshold_multiplier: d.threshold_multiplier,
        auto_warmup: d.auto_warmup as u32,
        alert_max_score: d.alert_max_score as u32,
        entity_auto_threshold: d.entity_auto_threshold as u8,
        verify_incremental: d.verify_incremental as u8,
    }
}

fn cfg_from_ffi(c: GwCfg) -> GapwatchCfg {
    GapwatchCfg {
        history_capacity: c.history_capacity as usize,
        threshold_multiplier: c.threshold_multiplier,
        auto_warmup: c.auto_warmup as usize,
        alert_max_score: c.alert_max_score as usize,
        entity_auto_threshold: c.entity_auto_threshold != 0,
        verify_incremental: c.verify_incremental != 0,
        ..GapwatchCfg::default()
    }
    .normalized()
}

/// Alert row.
/// Note: `entity_id` points into the string blob owned by the enclosing array.
#[repr(C)]
pub struct GwAlert {
    pub entity_id: GwStr,
    pub score: u32,
    pub last_seen_ago: u32,
    pub threshold: f64,
    pub expected_gap: f64,
    /// Bit `n` set when outcome `n` is a member.
    pub numbers_mask: u64,
}

/// Owned array returned over FFI.
#[repr(C)]
pub struct GwAlertArray {
    pub alerts_ptr: *mut GwAlert,
    pub alerts_len: usize,

    // backing storage for strings (one blob) so entity_id pointers stay valid
    pub strings_ptr: *mut u8,
    pub strings_len: usize,
}

/// Intersection row.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GwHit {
    pub outcome: u8,
    pub count: u32,
}

#[repr(C)]
pub struct GwHitArray {
    pub hits_ptr: *mut GwHit,
    pub hits_len: usize,
}

// Selectors for `gapwatch_intersections`.
pub const GW_INTERSECTIONS_ALERTS: u32 = 0;
pub const GW_INTERSECTIONS_TRACKERS: u32 = 1;

/// Restore result statistics (FFI-safe).
#[repr(C)]
pub struct GwRestoreStats {
    pub applied: u32,
    pub skipped: u32,
    pub rc: i32,
}

// ---------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------

/// Create a new session handle. `presets != 0` loads the preset trackers.
///
/// The handle is not thread-safe; callers serialize access.
#[no_mangle]
pub extern "C" fn gapwatch_session_new(cfg: GwCfg, presets: u8) -> *mut GwSession {
    let cfg = cfg_from_ffi(cfg);
    let inner = if presets != 0 {
        Session::with_presets(cfg)
    } else {
        Session::new(cfg)
    };
    debug!(presets, "ffi session created");
    Box::into_raw(Box::new(GwSession { inner }))
}

#[no_mangle]
pub unsafe extern "C" fn gapwatch_session_free(h: *mut GwSession) {
    if !h.is_null() {
        drop(Box::from_raw(h));
    }
}

// ---------------------------------------------------------------------
// History
// ---------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn gapwatch_push(h: *mut GwSession, value: i64) -> i32 {
    if h.is_null() {
        return GW_ERR_NULL;
    }
    match (*h).inner.push_value(value) {
        Ok(_) => GW_OK,
        Err(e) => rc_of(&e),
    }
}

/// 1 when the pointer moved, 0 when already at the earliest state.
#[no_mangle]
pub unsafe extern "C" fn gapwatch_undo(h: *mut GwSession) -> i32 {
    if h.is_null() {
        return GW_ERR_NULL;
    }
    (*h).inner.undo() as i32
}

/// 1 when the pointer moved, 0 when already at the head.
#[no_mangle]
pub unsafe extern "C" fn gapwatch_redo(h: *mut GwSession) -> i32 {
    if h.is_null() {
        return GW_ERR_NULL;
    }
    (*h).inner.redo() as i32
}

#[no_mangle]
pub unsafe extern "C" fn gapwatch_clear(h: *mut GwSession) -> i32 {
    if h.is_null() {
        return GW_ERR_NULL;
    }
    (*h).inner.clear();
    GW_OK
}

/// Active (pointer-selected) history length, or -1 for a null handle.
#[no_mangle]
pub unsafe extern "C" fn gapwatch_active_len(h: *const GwSession) -> i64 {
    if h.is_null() {
        return GW_ERR_NULL as i64;
    }
    (*h).inner.view().active_len as i64
}

/// Import a flat JSON array. Returns the number of outcomes appended, or a negative code.
#[no_mangle]
pub unsafe extern "C" fn gapwatch_import_json(h: *mut GwSession, payload: GwStr) -> i32 {
    if h.is_null() || payload.ptr.is_null() {
        return GW_ERR_NULL;
    }
    let Some(s) = payload.as_str() else {
        warn!("import payload is not utf-8");
        return GW_ERR_UTF8;
    };
    match (*h).inner.import_json(s) {
        Ok(n) => n as i32,
        Err(e) => rc_of(&e),
    }
}

/// Stored sequence as a JSON array, ignoring the undo pointer.
#[no_mangle]
pub unsafe extern "C" fn gapwatch_export_json(h: *const GwSession) -> GwBytes {
    if h.is_null() {
        return GwBytes::null();
    }
    match (*h).inner.export_json() {
        Ok(s) => GwBytes::from_vec(s.into_bytes()),
        Err(_) => GwBytes::null(),
    }
}

/// Apply one framed peer message (`{"type":"spin",...}` and friends).
#[no_mangle]
pub unsafe extern "C" fn gapwatch_peer_json(h: *mut GwSession, payload: GwStr) -> i32 {
    if h.is_null() || payload.ptr.is_null() {
        return GW_ERR_NULL;
    }
    let Some(s) = payload.as_str() else {
        return GW_ERR_UTF8;
    };
    match (*h).inner.apply_peer_json(s) {
        Ok(_) => GW_OK,
        Err(e) => rc_of(&e),
    }
}

#[no_mangle]
pub unsafe extern "C" fn gapwatch_bytes_free(b: GwBytes) {
    if !b.ptr.is_null() {
        let slice_ptr = std::ptr::slice_from_raw_parts_mut(b.ptr, b.len);
        drop(Box::from_raw(slice_ptr));
    }
}

// ---------------------------------------------------------------------
// Trackers
// ---------------------------------------------------------------------

/// Add a tracker. On success the new id is written to `out_id` (when non-null)
/// as owned bytes, freed with `gapwatch_bytes_free`.
#[no_mangle]
pub unsafe extern "C" fn gapwatch_add_tracker(
    h: *mut GwSession,
    name: GwStr,
    numbers_mask: u64,
    threshold: f64,
    auto_threshold: u8,
    out_id: *mut GwBytes,
) -> i32 {
    if h.is_null() || name.ptr.is_null() {
        return GW_ERR_NULL;
    }
    let Some(name) = name.as_str() else {
        warn!("tracker name is not utf-8");
        return GW_ERR_UTF8;
    };
    let draft = TrackerDraft {
        name: name.to_string(),
        numbers: OutcomeSet::from_bits(numbers_mask),
        threshold,
        auto_threshold: auto_threshold != 0,
    };
    match (*h).inner.add_tracker(draft) {
        Ok(id) => {
            if !out_id.is_null() {
                *out_id = GwBytes::from_vec(id.into_bytes());
            }
            GW_OK
        }
        Err(e) => {
            warn!(error = %e, "ffi tracker rejected");
            rc_of(&e)
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn gapwatch_remove_tracker(h: *mut GwSession, id: GwStr) -> i32 {
    if h.is_null() || id.ptr.is_null() {
        return GW_ERR_NULL;
    }
    let Some(id) = id.as_str() else {
        return GW_ERR_UTF8;
    };
    match (*h).inner.remove_tracker(id) {
        Ok(_) => GW_OK,
        Err(e) => rc_of(&e),
    }
}

// ---------------------------------------------------------------------
// Derived state
// ---------------------------------------------------------------------

/// Current ranked alerts. Free with `gapwatch_alerts_free`.
#[no_mangle]
pub unsafe extern "C" fn gapwatch_alerts(h: *const GwSession) -> GwAlertArray {
    if h.is_null() {
        return GwAlertArray {
            alerts_ptr: ptr::null_mut(),
            alerts_len: 0,
            strings_ptr: ptr::null_mut(),
            strings_len: 0,
        };
    }
    let view = (*h).inner.view();

    // Build a single backing blob for entity_id strings
    let mut strings: Vec<u8> = Vec::new();
    let mut out: Vec<GwAlert> = Vec::with_capacity(view.alerts.len());
    let mut offsets: Vec<usize> = Vec::with_capacity(view.alerts.len());

    for a in &view.alerts {
        let start = strings.len();
        strings.extend_from_slice(a.entity_id.as_bytes());
        offsets.push(start);

        out.push(GwAlert {
            // fixed up after we pin the backing string blob
            entity_id: GwStr { ptr: ptr::null(), len: a.entity_id.len() },
            score: a.score as u32,
            last_seen_ago: a.last_seen_ago as u32,
            threshold: a.threshold,
            expected_gap: a.expected_gap,
            numbers_mask: a.numbers.bits(),
        });
    }

    // Pin buffers and fix pointers
    let mut strings_box = strings.into_boxed_slice();
    let strings_ptr = strings_box.as_mut_ptr();
    let strings_len = strings_box.len();

    let mut out_box = out.into_boxed_slice();
    let alerts_ptr = out_box.as_mut_ptr();
    let alerts_len = out_box.len();

    for (alert, off) in out_box.iter_mut().zip(offsets) {
        alert.entity_id.ptr = strings_ptr.add(off);
    }

    // Leak boxes to caller; freed by gapwatch_alerts_free
    std::mem::forget(strings_box);
    std::mem::forget(out_box);

    GwAlertArray {
        alerts_ptr,
        alerts_len,
        strings_ptr,
        strings_len,
    }
}

#[no_mangle]
pub unsafe extern "C" fn gapwatch_alerts_free(arr: GwAlertArray) {
    if !arr.alerts_ptr.is_null() {
        let slice_ptr = std::ptr::slice_from_raw_parts_mut(arr.alerts_ptr, arr.alerts_len);
        drop(Box::from_raw(slice_ptr));
    }
    if !arr.strings_ptr.is_null() {
        let slice_ptr = std::ptr::slice_from_raw_parts_mut(arr.strings_ptr, arr.strings_len);
        drop(Box::from_raw(slice_ptr));
    }
}

fn hit_of(i: &Intersection) -> GwHit {
    GwHit {
        outcome: i.outcome.value(),
        count: i.count as u32,
    }
}

/// Alert or tracker intersections, selected by `GW_INTERSECTIONS_*`.
/// Unknown selectors yield an empty array. Free with `gapwatch_hits_free`.
#[no_mangle]
pub unsafe extern "C" fn gapwatch_intersections(h: *const GwSession, which: u32) -> GwHitArray {
    let empty = GwHitArray { hits_ptr: ptr::null_mut(), hits_len: 0 };
    if h.is_null() {
        return empty;
    }
    let view = (*h).inner.view();
    let src = match which {
        GW_INTERSECTIONS_ALERTS => &view.alert_intersections,
        GW_INTERSECTIONS_TRACKERS => &view.tracker_intersections,
        _ => {
            warn!(which, "unknown intersection selector");
            return empty;
        }
    };
    let mut boxed = src.iter().map(hit_of).collect::<Vec<_>>().into_boxed_slice();
    let hits_ptr = boxed.as_mut_ptr();
    let hits_len = boxed.len();
    std::mem::forget(boxed);
    GwHitArray { hits_ptr, hits_len }
}

#[no_mangle]
pub unsafe extern "C" fn gapwatch_hits_free(arr: GwHitArray) {
    if !arr.hits_ptr.is_null() {
        let slice_ptr = std::ptr::slice_from_raw_parts_mut(arr.hits_ptr, arr.hits_len);
        drop(Box::from_raw(slice_ptr));
    }
}

// ---------------------------------------------------------------------
// Snapshot / restore
// ---------------------------------------------------------------------

/// Snapshot format: UTF-8 JSON of `SessionSnapshot`.
#[no_mangle]
pub unsafe extern "C" fn gapwatch_snapshot(h: *const GwSession) -> GwBytes {
    if h.is_null() {
        return GwBytes::null();
    }
    match serde_json::to_vec(&(*h).inner.snapshot()) {
        Ok(buf) => GwBytes::from_vec(buf),
        Err(e) => {
            warn!(error = %e, "snapshot encode failed");
            GwBytes::null()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn gapwatch_restore(
    h: *mut GwSession,
    bytes: *const u8,
    len: usize,
) -> GwRestoreStats {
    if h.is_null() || bytes.is_null() {
        return GwRestoreStats { applied: 0, skipped: 0, rc: GW_ERR_NULL };
    }
    let data = std::slice::from_raw_parts(bytes, len);
    let snap: SessionSnapshot = match serde_json::from_slice(data) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "snapshot decode failed");
            return GwRestoreStats { applied: 0, skipped: 0, rc: GW_ERR_PARSE };
        }
    };

    let stats = (*h).inner.restore(snap);
    GwRestoreStats {
        applied: stats.applied as u32,
        skipped: stats.skipped as u32,
        rc: GW_OK,
    }
}
