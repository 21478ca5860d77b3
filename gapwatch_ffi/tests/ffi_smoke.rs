//! FFI smoke tests.
//!
//! These tests call the exported `extern "C"` functions directly (as an external consumer would),
//! to validate:
//! - ABI surface compiles and links
//! - allocation/free symmetry for returned buffers
//! - error codes for rejected input
//! - snapshot/restore round-trip works

use std::ptr;

use gapwatch_ffi::*;

fn s(s: &str) -> GwStr {
    GwStr {
        ptr: s.as_ptr(),
        len: s.len(),
    }
}

fn bytes_to_string(b: &GwBytes) -> String {
    let raw = unsafe { std::slice::from_raw_parts(b.ptr, b.len) };
    String::from_utf8(raw.to_vec()).unwrap()
}

#[test]
fn ffi_version_and_default_cfg() {
    assert_eq!(gapwatch_ffi_version(), GAPWATCH_FFI_VERSION);

    let cfg = gapwatch_cfg_default();
    assert_eq!(cfg.history_capacity, 150);
    assert_eq!(cfg.auto_warmup, 30);
    assert_eq!(cfg.alert_max_score, 6);
    assert!(cfg.threshold_multiplier.is_finite());
    assert_eq!(cfg.entity_auto_threshold, 0);
}

#[test]
fn ffi_null_handle_is_rejected() {
    unsafe {
        assert_eq!(gapwatch_push(ptr::null_mut(), 1), GW_ERR_NULL);
        assert_eq!(gapwatch_undo(ptr::null_mut()), GW_ERR_NULL);
        assert_eq!(gapwatch_active_len(ptr::null()), -1);
        assert!(gapwatch_export_json(ptr::null()).ptr.is_null());
        gapwatch_session_free(ptr::null_mut());
    }
}

#[test]
fn ffi_push_undo_export() {
    let h = gapwatch_session_new(gapwatch_cfg_default(), 0);
    assert!(!h.is_null());

    unsafe {
        assert_eq!(gapwatch_push(h, 7), GW_OK);
        assert_eq!(gapwatch_push(h, 37), GW_ERR_RANGE);
        assert_eq!(gapwatch_push(h, 0), GW_OK);
        assert_eq!(gapwatch_active_len(h), 2);

        assert_eq!(gapwatch_undo(h), 1);
        assert_eq!(gapwatch_undo(h), 0);
        assert_eq!(gapwatch_active_len(h), 1);
        assert_eq!(gapwatch_redo(h), 1);

        let out = gapwatch_export_json(h);
        assert_eq!(bytes_to_string(&out), "[7,0]");
        gapwatch_bytes_free(out);

        assert_eq!(gapwatch_clear(h), GW_OK);
        assert_eq!(gapwatch_active_len(h), 0);
        gapwatch_session_free(h);
    }
}

#[test]
fn ffi_import_and_peer_codes() {
    let h = gapwatch_session_new(gapwatch_cfg_default(), 0);
    unsafe {
        assert_eq!(gapwatch_import_json(h, s("[1,2,3]")), 3);
        assert_eq!(gapwatch_import_json(h, s("[1,99]")), GW_ERR_IMPORT);
        assert_eq!(gapwatch_import_json(h, s("not json")), GW_ERR_PARSE);

        let bad = [0xffu8, 0xfe];
        let bad = GwStr { ptr: bad.as_ptr(), len: bad.len() };
        assert_eq!(gapwatch_import_json(h, bad), GW_ERR_UTF8);

        assert_eq!(gapwatch_peer_json(h, s(r#"{"type":"spin","number":4}"#)), GW_OK);
        assert_eq!(gapwatch_peer_json(h, s(r#"{"type":"chat"}"#)), GW_OK);
        assert_eq!(gapwatch_peer_json(h, s(r#"{"type":"spin","number":-3}"#)), GW_ERR_RANGE);
        assert_eq!(gapwatch_active_len(h), 4);
        gapwatch_session_free(h);
    }
}

#[test]
fn ffi_alerts_and_intersections() {
    let h = gapwatch_session_new(gapwatch_cfg_default(), 0);
    unsafe {
        for _ in 0..40 {
            gapwatch_push(h, 0);
        }

        let arr = gapwatch_alerts(h);
        assert!(arr.alerts_len >= 3);
        assert!(!arr.alerts_ptr.is_null());
        let alerts = std::slice::from_raw_parts(arr.alerts_ptr, arr.alerts_len);
        for a in alerts {
            assert_eq!(a.last_seen_ago, 40);
            assert_eq!(a.numbers_mask & 1, 0);
            let id = std::slice::from_raw_parts(a.entity_id.ptr, a.entity_id.len);
            assert!(std::str::from_utf8(id).unwrap().contains('-'));
        }
        gapwatch_alerts_free(arr);

        let hits = gapwatch_intersections(h, GW_INTERSECTIONS_ALERTS);
        assert!(hits.hits_len > 0);
        let hits_slice = std::slice::from_raw_parts(hits.hits_ptr, hits.hits_len);
        assert!(hits_slice.iter().all(|hit| hit.count >= 3 && hit.outcome != 0));
        gapwatch_hits_free(hits);

        let none = gapwatch_intersections(h, GW_INTERSECTIONS_TRACKERS);
        assert_eq!(none.hits_len, 0);
        gapwatch_hits_free(none);

        let unknown = gapwatch_intersections(h, 7);
        assert!(unknown.hits_ptr.is_null());
        assert_eq!(unknown.hits_len, 0);
        gapwatch_hits_free(unknown);

        gapwatch_session_free(h);
    }
}

#[test]
fn ffi_trackers() {
    let h = gapwatch_session_new(gapwatch_cfg_default(), 1);
    unsafe {
        let mut id = GwBytes { ptr: ptr::null_mut(), len: 0 };
        assert_eq!(gapwatch_add_tracker(h, s("low"), 0b1110, 2.0, 0, &mut id), GW_OK);
        assert!(!id.ptr.is_null());
        assert_eq!(bytes_to_string(&id), "t7");
        gapwatch_bytes_free(id);

        assert_eq!(
            gapwatch_add_tracker(h, s("none"), 0, 2.0, 0, ptr::null_mut()),
            GW_ERR_EMPTY_TRACKER
        );
        assert_eq!(
            gapwatch_add_tracker(h, s("inf"), 0b10, f64::INFINITY, 0, ptr::null_mut()),
            GW_ERR_THRESHOLD
        );

        let bad = [0xffu8, 0xfe];
        let bad = GwStr { ptr: bad.as_ptr(), len: bad.len() };
        assert_eq!(gapwatch_add_tracker(h, bad, 0b10, 2.0, 0, ptr::null_mut()), GW_ERR_UTF8);
        let null_name = GwStr { ptr: ptr::null(), len: 0 };
        assert_eq!(gapwatch_add_tracker(h, null_name, 0b10, 2.0, 0, ptr::null_mut()), GW_ERR_NULL);

        assert_eq!(gapwatch_remove_tracker(h, s("t7")), GW_OK);
        assert_eq!(gapwatch_remove_tracker(h, s("t7")), GW_ERR_UNKNOWN_TRACKER);
        gapwatch_session_free(h);
    }
}

#[test]
fn ffi_unusable_multiplier_falls_back_to_default() {
    let mut cfg = gapwatch_cfg_default();
    cfg.threshold_multiplier = f64::NAN;
    let h = gapwatch_session_new(cfg, 0);
    unsafe {
        gapwatch_push(h, 3);
        let snap = gapwatch_snapshot(h);
        let other = gapwatch_session_new(gapwatch_cfg_default(), 0);
        let stats = gapwatch_restore(other, snap.ptr as *const u8, snap.len);
        assert_eq!(stats.rc, GW_OK);
        assert_eq!(stats.skipped, 0);
        gapwatch_bytes_free(snap);
        gapwatch_session_free(other);
        gapwatch_session_free(h);
    }
}

#[test]
fn ffi_snapshot_restore_roundtrip() {
    let h = gapwatch_session_new(gapwatch_cfg_default(), 1);
    assert!(!h.is_null());

    unsafe {
        for n in [3, 17, 22, 9] {
            gapwatch_push(h, n);
        }
        gapwatch_undo(h);

        let snap = gapwatch_snapshot(h);
        assert!(!snap.ptr.is_null());

        let other = gapwatch_session_new(gapwatch_cfg_default(), 0);
        let stats = gapwatch_restore(other, snap.ptr as *const u8, snap.len);
        assert_eq!(stats.rc, GW_OK);
        assert!(stats.applied > 0);
        assert_eq!(stats.skipped, 0);
        assert_eq!(gapwatch_active_len(other), 3);

        let out = gapwatch_export_json(other);
        assert_eq!(bytes_to_string(&out), "[3,17,22,9]");
        gapwatch_bytes_free(out);

        let garbage = b"{nope";
        let bad = gapwatch_restore(other, garbage.as_ptr(), garbage.len());
        assert_eq!(bad.rc, GW_ERR_PARSE);

        gapwatch_bytes_free(snap);
        gapwatch_session_free(other);
        gapwatch_session_free(h);
    }
}
