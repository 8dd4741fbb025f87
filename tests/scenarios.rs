//! End-to-end scenarios S1-S6: rollback, crash/REDO, crash/UNDO, a
//! mixed transaction sequence, double-lock detection, and insert then
//! rollback truncating the logical record count.

mod common;

use common::{insert_all, new_engine, read_str};
use small_record_db::EngineError;

#[test]
fn s1_rollback_of_update_restores_original() {
    let t = new_engine();
    insert_all(&t.engine, &["A", "B", "C"]);

    t.engine.begin().unwrap();
    t.engine.update_record(0, b"X").unwrap();
    t.engine.rollback().unwrap();

    assert_eq!(read_str(&t.engine, 0), "A");
    assert!(!t.engine.is_locked(0));
    assert_eq!(t.engine.get_record_count(), 3);
}

#[test]
fn s2_commit_persists_after_crash_via_redo() {
    let t = new_engine();
    insert_all(&t.engine, &["A", "B"]);
    t.engine.checkpoint().unwrap();

    t.engine.begin().unwrap();
    t.engine.update_record(0, b"MOD").unwrap();
    t.engine.commit().unwrap();

    t.engine.crash();
    t.engine.recover().unwrap();

    assert_eq!(read_str(&t.engine, 0), "MOD");
    assert_eq!(read_str(&t.engine, 1), "B");
    assert_eq!(t.engine.get_record_count(), 2);
}

#[test]
fn s3_uncommitted_update_is_undone() {
    let t = new_engine();
    insert_all(&t.engine, &["A", "B"]);
    t.engine.checkpoint().unwrap();

    t.engine.begin().unwrap();
    t.engine.update_record(1, b"TMP").unwrap();

    t.engine.crash();
    t.engine.recover().unwrap();

    assert_eq!(read_str(&t.engine, 1), "B");
    assert!(!t.engine.is_locked(1));
}

#[test]
fn s4_mixed_scenario() {
    let t = new_engine();
    insert_all(&t.engine, &["E1", "E2", "E3", "E4", "E5"]);
    t.engine.checkpoint().unwrap();

    t.engine.begin().unwrap();
    t.engine.update_record(2, b"C1").unwrap();
    t.engine.commit().unwrap();

    t.engine.begin().unwrap();
    t.engine.update_record(3, b"C2").unwrap();
    t.engine.commit().unwrap();

    t.engine.begin().unwrap();
    t.engine.update_record(4, b"NC").unwrap();
    // no commit

    t.engine.crash();
    t.engine.recover().unwrap();

    assert_eq!(read_str(&t.engine, 2), "C1");
    assert_eq!(read_str(&t.engine, 3), "C2");
    assert_eq!(read_str(&t.engine, 4), "E5");
}

#[test]
fn s5_double_lock_detection() {
    let t = new_engine();
    insert_all(&t.engine, &["original"]);

    t.engine.begin().unwrap();
    t.engine.update_record(0, b"x").unwrap();
    let err = t.engine.update_record(0, b"y").unwrap_err();
    assert!(matches!(err, EngineError::RecordLocked(0)));

    t.engine.rollback().unwrap();
    assert!(!t.engine.is_locked(0));
    assert_eq!(read_str(&t.engine, 0), "original");
}

#[test]
fn s6_insert_rollback_truncates_logical_count() {
    let t = new_engine();
    for i in 0..105 {
        t.engine.insert_record(format!("r{}", i).as_bytes()).unwrap();
    }
    assert_eq!(t.engine.get_record_count(), 105);

    t.engine.begin().unwrap();
    t.engine.insert_record(b"A").unwrap();
    t.engine.insert_record(b"B").unwrap();
    t.engine.rollback().unwrap();

    assert_eq!(t.engine.get_record_count(), 105);
    let err = t.engine.read_record(105).unwrap_err();
    assert!(matches!(err, EngineError::OutOfBounds(_)));
}
