//! Error handling and edge case tests.

mod common;

use cascade::{Changeset, EngineConfig, EngineError, Transition, UpdateMode, UserInfo};
use common::{data_source, p, record, s, seed, tag_of, tagged, CardRenderer};
use std::sync::Arc;

// --- Validation Errors ---

#[test]
fn test_out_of_bounds_async_reports_failure() {
    let source = data_source();
    seed(&source, &["A", "B"]);
    let before = source.state();
    let log = record(&source);

    let changeset = Changeset::builder().with_removed_items([p(0, 9)]).build();
    source
        .apply_changeset(changeset, UpdateMode::Asynchronous, UserInfo::new())
        .unwrap();
    source.wait_until_idle();

    let log = log.lock();
    assert_eq!(log.len(), 1);
    match &log[0] {
        Transition::Failed(failed) => {
            assert!(Arc::ptr_eq(&failed.previous, &before));
            assert_eq!(*failed.previous, *before);
            assert!(matches!(failed.error, EngineError::ItemOutOfBounds { len: 2, .. }));
            assert!(failed.error.is_validation());
        }
        other => panic!("Expected failed transition, got {:?}", other),
    }
    assert!(Arc::ptr_eq(&source.state(), &before));
}

#[test]
fn test_sync_caller_receives_error() {
    let source = data_source();
    seed(&source, &["A"]);
    let before = source.state();

    let changeset = Changeset::builder().with_inserted_items([(p(0, 3), s("X"))]).build();
    let result = source.apply_changeset(changeset, UpdateMode::Synchronous, UserInfo::new());

    assert!(matches!(result, Err(EngineError::ItemOutOfBounds { .. })));
    assert_eq!(*source.state(), *before);
}

#[test]
fn test_missing_section() {
    let source = data_source();
    seed(&source, &["A"]);

    let changeset = Changeset::builder().with_updated_items([(p(4, 0), s("X"))]).build();
    let result = source.apply_changeset(changeset, UpdateMode::Synchronous, UserInfo::new());
    assert!(matches!(
        result,
        Err(EngineError::SectionOutOfBounds { section: 4, count: 1 })
    ));
}

#[test]
fn test_conflicting_destinations() {
    let source = data_source();
    seed(&source, &["A", "B"]);

    let changeset = Changeset::builder()
        .with_moved_items([(p(0, 1), p(0, 0))])
        .with_inserted_items([(p(0, 0), s("X"))])
        .build();
    let result = source.apply_changeset(changeset, UpdateMode::Synchronous, UserInfo::new());
    assert!(matches!(result, Err(EngineError::Conflict(_))));
}

#[test]
fn test_remove_wins_over_update_and_move() {
    let source = data_source();
    seed(&source, &["A", "B", "C"]);

    let changeset = Changeset::builder()
        .with_removed_items([p(0, 0), p(0, 1)])
        .with_updated_items([(p(0, 0), s("A2"))])
        .with_moved_items([(p(0, 1), p(0, 0))])
        .build();
    source
        .apply_changeset(changeset, UpdateMode::Synchronous, UserInfo::new())
        .unwrap();
    assert_eq!(source.state().models(), vec![vec![s("C")]]);
}

#[test]
fn test_state_update_out_of_bounds() {
    let source = data_source();
    seed(&source, &["A"]);
    let result = source.update_item_state(p(0, 1), |count| count + 1, UpdateMode::Synchronous, UserInfo::new());
    assert!(matches!(result, Err(EngineError::ItemOutOfBounds { .. })));
}

// --- Render Errors ---

#[test]
fn test_render_failure_is_scoped() {
    let source = data_source();
    seed(&source, &["A"]);
    let log = record(&source);

    let bad = Changeset::builder().with_inserted_items([(p(0, 1), s("!broken"))]).build();
    let good = Changeset::builder().with_inserted_items([(p(0, 1), s("B"))]).build();
    source
        .apply_changeset(bad, UpdateMode::Asynchronous, tagged("bad"))
        .unwrap();
    source
        .apply_changeset(good, UpdateMode::Asynchronous, tagged("good"))
        .unwrap();
    source.wait_until_idle();

    let log = log.lock();
    assert_eq!(log.len(), 2);
    assert_eq!(tag_of(&log[0]).as_deref(), Some("bad"));
    match log[0].error() {
        Some(EngineError::Render { path, message }) => {
            assert_eq!(*path, p(0, 1));
            assert!(message.contains("!broken"));
        }
        other => panic!("Expected render error, got {:?}", other),
    }
    // The next modification applies to the last good State.
    assert!(!log[1].is_failure());
    assert!(Arc::ptr_eq(log[1].previous(), log[0].previous()));
    assert_eq!(source.state().models(), vec![vec![s("A"), s("B")]]);
}

#[test]
fn test_reload_failure_keeps_state() {
    let source = data_source();
    seed(&source, &["A"]);
    let before = source.state();

    // Inserting an unrenderable model fails, so the broken model never
    // enters a State and later reloads stay healthy.
    let bad = Changeset::builder().with_inserted_items([(p(0, 0), s("!x"))]).build();
    assert!(source
        .apply_changeset(bad, UpdateMode::Synchronous, UserInfo::new())
        .is_err());
    source.reload(UpdateMode::Synchronous, UserInfo::new()).unwrap();
    assert_eq!(source.state().models(), before.models());
}

// --- Listener Errors ---

#[test]
fn test_panicking_listener_does_not_stall_queue() {
    let source = data_source();
    seed(&source, &[]);
    source.add_listener(Arc::new(|_: &Transition<CardRenderer>| panic!("listener bug")));
    let log = record(&source);

    for item in 0..3 {
        let changeset = Changeset::builder()
            .with_inserted_items([(p(0, item), format!("m{}", item))])
            .build();
        source
            .apply_changeset(changeset, UpdateMode::Asynchronous, UserInfo::new())
            .unwrap();
    }
    source.wait_until_idle();

    assert_eq!(log.lock().len(), 3);
    assert_eq!(source.state().item_count(), 3);
}

#[test]
fn test_remove_listener_from_callback() {
    let source = Arc::new(data_source());
    seed(&source, &[]);
    let calls = Arc::new(parking_lot::Mutex::new(0));
    let id_slot = Arc::new(parking_lot::Mutex::new(None));

    let id = {
        let weak = Arc::downgrade(&source);
        let calls = Arc::clone(&calls);
        let id_slot = Arc::clone(&id_slot);
        source.add_listener(Arc::new(move |_: &Transition<CardRenderer>| {
            *calls.lock() += 1;
            if let (Some(source), Some(id)) = (weak.upgrade(), *id_slot.lock()) {
                source.remove_listener(id);
            }
        }))
    };
    *id_slot.lock() = Some(id);

    source.reload(UpdateMode::Synchronous, UserInfo::new()).unwrap();
    source.reload(UpdateMode::Synchronous, UserInfo::new()).unwrap();
    assert_eq!(*calls.lock(), 1);
}

// --- Configuration Errors ---

#[test]
fn test_invalid_engine_config() {
    let result = EngineConfig::from_json(r#"{"split": {"batch_size": 0}}"#);
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));

    let result = EngineConfig::from_json(r#"{"worker_threads": "many"}"#);
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
}
