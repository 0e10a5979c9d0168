//! Ledger scenario tests
//!
//! Walks the ledger through a fixed event sequence and checks every field

use heapledger::{EventKind, Ledger, LedgerError, Snapshot};

fn snap(
    current_live: u64,
    cumulative_sum: u64,
    event_count: u64,
    average_live: u64,
    max_live: u64,
) -> Snapshot {
    Snapshot {
        current_live,
        cumulative_sum,
        event_count,
        max_live,
        average_live,
    }
}

#[test]
fn test_allocate_free_sequence() {
    let mut ledger = Ledger::new();
    ledger.init();

    ledger.record_event(EventKind::Allocate, 100, 0).unwrap();
    assert_eq!(ledger.report().unwrap(), snap(100, 100, 1, 100, 100));

    ledger.record_event(EventKind::Allocate, 50, 0).unwrap();
    assert_eq!(ledger.report().unwrap(), snap(150, 250, 2, 125, 150));

    // 250 / 3 truncates
    ledger.record_event(EventKind::Free, 150, 0).unwrap();
    assert_eq!(ledger.report().unwrap(), snap(0, 250, 3, 83, 150));
}

#[test]
fn test_resize_applies_net_delta() {
    let mut ledger = Ledger::active();
    ledger.record_event(EventKind::Allocate, 100, 0).unwrap();
    ledger.record_event(EventKind::Allocate, 50, 0).unwrap();
    ledger.record_event(EventKind::Free, 150, 0).unwrap();

    // Resize from nothing is pure growth
    ledger.record_event(EventKind::Resize, 200, 0).unwrap();
    let after_grow = ledger.report().unwrap();
    assert_eq!(after_grow.current_live, 200);
    assert_eq!(after_grow.max_live, 200);

    ledger.record_event(EventKind::Resize, 50, 200).unwrap();
    let after_shrink = ledger.report().unwrap();
    assert_eq!(after_shrink.current_live, 50);
    assert_eq!(after_shrink.max_live, 200);
    assert_eq!(after_shrink.event_count, 5);
    assert_eq!(after_shrink.cumulative_sum, 500);
    assert_eq!(after_shrink.average_live, 100);
}

#[test]
fn test_invalid_raw_code_leaves_state_untouched() {
    let mut ledger = Ledger::active();
    ledger.record_event(EventKind::Allocate, 100, 0).unwrap();
    let before = ledger.report().unwrap();

    assert_eq!(
        ledger.record_raw(99, 10, 0),
        Err(LedgerError::InvalidEventKind(99))
    );
    assert_eq!(ledger.report().unwrap(), before);
}

#[test]
fn test_raw_codes_match_kinds() {
    let mut by_code = Ledger::active();
    let mut by_kind = Ledger::active();
    for kind in EventKind::ALL {
        by_code.record_raw(kind.code(), 64, 32).unwrap();
        by_kind.record_event(kind, 64, 32).unwrap();
    }
    assert_eq!(by_code.report().unwrap(), by_kind.report().unwrap());
}

#[test]
fn test_fresh_session_reports_zero() {
    let mut ledger = Ledger::new();
    ledger.init();

    let snapshot = ledger.report().unwrap();
    assert_eq!(snapshot.event_count, 0);
    assert_eq!(snapshot.max_live, 0);
    assert_eq!(snapshot.average_live, 0);
    assert!(snapshot.is_empty());
}

#[test]
fn test_report_before_init_fails() {
    let ledger = Ledger::new();
    assert_eq!(ledger.report(), Err(LedgerError::NotInitialized));
}

#[test]
fn test_report_is_idempotent() {
    let mut ledger = Ledger::active();
    ledger.record_event(EventKind::Allocate, 7, 0).unwrap();
    ledger.record_event(EventKind::AllocateZeroed, 9, 0).unwrap();

    let first = ledger.report().unwrap();
    let second = ledger.report().unwrap();
    assert_eq!(first, second);
}
