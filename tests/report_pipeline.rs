//! End-to-end report pipeline tests over SQLite, plus property checks of the
//! aggregation and ranking invariants over arbitrary event sets.

mod common;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use common::{line, seed_store, ts};
use fulfillment_monitor::prelude::*;

#[test]
fn sqlite_report_matches_expected_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_store(dir.path());

    let store = SqliteEventStore::open_read_only(&path).unwrap();
    let report = ReportEngine::new(&store)
        .generate(&ReportQuery::new(ts(2, 0, 0)))
        .unwrap();

    assert_eq!(report.row_count, 2);
    let ids: Vec<&str> = report.rows.iter().map(|r| r.key.request_id.as_str()).collect();
    assert_eq!(ids, vec!["R-200", "R-100"]);

    let pending = &report.rows[0];
    assert!(pending.progress_percent.is_undefined());
    assert_eq!(format_percent(pending.progress_percent), "-");
    assert_eq!(pending.elapsed_ms, 0);

    let done = &report.rows[1];
    assert_eq!(done.distinct_item_count, 2);
    assert_eq!(done.progress_percent, Percent::Known(50.0));
    assert_eq!(done.key.document_number, "105501");
    assert_eq!(done.assignee_name, "Ana Rojas");
    assert_eq!(done.window_start, ts(2, 9, 0));
    assert_eq!(done.window_end, ts(2, 10, 0));
    assert_eq!(done.elapsed_ms, 3_600_000);

    // (0 + 3_600_000) / 2
    assert_eq!(report.fleet.average_elapsed_formatted, "00:30:00");
}

#[test]
fn sqlite_and_memory_sources_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_store(dir.path());
    let store = SqliteEventStore::open_read_only(&path).unwrap();

    let mut memory: MemoryEventSource = [
        line("R-100", "EAN-1", 6.0, Some(3.0), ts(2, 9, 0), ts(2, 9, 20)),
        line("R-100", "EAN-2", 4.0, Some(2.0), ts(2, 9, 5), ts(2, 10, 0)),
        line("R-200", "EAN-1", 0.0, None, ts(2, 11, 0), ts(2, 11, 0)),
        line("R-050", "EAN-9", 2.0, Some(2.0), ts(1, 8, 0), ts(1, 9, 0)),
    ]
    .into_iter()
    .collect();
    memory.add_assignee(7, "Ana Rojas");

    let query = ReportQuery::new(ts(1, 0, 0));
    let from_sqlite = ReportEngine::new(&store).generate(&query).unwrap();
    let from_memory = ReportEngine::new(&memory).generate(&query).unwrap();
    assert_eq!(from_sqlite, from_memory);
    assert_eq!(from_sqlite.row_count, 3);
}

#[test]
fn missing_database_is_a_data_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SqliteEventStore::open_read_only(&dir.path().join("absent.sqlite3"))
        .map(|_| ())
        .unwrap_err();
    assert!(err.is_data_source());
    assert_eq!(err.code(), "FM-2001");
}

#[test]
fn repeated_reports_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_store(dir.path());
    let store = SqliteEventStore::open_read_only(&path).unwrap();
    let engine = ReportEngine::new(&store);
    let query = ReportQuery::new(ts(2, 0, 0));

    let first = engine.generate(&query).unwrap();
    let second = engine.generate(&query).unwrap();
    assert_eq!(first, second);
}

#[test]
fn json_export_of_sqlite_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_store(dir.path());
    let store = SqliteEventStore::open_read_only(&path).unwrap();
    let report = ReportEngine::new(&store)
        .generate(&ReportQuery::new(ts(2, 0, 0)))
        .unwrap();

    let json = export_json(&report, &CellFormatter::default(), &Utc);
    assert_eq!(json["row_count"], 2);
    assert_eq!(json["rows"][1]["display"]["elapsed"], "01:00:00");
    assert_eq!(json["rows"][1]["display"]["window_end"], "02/03/2026 10:00:00");
    assert_eq!(json["rows"][1]["assignee_name"], "Ana Rojas");
}

// ──────────────────── properties ────────────────────

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
}

fn arb_document_type() -> impl Strategy<Value = DocumentType> {
    prop_oneof![
        Just(DocumentType::Boleta),
        Just(DocumentType::Other("F".to_string())),
        Just(DocumentType::Other("G".to_string())),
        Just(DocumentType::Other("B".to_string())),
    ]
}

prop_compose! {
    fn arb_event()(
        request in 0u8..6,
        order in 0u8..3,
        document in 0u8..3,
        document_type in arb_document_type(),
        item in 0u8..5,
        scanned in 0u32..500,
        requested in proptest::option::of(0u32..500),
        assigned_offset in 0i64..86_400,
        updated_offset in -3_600i64..86_400,
        assignee in proptest::option::of(1i64..4),
    ) -> FulfillmentEvent {
        let assigned_at = base() + Duration::seconds(assigned_offset);
        FulfillmentEvent {
            request_id: format!("R{request}"),
            sales_order_id: format!("SO{order}"),
            document_number: document.to_string(),
            document_type,
            item_code: format!("EAN-{item}"),
            quantity_scanned: f64::from(scanned),
            quantity_requested: requested.map(f64::from),
            assigned_at,
            updated_at: assigned_at + Duration::seconds(updated_offset),
            assignee_id: assignee,
        }
    }
}

fn build(events: &[FulfillmentEvent]) -> Report {
    let rows = aggregate(events, &HashMap::new());
    let fleet = compute_fleet_stats(&rows);
    assemble(rows, fleet, base(), DisplayOptions::default())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn one_row_per_distinct_group(events in proptest::collection::vec(arb_event(), 0..60)) {
        let report = build(&events);
        let expected: HashSet<GroupKey> = events.iter().map(GroupKey::of).collect();
        let seen: HashSet<GroupKey> = report.rows.iter().map(|r| r.key.clone()).collect();

        prop_assert_eq!(report.row_count, report.rows.len());
        prop_assert_eq!(seen.len(), report.rows.len());
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn placeholder_iff_nothing_scanned(events in proptest::collection::vec(arb_event(), 1..60)) {
        for row in build(&events).rows {
            let undefined = format_percent(row.progress_percent) == "-";
            prop_assert_eq!(undefined, row.total_quantity == 0.0, "row {:?}", row.key);
        }
    }

    #[test]
    fn elapsed_is_clamped_window_span(events in proptest::collection::vec(arb_event(), 1..60)) {
        for row in build(&events).rows {
            let span = (row.window_end - row.window_start).num_milliseconds().max(0);
            prop_assert_eq!(i64::try_from(row.elapsed_ms).unwrap(), span);
        }
    }

    #[test]
    fn least_complete_rows_come_first(events in proptest::collection::vec(arb_event(), 0..60)) {
        let report = build(&events);
        for pair in report.rows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            match (a.progress_percent, b.progress_percent) {
                (Percent::Known(_), Percent::Undefined) => {
                    prop_assert!(false, "{:?} ranked before undefined {:?}", a.key, b.key);
                }
                (Percent::Undefined, Percent::Undefined) => {
                    prop_assert!(a.key.request_id <= b.key.request_id);
                }
                (Percent::Known(x), Percent::Known(y)) => {
                    prop_assert!(x <= y, "{} before {}", x, y);
                    if x == y {
                        prop_assert!(a.key.request_id <= b.key.request_id);
                    }
                }
                (Percent::Undefined, Percent::Known(_)) => {}
            }
        }
    }

    #[test]
    fn ranking_ignores_input_order(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut reversed = events.clone();
        reversed.reverse();
        let forward: Vec<GroupKey> = build(&events).rows.into_iter().map(|r| r.key).collect();
        let backward: Vec<GroupKey> = build(&reversed).rows.into_iter().map(|r| r.key).collect();
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn fleet_average_is_row_mean(events in proptest::collection::vec(arb_event(), 1..60)) {
        let report = build(&events);
        #[allow(clippy::cast_precision_loss)]
        let mean = report.rows.iter().map(|r| r.elapsed_ms as f64).sum::<f64>()
            / report.rows.len() as f64;
        prop_assert!((report.fleet.average_elapsed_ms - mean).abs() < 1e-6);
    }

    #[test]
    fn item_count_bounded_by_events(events in proptest::collection::vec(arb_event(), 1..60)) {
        let report = build(&events);
        let total_items: usize = report.rows.iter().map(|r| r.distinct_item_count).sum();
        prop_assert!(total_items <= events.len());
        prop_assert!(report.rows.iter().all(|r| r.distinct_item_count >= 1));
    }
}
