use chrono::NaiveDate;
use statline_lib::commands::AppState;
use statline_lib::db::DbPool;
use statline_lib::models::date_key::DateKey;
use statline_lib::models::entry::{ImportRow, PeriodType, SkipReason};
use statline_lib::models::stat::StatCreateInput;
use tempfile::{tempdir, TempDir};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn setup() -> (AppState, String, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("import.sqlite")).expect("db pool");
    let state = AppState::new(pool);
    let stat_id = state
        .stats()
        .create_definition(StatCreateInput {
            name: "Imported".into(),
            user_id: "user-1".into(),
            created_by: "user-1".into(),
            ..Default::default()
        })
        .expect("create stat")
        .id;
    (state, stat_id, dir)
}

#[test]
fn text_import_stores_parsed_rows_and_reports_skips() {
    let (state, stat_id, _dir) = setup();

    let summary = state
        .entries()
        .import_text(
            &stat_id,
            PeriodType::Daily,
            "15/06/2025,100\n2025-06-16,120\nbad,xyz",
        )
        .expect("import");

    assert_eq!(summary.imported, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].line_number, 3);
    assert_eq!(summary.skipped[0].reason, SkipReason::UnparseableDate);

    let stored = state
        .entries()
        .get_entries(&stat_id, Some(PeriodType::Daily), None, None)
        .expect("entries");
    let pairs: Vec<(DateKey, f64)> = stored
        .iter()
        .map(|entry| (entry.date_key, entry.value))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (DateKey::day(date(2025, 6, 15)), 100.0),
            (DateKey::day(date(2025, 6, 16)), 120.0),
        ]
    );
}

#[test]
fn header_row_is_not_counted_as_skipped() {
    let (state, stat_id, _dir) = setup();

    let summary = state
        .entries()
        .import_text(
            &stat_id,
            PeriodType::Daily,
            "Date\tValue\n01.06.2025\t4\n2025/06/02\t5",
        )
        .expect("import");

    assert_eq!(summary.imported, 2);
    assert!(summary.skipped.is_empty());
}

#[test]
fn reimporting_overwrites_instead_of_duplicating() {
    let (state, stat_id, _dir) = setup();
    let entries = state.entries();

    entries
        .import_text(&stat_id, PeriodType::Daily, "2025-06-01;1\n2025-06-02;2")
        .expect("first import");
    entries
        .import_text(&stat_id, PeriodType::Daily, "2025-06-01;10\n2025-06-02;20")
        .expect("second import");

    let stored = entries
        .get_entries(&stat_id, Some(PeriodType::Daily), None, None)
        .expect("entries");
    let values: Vec<f64> = stored.iter().map(|entry| entry.value).collect();
    assert_eq!(values, vec![10.0, 20.0]);
}

#[test]
fn a_failing_row_does_not_stop_the_rest() {
    let (state, stat_id, _dir) = setup();

    let rows = vec![
        ImportRow {
            date: date(2025, 6, 1),
            value: 1.0,
        },
        ImportRow {
            date: date(2025, 6, 2),
            value: f64::INFINITY,
        },
        ImportRow {
            date: date(2025, 6, 3),
            value: 3.0,
        },
    ];
    let summary = state
        .entries()
        .bulk_import(&stat_id, PeriodType::Daily, &rows)
        .expect("bulk import");

    assert_eq!(summary.imported, 2);
    assert_eq!(summary.failed, 1);

    let stored = state
        .entries()
        .get_entries(&stat_id, Some(PeriodType::Daily), None, None)
        .expect("entries");
    assert_eq!(stored.len(), 2);
}

#[test]
fn monthly_import_collapses_onto_month_start() {
    let (state, stat_id, _dir) = setup();

    let summary = state
        .entries()
        .import_text(&stat_id, PeriodType::Monthly, "2025-01-15,5\n2025-01-31,6\n2025-02-03,7")
        .expect("import");
    assert_eq!(summary.imported, 3);

    let stored = state
        .entries()
        .get_entries(&stat_id, Some(PeriodType::Monthly), None, None)
        .expect("entries");
    let pairs: Vec<(DateKey, f64)> = stored
        .iter()
        .map(|entry| (entry.date_key, entry.value))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (DateKey::day(date(2025, 1, 1)), 6.0),
            (DateKey::day(date(2025, 2, 1)), 7.0),
        ]
    );
}

#[test]
fn importing_into_an_unknown_stat_fails_outright() {
    let (state, _stat_id, _dir) = setup();
    let err = state
        .entries()
        .import_text("missing", PeriodType::Daily, "2025-06-01,1")
        .expect_err("unknown stat");
    assert!(err.is_not_found());
}
