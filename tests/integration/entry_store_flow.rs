use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use statline_lib::commands::AppState;
use statline_lib::db::repositories::stat_entry_repository::StatEntryRepository;
use statline_lib::db::DbPool;
use statline_lib::models::date_key::DateKey;
use statline_lib::models::entry::{EntryUpsert, PeriodType};
use statline_lib::models::quota::QuotaUpsert;
use statline_lib::models::stat::{OrgCategory, StatCreateInput};
use tempfile::{tempdir, TempDir};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn setup() -> (AppState, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("entries.sqlite")).expect("db pool");
    (AppState::new(pool), dir)
}

fn create_stat(state: &AppState, name: &str) -> String {
    state
        .stats()
        .create_definition(StatCreateInput {
            name: name.into(),
            user_id: "user-1".into(),
            created_by: "user-1".into(),
            ..Default::default()
        })
        .expect("create stat")
        .id
}

fn daily(stat_id: &str, key: DateKey, value: f64) -> EntryUpsert {
    EntryUpsert {
        stat_id: stat_id.to_string(),
        date_key: key,
        value,
        period_type: PeriodType::Daily,
    }
}

#[test]
fn repeated_upsert_keeps_one_row_with_latest_value() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, "Letters out");
    let entries = state.entries();

    let first = entries
        .upsert_entry(daily(&stat_id, DateKey::day(date(2025, 6, 6)), 3.0))
        .expect("first upsert");
    let second = entries
        .upsert_entry(daily(&stat_id, DateKey::day(date(2025, 6, 6)), 7.5))
        .expect("second upsert");

    assert_eq!(first.id, second.id);
    assert_eq!(second.value, 7.5);
    assert_eq!(first.created_at, second.created_at);

    let stored = entries
        .get_entries(&stat_id, Some(PeriodType::Daily), None, None)
        .expect("range");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].value, 7.5);
}

#[test]
fn same_date_with_other_period_or_half_is_a_separate_entry() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, "Income");
    let entries = state.entries();
    let thursday = date(2025, 6, 5);

    entries
        .upsert_entry(daily(&stat_id, DateKey::day(thursday), 1.0))
        .expect("first half");
    entries
        .upsert_entry(daily(&stat_id, DateKey::second_half(thursday), 2.0))
        .expect("second half");
    entries
        .upsert_entry(EntryUpsert {
            period_type: PeriodType::Weekly,
            ..daily(&stat_id, DateKey::day(thursday), 9.0)
        })
        .expect("weekly");

    let all = entries
        .get_entries(&stat_id, None, Some(thursday), Some(thursday))
        .expect("range");
    assert_eq!(all.len(), 3);

    let daily_only = entries
        .get_entries(&stat_id, Some(PeriodType::Daily), Some(thursday), Some(thursday))
        .expect("daily range");
    let keys: Vec<DateKey> = daily_only.iter().map(|entry| entry.date_key).collect();
    assert_eq!(
        keys,
        vec![DateKey::day(thursday), DateKey::second_half(thursday)]
    );
}

#[test]
fn range_compares_base_dates_inclusively() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, "Interviews");
    let entries = state.entries();

    for (key, value) in [
        (DateKey::day(date(2025, 6, 4)), 1.0),
        (DateKey::second_half(date(2025, 6, 5)), 2.0),
        (DateKey::day(date(2025, 6, 9)), 3.0),
        (DateKey::day(date(2025, 6, 12)), 4.0),
        (DateKey::day(date(2025, 6, 13)), 5.0),
    ] {
        entries
            .upsert_entry(daily(&stat_id, key, value))
            .expect("seed entry");
    }

    let found = entries
        .get_entries(
            &stat_id,
            Some(PeriodType::Daily),
            Some(date(2025, 6, 5)),
            Some(date(2025, 6, 12)),
        )
        .expect("range");
    let values: Vec<f64> = found.iter().map(|entry| entry.value).collect();
    assert_eq!(values, vec![2.0, 3.0, 4.0]);

    let err = entries
        .get_entries(&stat_id, None, Some(date(2025, 6, 12)), Some(date(2025, 6, 5)))
        .expect_err("inverted range");
    assert!(err.is_validation());
}

#[test]
fn last_n_before_is_newest_first_with_explicit_current_policy() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, "Weekly gross");
    let entries = state.entries();

    let weeks = [
        (date(2025, 5, 22), 4.0),
        (date(2025, 5, 29), 6.0),
        (date(2025, 6, 5), 5.0),
        (date(2025, 6, 12), 8.0),
    ];
    for (week_ending, value) in weeks {
        entries
            .upsert_entry(EntryUpsert {
                period_type: PeriodType::Weekly,
                ..daily(&stat_id, DateKey::day(week_ending), value)
            })
            .expect("weekly entry");
    }

    let reference = date(2025, 6, 12);
    let strict = entries
        .last_n_before(&stat_id, reference, PeriodType::Weekly, 2, false)
        .expect("strict");
    let strict_values: Vec<f64> = strict.iter().map(|entry| entry.value).collect();
    assert_eq!(strict_values, vec![5.0, 6.0]);

    let with_current = entries
        .last_n_before(&stat_id, reference, PeriodType::Weekly, 3, true)
        .expect("with current");
    let current_values: Vec<f64> = with_current.iter().map(|entry| entry.value).collect();
    assert_eq!(current_values, vec![8.0, 5.0, 6.0]);

    // A zero in the current period does not count as populated.
    entries
        .upsert_entry(EntryUpsert {
            period_type: PeriodType::Weekly,
            ..daily(&stat_id, DateKey::day(reference), 0.0)
        })
        .expect("zero current");
    let zero_current = entries
        .last_n_before(&stat_id, reference, PeriodType::Weekly, 1, true)
        .expect("zero current lookup");
    assert_eq!(zero_current[0].value, 5.0);
}

#[test]
fn update_and_delete_by_entry_id() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, "Calls");
    let entries = state.entries();

    let entry = entries
        .upsert_entry(daily(&stat_id, DateKey::day(date(2025, 6, 10)), 2.0))
        .expect("upsert");

    entries
        .update_entry_value(&entry.id, 11.0)
        .expect("update value");
    assert_eq!(entries.find_entry(&entry.id).expect("find").value, 11.0);

    entries.delete_entry(&entry.id).expect("delete");
    assert!(entries.find_entry(&entry.id).expect_err("gone").is_not_found());
    assert!(entries.delete_entry(&entry.id).expect_err("twice").is_not_found());
    assert!(entries
        .update_entry_value("missing", 1.0)
        .expect_err("missing")
        .is_not_found());
}

#[test]
fn deleting_a_definition_cascades_to_entries_and_quotas() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, "Sales");

    state
        .entries()
        .upsert_entry(daily(&stat_id, DateKey::day(date(2025, 6, 10)), 2.0))
        .expect("entry");
    state
        .quotas()
        .upsert_quota(QuotaUpsert {
            stat_id: stat_id.clone(),
            week_ending: date(2025, 6, 12),
            quotas: vec![1.0; 8],
        })
        .expect("quota");

    state.stats().delete_definition(&stat_id).expect("delete stat");

    let remaining = state
        .db()
        .with_connection(|conn| StatEntryRepository::count_for_stat(conn, &stat_id))
        .expect("count");
    assert_eq!(remaining, 0);
    let quota_rows: i64 = state
        .db()
        .with_connection(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM stat_quotas WHERE stat_id = ?1",
                [&stat_id],
                |row| row.get(0),
            )?)
        })
        .expect("quota count");
    assert_eq!(quota_rows, 0);
}

#[test]
fn concurrent_upserts_to_one_key_leave_a_single_row() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, "Concurrent");
    let entries = state.entries();
    let key = DateKey::day(date(2025, 6, 10));

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let entries = Arc::clone(&entries);
            let stat_id = stat_id.clone();
            thread::spawn(move || {
                entries
                    .upsert_entry(daily(&stat_id, key, index as f64))
                    .expect("concurrent upsert");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    let stored = entries
        .get_entries(&stat_id, Some(PeriodType::Daily), None, None)
        .expect("range");
    assert_eq!(stored.len(), 1);
    assert!((0.0..8.0).contains(&stored[0].value));
}

#[test]
fn monthly_entries_land_on_the_first_of_the_month() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, "Monthly");
    let entries = state.entries();

    entries
        .upsert_entry(EntryUpsert {
            period_type: PeriodType::Monthly,
            ..daily(&stat_id, DateKey::day(date(2025, 3, 20)), 10.0)
        })
        .expect("first");
    let second = entries
        .upsert_entry(EntryUpsert {
            period_type: PeriodType::Monthly,
            ..daily(&stat_id, DateKey::day(date(2025, 3, 2)), 12.0)
        })
        .expect("second");

    assert_eq!(second.date_key, DateKey::day(date(2025, 3, 1)));
    let stored = entries
        .get_entries(&stat_id, Some(PeriodType::Monthly), None, None)
        .expect("range");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].value, 12.0);
}

#[test]
fn composites_and_unknown_stats_reject_entries() {
    let (state, _dir) = setup();
    let a = create_stat(&state, "A");
    let b = create_stat(&state, "B");
    let composite = state
        .stats()
        .create_definition(StatCreateInput {
            name: "A and B".into(),
            user_id: "user-1".into(),
            created_by: "user-1".into(),
            linked_stat_ids: vec![a, b],
            category: Some(OrgCategory::Foundation),
            ..Default::default()
        })
        .expect("composite");

    let err = state
        .entries()
        .upsert_entry(daily(&composite.id, DateKey::day(date(2025, 6, 10)), 1.0))
        .expect_err("composite entry");
    assert!(err.is_validation());

    let err = state
        .entries()
        .upsert_entry(daily("nope", DateKey::day(date(2025, 6, 10)), 1.0))
        .expect_err("unknown stat");
    assert!(err.is_not_found());
}
