use chrono::{NaiveDate, TimeZone, Utc};
use statline_lib::commands::AppState;
use statline_lib::db::DbPool;
use statline_lib::models::date_key::DateKey;
use statline_lib::models::entry::{EntryUpsert, PeriodType};
use statline_lib::models::quota::QuotaUpsert;
use statline_lib::models::stat::{OrgCategory, StatCreateInput, Trend};
use tempfile::{tempdir, TempDir};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn setup() -> (AppState, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("reports.sqlite")).expect("db pool");
    (AppState::new(pool), dir)
}

fn create_stat(state: &AppState, category: OrgCategory, is_inverted: bool) -> String {
    state
        .stats()
        .create_definition(StatCreateInput {
            name: "Gross income".into(),
            user_id: "user-1".into(),
            created_by: "user-1".into(),
            is_inverted,
            category: Some(category),
            ..Default::default()
        })
        .expect("create stat")
        .id
}

fn record(state: &AppState, stat_id: &str, key: DateKey, value: f64, period_type: PeriodType) {
    state
        .entries()
        .upsert_entry(EntryUpsert {
            stat_id: stat_id.to_string(),
            date_key: key,
            value,
            period_type,
        })
        .expect("record entry");
}

fn seed_scenario_week(state: &AppState, stat_id: &str) {
    for (key, value) in [
        (DateKey::second_half(date(2025, 6, 5)), 5.0),
        (DateKey::day(date(2025, 6, 6)), 3.0),
        (DateKey::day(date(2025, 6, 9)), 4.0),
        (DateKey::day(date(2025, 6, 10)), 2.0),
        (DateKey::day(date(2025, 6, 11)), 6.0),
        (DateKey::day(date(2025, 6, 12)), 1.0),
    ] {
        record(state, stat_id, key, value, PeriodType::Daily);
    }
}

#[test]
fn day_scheme_week_accumulates_values_and_quota() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, OrgCategory::Day, false);
    seed_scenario_week(&state, &stat_id);
    state
        .quotas()
        .upsert_quota(QuotaUpsert {
            stat_id: stat_id.clone(),
            week_ending: date(2025, 6, 12),
            quotas: vec![2.0; 6],
        })
        .expect("quota");

    let report = state
        .reports()
        .weekly_cumulative_report(&stat_id, date(2025, 6, 12), false)
        .expect("report");

    let cumulative: Vec<f64> = report.points.iter().map(|point| point.cumulative).collect();
    assert_eq!(cumulative, vec![5.0, 8.0, 12.0, 14.0, 20.0, 21.0]);

    let quota: Vec<Option<f64>> = report.points.iter().map(|point| point.quota).collect();
    assert_eq!(
        quota,
        vec![Some(2.0), Some(4.0), Some(6.0), Some(8.0), Some(10.0), Some(12.0)]
    );

    assert_eq!(report.points[0].date_key, DateKey::second_half(date(2025, 6, 5)));
    assert_eq!(report.points[5].date_key, DateKey::day(date(2025, 6, 12)));
    assert_eq!(report.quota_week_ending, Some(date(2025, 6, 12)));
    assert!(report.points.iter().all(|point| point.prev_cumulative.is_none()));
}

#[test]
fn missing_days_stay_empty_without_breaking_the_running_total() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, OrgCategory::Foundation, false);
    record(&state, &stat_id, DateKey::day(date(2025, 6, 6)), 3.0, PeriodType::Daily);
    record(&state, &stat_id, DateKey::day(date(2025, 6, 10)), 2.0, PeriodType::Daily);

    let report = state
        .reports()
        .weekly_cumulative_report(&stat_id, date(2025, 6, 12), false)
        .expect("report");

    assert_eq!(report.points.len(), 8);
    let daily: Vec<Option<f64>> = report.points.iter().map(|point| point.daily).collect();
    assert_eq!(
        daily,
        vec![None, Some(3.0), None, None, None, Some(2.0), None, None]
    );
    let cumulative: Vec<f64> = report.points.iter().map(|point| point.cumulative).collect();
    assert_eq!(cumulative, vec![0.0, 3.0, 3.0, 3.0, 3.0, 5.0, 5.0, 5.0]);
    // No quota on file suppresses the quota curve.
    assert!(report.points.iter().all(|point| point.quota.is_none()));
    assert_eq!(report.quota_week_ending, None);
}

#[test]
fn previous_week_is_mirrored_slot_by_slot() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, OrgCategory::Day, false);
    seed_scenario_week(&state, &stat_id);
    record(&state, &stat_id, DateKey::second_half(date(2025, 5, 29)), 1.0, PeriodType::Daily);
    record(&state, &stat_id, DateKey::day(date(2025, 6, 2)), 2.0, PeriodType::Daily);
    record(&state, &stat_id, DateKey::day(date(2025, 6, 5)), 4.0, PeriodType::Daily);

    let report = state
        .reports()
        .weekly_cumulative_report(&stat_id, date(2025, 6, 12), true)
        .expect("report");

    let previous: Vec<Option<f64>> = report
        .points
        .iter()
        .map(|point| point.prev_cumulative)
        .collect();
    assert_eq!(
        previous,
        vec![Some(1.0), Some(1.0), Some(3.0), Some(3.0), Some(3.0), Some(7.0)]
    );
    // The first half of 2025-06-05 belongs to the previous week only.
    assert_eq!(report.points[0].daily, Some(5.0));
}

#[test]
fn earlier_quota_is_used_and_zero_quota_is_hidden() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, OrgCategory::Day, false);
    seed_scenario_week(&state, &stat_id);
    state
        .quotas()
        .upsert_quota(QuotaUpsert {
            stat_id: stat_id.clone(),
            week_ending: date(2025, 5, 29),
            quotas: vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0],
        })
        .expect("earlier quota");

    let lookup = state
        .quotas()
        .get_quota(&stat_id, date(2025, 6, 12))
        .expect("lookup")
        .expect("fallback quota");
    assert!(!lookup.exact_match);
    assert_eq!(lookup.quota.week_ending, date(2025, 5, 29));

    let report = state
        .reports()
        .weekly_cumulative_report(&stat_id, date(2025, 6, 12), false)
        .expect("report");
    assert_eq!(report.quota_week_ending, Some(date(2025, 5, 29)));
    let quota: Vec<Option<f64>> = report.points.iter().map(|point| point.quota).collect();
    assert_eq!(
        quota,
        vec![Some(1.0), Some(1.0), Some(2.0), Some(2.0), Some(3.0), Some(3.0)]
    );

    state
        .quotas()
        .upsert_quota(QuotaUpsert {
            stat_id: stat_id.clone(),
            week_ending: date(2025, 6, 12),
            quotas: vec![0.0; 6],
        })
        .expect("zero quota");
    let report = state
        .reports()
        .weekly_cumulative_report(&stat_id, date(2025, 6, 12), false)
        .expect("report");
    assert!(report.points.iter().all(|point| point.quota.is_none()));
}

#[test]
fn mid_week_dates_resolve_to_the_closing_thursday() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, OrgCategory::Day, false);
    seed_scenario_week(&state, &stat_id);

    let report = state
        .reports()
        .weekly_cumulative_report(&stat_id, date(2025, 6, 10), false)
        .expect("report");
    assert_eq!(report.week_ending, date(2025, 6, 12));
    assert_eq!(report.points.last().map(|point| point.cumulative), Some(21.0));
}

#[test]
fn current_week_follows_the_thursday_boundary() {
    let (state, _dir) = setup();
    let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();

    let window = state.reports().current_week(now).expect("window");
    assert_eq!(window.week_ending_date, date(2025, 6, 12));
    assert_eq!(window.start.to_rfc3339(), "2025-06-05T14:00:00+00:00");
    assert_eq!(window.end.to_rfc3339(), "2025-06-12T14:00:00+00:00");
}

#[test]
fn listing_reports_trend_and_down_streak_from_weekly_entries() {
    let (state, _dir) = setup();
    let rising = create_stat(&state, OrgCategory::Foundation, false);
    let falling = create_stat(&state, OrgCategory::Foundation, false);
    let inverted = create_stat(&state, OrgCategory::Foundation, true);

    let weeks = [date(2025, 5, 22), date(2025, 5, 29), date(2025, 6, 5)];
    for (index, week_ending) in weeks.iter().enumerate() {
        let step = index as f64;
        record(&state, &rising, DateKey::day(*week_ending), 1.0 + step, PeriodType::Weekly);
        record(&state, &falling, DateKey::day(*week_ending), 10.0 - step, PeriodType::Weekly);
        record(&state, &inverted, DateKey::day(*week_ending), 10.0 - step, PeriodType::Weekly);
    }

    let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
    let listing = state
        .stats()
        .list_definitions_at(now, "user-1", false, false)
        .expect("listing");
    assert_eq!(listing.len(), 3);

    let find = |id: &str| {
        listing
            .iter()
            .find(|summary| summary.definition.id == id)
            .expect("listed")
    };
    assert_eq!(find(&rising).trend, Some(Trend::Up));
    assert_eq!(find(&rising).down_streak, Some(0));
    assert_eq!(find(&falling).trend, Some(Trend::Down));
    assert_eq!(find(&falling).down_streak, Some(2));
    assert_eq!(find(&inverted).trend, Some(Trend::Up));
    assert_eq!(find(&inverted).down_streak, Some(0));
}
