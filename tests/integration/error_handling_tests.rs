use chrono::NaiveDate;
use statline_lib::commands::{AppState, CommandError};
use statline_lib::db::DbPool;
use statline_lib::error::AppError;
use statline_lib::models::date_key::DateKey;
use statline_lib::models::entry::{EntryUpsert, PeriodType};
use statline_lib::models::quota::QuotaUpsert;
use statline_lib::models::stat::{OrgCategory, StatCreateInput, StatUpdateInput};
use tempfile::{tempdir, TempDir};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn setup() -> (AppState, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("errors.sqlite")).expect("db pool");
    (AppState::new(pool), dir)
}

fn create_stat(state: &AppState, category: OrgCategory) -> String {
    state
        .stats()
        .create_definition(StatCreateInput {
            name: "Stat".into(),
            user_id: "user-1".into(),
            created_by: "user-1".into(),
            category: Some(category),
            ..Default::default()
        })
        .expect("create stat")
        .id
}

#[test]
fn quota_length_must_match_the_slot_scheme() {
    let (state, _dir) = setup();
    let day_stat = create_stat(&state, OrgCategory::Day);
    let foundation_stat = create_stat(&state, OrgCategory::Foundation);

    let err = state
        .quotas()
        .upsert_quota(QuotaUpsert {
            stat_id: day_stat.clone(),
            week_ending: date(2025, 6, 12),
            quotas: vec![1.0; 8],
        })
        .expect_err("day scheme has six slots");

    match err {
        AppError::Validation { details, .. } => {
            let details = details.expect("details");
            assert_eq!(details["expected"], 6);
            assert_eq!(details["actual"], 8);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    state
        .quotas()
        .upsert_quota(QuotaUpsert {
            stat_id: foundation_stat,
            week_ending: date(2025, 6, 12),
            quotas: vec![1.0; 8],
        })
        .expect("foundation scheme has eight slots");

    // Nothing was stored for the rejected call.
    assert!(state
        .quotas()
        .get_quota(&day_stat, date(2025, 6, 12))
        .expect("lookup")
        .is_none());
}

#[test]
fn quota_week_ending_must_be_the_closing_weekday() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, OrgCategory::Foundation);

    let err = state
        .quotas()
        .upsert_quota(QuotaUpsert {
            stat_id,
            week_ending: date(2025, 6, 11),
            quotas: vec![1.0; 8],
        })
        .expect_err("wednesday");
    assert!(err.is_validation());
}

#[test]
fn upserting_a_quota_twice_updates_in_place() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, OrgCategory::Day);
    let quotas = state.quotas();

    let first = quotas
        .upsert_quota(QuotaUpsert {
            stat_id: stat_id.clone(),
            week_ending: date(2025, 6, 12),
            quotas: vec![1.0; 6],
        })
        .expect("first");
    let second = quotas
        .upsert_quota(QuotaUpsert {
            stat_id: stat_id.clone(),
            week_ending: date(2025, 6, 12),
            quotas: vec![3.0; 6],
        })
        .expect("second");

    assert_eq!(first.id, second.id);
    let lookup = quotas
        .get_quota(&stat_id, date(2025, 6, 12))
        .expect("lookup")
        .expect("quota");
    assert!(lookup.exact_match);
    assert_eq!(lookup.quota.quotas, vec![3.0; 6]);
    assert!(quotas
        .get_quota(&stat_id, date(2025, 6, 5))
        .expect("earlier lookup")
        .is_none());
}

#[test]
fn second_half_tag_is_only_valid_on_the_split_day() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, OrgCategory::Foundation);

    let err = state
        .entries()
        .upsert_entry(EntryUpsert {
            stat_id,
            date_key: DateKey::second_half(date(2025, 6, 10)),
            value: 1.0,
            period_type: PeriodType::Daily,
        })
        .expect_err("tuesday second half");
    assert!(err.is_validation());
}

#[test]
fn empty_stat_name_is_rejected() {
    let (state, _dir) = setup();
    let err = state
        .stats()
        .create_definition(StatCreateInput {
            name: "   ".into(),
            user_id: "user-1".into(),
            ..Default::default()
        })
        .expect_err("blank name");
    assert!(err.is_validation());
}

#[test]
fn app_errors_map_to_command_codes() {
    let cases = [
        (AppError::validation("bad"), "VALIDATION_ERROR"),
        (AppError::not_found(), "NOT_FOUND"),
        (AppError::conflict("dup"), "CONFLICT"),
        (AppError::unauthorized("no"), "UNAUTHORIZED"),
        (AppError::database("disk"), "UNKNOWN"),
        (AppError::other("boom"), "UNKNOWN"),
    ];
    for (error, code) in cases {
        assert_eq!(CommandError::from(error).code, code);
    }

    let detailed = CommandError::from(AppError::validation_with_details(
        "bad quota",
        serde_json::json!({ "expected": 6 }),
    ));
    let json = serde_json::to_value(&detailed).expect("serialize");
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["details"]["expected"], 6);

    let plain = serde_json::to_value(CommandError::from(AppError::not_found())).expect("serialize");
    assert!(plain.get("details").is_none());
}

#[test]
fn malformed_date_keys_are_validation_errors() {
    let err = DateKey::decode("2025-13-01").expect_err("month 13");
    assert!(err.is_validation());
    let err = DateKey::decode("2025-06-05_c").expect_err("unknown suffix");
    assert!(err.is_validation());
    assert!(serde_json::from_str::<DateKey>("\"not a date\"").is_err());
}

#[test]
fn category_cannot_change_under_quotas_sized_for_the_old_scheme() {
    let (state, _dir) = setup();
    let stat_id = create_stat(&state, OrgCategory::Day);
    state
        .quotas()
        .upsert_quota(QuotaUpsert {
            stat_id: stat_id.clone(),
            week_ending: date(2025, 6, 12),
            quotas: vec![2.0; 6],
        })
        .expect("day quota");

    let err = state
        .stats()
        .update_definition(
            &stat_id,
            StatUpdateInput {
                category: Some(OrgCategory::Foundation),
                ..Default::default()
            },
        )
        .expect_err("six stored values against eight slots");
    match err {
        AppError::Validation { details, .. } => {
            let details = details.expect("details");
            assert_eq!(details["expected"], 8);
            assert_eq!(details["stored"], 6);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let definition = state.stats().get_definition(&stat_id).expect("get");
    assert_eq!(definition.category, OrgCategory::Day);

    // Re-saving the current category is a no-op.
    state
        .stats()
        .update_definition(
            &stat_id,
            StatUpdateInput {
                category: Some(OrgCategory::Day),
                ..Default::default()
            },
        )
        .expect("same category");

    state
        .quotas()
        .delete_quota(&stat_id, date(2025, 6, 12))
        .expect("delete quota");
    let definition = state
        .stats()
        .update_definition(
            &stat_id,
            StatUpdateInput {
                category: Some(OrgCategory::Foundation),
                ..Default::default()
            },
        )
        .expect("no quotas left");
    assert_eq!(definition.category, OrgCategory::Foundation);
}
