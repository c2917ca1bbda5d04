use chrono::NaiveDate;

use crate::models::quota::{QuotaLookup, QuotaUpsert, StatQuota};

use super::{run_blocking, Actor, AppState, CommandResult};

/// `None` when the stat has no quota at or before `week_ending`.
pub async fn quotas_get(
    state: &AppState,
    stat_id: String,
    week_ending: NaiveDate,
) -> CommandResult<Option<QuotaLookup>> {
    let app_state = state.clone();
    run_blocking(move || app_state.quotas().get_quota(&stat_id, week_ending)).await
}

pub async fn quotas_upsert(
    state: &AppState,
    actor: Actor,
    quota: QuotaUpsert,
) -> CommandResult<StatQuota> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.authorize_for_stat(&actor, &quota.stat_id)?;
        app_state.quotas().upsert_quota(quota)
    })
    .await
}

pub async fn quotas_delete(
    state: &AppState,
    actor: Actor,
    stat_id: String,
    week_ending: NaiveDate,
) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.authorize_for_stat(&actor, &stat_id)?;
        app_state.quotas().delete_quota(&stat_id, week_ending)
    })
    .await
}
