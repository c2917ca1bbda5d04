use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::entry::{EntryUpsert, ImportRow, ImportSummary, PeriodType, StatEntry};

use super::{run_blocking, Actor, AppState, CommandResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryQuery {
    pub stat_id: String,
    #[serde(default)]
    pub period_type: Option<PeriodType>,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

pub async fn entries_get(state: &AppState, query: EntryQuery) -> CommandResult<Vec<StatEntry>> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .entries()
            .get_entries(&query.stat_id, query.period_type, query.start, query.end)
    })
    .await
}

pub async fn entries_upsert(
    state: &AppState,
    actor: Actor,
    entry: EntryUpsert,
) -> CommandResult<StatEntry> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.authorize_for_stat(&actor, &entry.stat_id)?;
        app_state.entries().upsert_entry(entry)
    })
    .await
}

/// Returns how many rows were stored.
pub async fn entries_bulk_import(
    state: &AppState,
    actor: Actor,
    stat_id: String,
    period_type: PeriodType,
    rows: Vec<ImportRow>,
) -> CommandResult<usize> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.authorize_for_stat(&actor, &stat_id)?;
        let summary = app_state.entries().bulk_import(&stat_id, period_type, &rows)?;
        Ok(summary.imported)
    })
    .await
}

pub async fn entries_import_text(
    state: &AppState,
    actor: Actor,
    stat_id: String,
    period_type: PeriodType,
    text: String,
) -> CommandResult<ImportSummary> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.authorize_for_stat(&actor, &stat_id)?;
        app_state.entries().import_text(&stat_id, period_type, &text)
    })
    .await
}

pub async fn entries_update_value(
    state: &AppState,
    actor: Actor,
    entry_id: String,
    value: f64,
) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || {
        let entries = app_state.entries();
        let entry = entries.find_entry(&entry_id)?;
        app_state.authorize_for_stat(&actor, &entry.stat_id)?;
        entries.update_entry_value(&entry_id, value)
    })
    .await
}

pub async fn entries_delete(state: &AppState, actor: Actor, entry_id: String) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || {
        let entries = app_state.entries();
        let entry = entries.find_entry(&entry_id)?;
        app_state.authorize_for_stat(&actor, &entry.stat_id)?;
        entries.delete_entry(&entry_id)
    })
    .await
}
