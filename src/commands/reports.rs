use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::models::entry::PeriodType;
use crate::models::report::{CompositeChart, OverlayChart, WeeklyCumulativeReport};
use crate::models::week::WeekWindow;

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRequest {
    pub primary_stat_id: String,
    pub secondary_stat_id: String,
    pub period_type: PeriodType,
    #[serde(default)]
    pub offset: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub async fn reports_current_week(state: &AppState) -> CommandResult<WeekWindow> {
    let app_state = state.clone();
    run_blocking(move || app_state.reports().current_week(Utc::now())).await
}

pub async fn reports_weekly_cumulative(
    state: &AppState,
    stat_id: String,
    week_ending: NaiveDate,
    show_previous_week: bool,
) -> CommandResult<WeeklyCumulativeReport> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .reports()
            .weekly_cumulative_report(&stat_id, week_ending, show_previous_week)
    })
    .await
}

pub async fn reports_composite(
    state: &AppState,
    stat_id: String,
    period_type: PeriodType,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> CommandResult<CompositeChart> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .reports()
            .composite_chart(&stat_id, period_type, start, end)
    })
    .await
}

pub async fn reports_overlay(
    state: &AppState,
    request: OverlayRequest,
) -> CommandResult<OverlayChart> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.reports().overlay_chart(
            &request.primary_stat_id,
            &request.secondary_stat_id,
            request.period_type,
            request.offset,
            request.start,
            request.end,
        )
    })
    .await
}
