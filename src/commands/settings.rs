use serde::Deserialize;

use crate::error::AppError;
use crate::models::settings::AppSettings;
use crate::services::settings_service::SettingsUpdateInput;

use super::{run_blocking, Actor, AppState, CommandResult};

pub async fn settings_get(state: &AppState) -> CommandResult<AppSettings> {
    let app_state = state.clone();
    run_blocking(move || app_state.settings().get()).await
}

/// Week settings are organisation-wide, so only admins may change them.
pub async fn settings_update(
    state: &AppState,
    actor: Actor,
    payload: SettingsUpdatePayload,
) -> CommandResult<AppSettings> {
    let app_state = state.clone();
    let input = payload.into_input();
    run_blocking(move || {
        if !actor.is_admin {
            return Err(AppError::unauthorized(format!(
                "user {} may not change week settings",
                actor.user_id
            )));
        }
        app_state.settings().update(input)
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdatePayload {
    #[serde(default)]
    pub week_start_day: Option<u8>,
    #[serde(default)]
    pub week_start_hour: Option<u8>,
    #[serde(default)]
    pub week_end_day: Option<u8>,
    #[serde(default)]
    pub week_end_hour: Option<u8>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub clear_timezone: Option<bool>,
    #[serde(default)]
    pub day_scheme_omitted_weekdays: Option<[u8; 2]>,
}

impl SettingsUpdatePayload {
    fn into_input(self) -> SettingsUpdateInput {
        let timezone = if self.clear_timezone == Some(true) {
            Some(None)
        } else {
            self.timezone.map(Some)
        };

        SettingsUpdateInput {
            week_start_day: self.week_start_day,
            week_start_hour: self.week_start_hour,
            week_end_day: self.week_end_day,
            week_end_hour: self.week_end_hour,
            timezone,
            day_scheme_omitted_weekdays: self.day_scheme_omitted_weekdays,
        }
    }
}
