use serde::Serialize;

use crate::models::week::WeekSettings;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub week: WeekSettings,
    /// The two weekdays the "Day" operating schedule does not report on.
    pub day_scheme_omitted_weekdays: [u8; 2],
    pub updated_at: String,
}
