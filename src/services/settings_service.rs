use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::db::repositories::settings_repository::{AppSettingRow, SettingsRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::AppSettings;
use crate::models::week::{WeekSettings, DAYS_PER_WEEK, HOURS_PER_DAY};
use crate::services::slot_scheme::DEFAULT_DAY_OMITTED_WEEKDAYS;

const KEY_WEEK_START_DAY: &str = "week_start_day";
const KEY_WEEK_START_HOUR: &str = "week_start_hour";
const KEY_WEEK_END_DAY: &str = "week_end_day";
const KEY_WEEK_END_HOUR: &str = "week_end_hour";
const KEY_WEEK_TIMEZONE: &str = "week_timezone";
const KEY_DAY_SCHEME_OMITTED: &str = "day_scheme_omitted_weekdays";

/// Partial update. `timezone: Some(None)` clears the configured zone.
#[derive(Debug, Default, Clone)]
pub struct SettingsUpdateInput {
    pub week_start_day: Option<u8>,
    pub week_start_hour: Option<u8>,
    pub week_end_day: Option<u8>,
    pub week_end_hour: Option<u8>,
    pub timezone: Option<Option<String>>,
    pub day_scheme_omitted_weekdays: Option<[u8; 2]>,
}

pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<AppSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<AppSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_settings_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn week_settings(&self) -> AppResult<WeekSettings> {
        Ok(self.get()?.week)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<AppSettings> {
        let mut current = self.get()?;

        if let Some(day) = input.week_start_day {
            current.week.week_start_day = day;
        }
        if let Some(hour) = input.week_start_hour {
            current.week.week_start_hour = hour;
        }
        if let Some(day) = input.week_end_day {
            current.week.week_end_day = day;
        }
        if let Some(hour) = input.week_end_hour {
            current.week.week_end_hour = hour;
        }
        if let Some(timezone) = input.timezone.as_ref() {
            current.week.timezone = timezone
                .as_ref()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
        }
        if let Some(omitted) = input.day_scheme_omitted_weekdays {
            current.day_scheme_omitted_weekdays = omitted;
        }

        validate_settings(&current)?;

        let mut pairs: Vec<(&str, String)> = vec![
            (KEY_WEEK_START_DAY, current.week.week_start_day.to_string()),
            (KEY_WEEK_START_HOUR, current.week.week_start_hour.to_string()),
            (KEY_WEEK_END_DAY, current.week.week_end_day.to_string()),
            (KEY_WEEK_END_HOUR, current.week.week_end_hour.to_string()),
            (
                KEY_DAY_SCHEME_OMITTED,
                format_weekdays(&current.day_scheme_omitted_weekdays),
            ),
        ];
        if let Some(timezone) = current.week.timezone.as_ref() {
            pairs.push((KEY_WEEK_TIMEZONE, timezone.clone()));
        }

        self.db.with_connection(|conn| {
            SettingsRepository::upsert_many(conn, &pairs)?;
            if current.week.timezone.is_none() {
                SettingsRepository::delete(conn, KEY_WEEK_TIMEZONE)?;
            }
            Ok(())
        })?;

        current.updated_at = Utc::now().to_rfc3339();
        info!(
            target: "app::settings",
            start_day = current.week.week_start_day,
            start_hour = current.week.week_start_hour,
            end_day = current.week.week_end_day,
            end_hour = current.week.week_end_hour,
            timezone = ?current.week.timezone,
            "week settings updated"
        );

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }

        Ok(current)
    }

    fn load_settings_from_db(&self) -> AppResult<AppSettings> {
        self.db.with_connection(|conn| {
            let rows = SettingsRepository::list(conn)?;
            let mut map: HashMap<String, AppSettingRow> = HashMap::new();
            let mut latest_updated_at: Option<String> = None;

            for row in rows {
                latest_updated_at = match latest_updated_at {
                    Some(ref current) if current >= &row.updated_at => Some(current.clone()),
                    _ => Some(row.updated_at.clone()),
                };
                map.insert(row.key.clone(), row);
            }

            let defaults = WeekSettings::default();
            let week = WeekSettings {
                week_start_day: read_bounded(&map, KEY_WEEK_START_DAY, DAYS_PER_WEEK)
                    .unwrap_or(defaults.week_start_day),
                week_start_hour: read_bounded(&map, KEY_WEEK_START_HOUR, HOURS_PER_DAY)
                    .unwrap_or(defaults.week_start_hour),
                week_end_day: read_bounded(&map, KEY_WEEK_END_DAY, DAYS_PER_WEEK)
                    .unwrap_or(defaults.week_end_day),
                week_end_hour: read_bounded(&map, KEY_WEEK_END_HOUR, HOURS_PER_DAY)
                    .unwrap_or(defaults.week_end_hour),
                timezone: map
                    .get(KEY_WEEK_TIMEZONE)
                    .map(|row| row.value.trim().to_string())
                    .filter(|value| !value.is_empty()),
            };

            let day_scheme_omitted_weekdays = map
                .get(KEY_DAY_SCHEME_OMITTED)
                .and_then(|row| {
                    let parsed = parse_weekdays(&row.value);
                    if parsed.is_none() {
                        warn!(
                            target: "app::settings",
                            value = %row.value,
                            "ignoring malformed omitted weekdays"
                        );
                    }
                    parsed
                })
                .unwrap_or(DEFAULT_DAY_OMITTED_WEEKDAYS);

            Ok(AppSettings {
                week,
                day_scheme_omitted_weekdays,
                updated_at: latest_updated_at.unwrap_or_else(|| Utc::now().to_rfc3339()),
            })
        })
    }
}

fn read_bounded(map: &HashMap<String, AppSettingRow>, key: &str, upper: u8) -> Option<u8> {
    let row = map.get(key)?;
    match row.value.trim().parse::<u8>() {
        Ok(value) if value < upper => Some(value),
        _ => {
            warn!(target: "app::settings", key, value = %row.value, "ignoring out of range setting");
            None
        }
    }
}

fn format_weekdays(days: &[u8; 2]) -> String {
    format!("{},{}", days[0], days[1])
}

fn parse_weekdays(raw: &str) -> Option<[u8; 2]> {
    let mut parts = raw.split(',').map(|part| part.trim().parse::<u8>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(first)), Some(Ok(second)), None)
            if first < DAYS_PER_WEEK && second < DAYS_PER_WEEK =>
        {
            Some([first, second])
        }
        _ => None,
    }
}

pub fn validate_settings(settings: &AppSettings) -> AppResult<()> {
    let week = &settings.week;
    for (field, value) in [
        ("weekStartDay", week.week_start_day),
        ("weekEndDay", week.week_end_day),
    ] {
        if value >= DAYS_PER_WEEK {
            return Err(AppError::validation_with_details(
                "weekday must be between 0 (Sunday) and 6 (Saturday)",
                serde_json::json!({ "field": field, "value": value }),
            ));
        }
    }
    for (field, value) in [
        ("weekStartHour", week.week_start_hour),
        ("weekEndHour", week.week_end_hour),
    ] {
        if value >= HOURS_PER_DAY {
            return Err(AppError::validation_with_details(
                "hour must be between 0 and 23",
                serde_json::json!({ "field": field, "value": value }),
            ));
        }
    }

    if let Some(timezone) = week.timezone.as_deref() {
        if timezone.parse::<Tz>().is_err() {
            return Err(AppError::validation_with_details(
                "unknown timezone",
                serde_json::json!({ "field": "timezone", "value": timezone }),
            ));
        }
    }

    let [first, second] = settings.day_scheme_omitted_weekdays;
    if first >= DAYS_PER_WEEK || second >= DAYS_PER_WEEK {
        return Err(AppError::validation(
            "omitted weekdays must be between 0 (Sunday) and 6 (Saturday)",
        ));
    }
    if first == second {
        return Err(AppError::validation("omitted weekdays must be two different days"));
    }
    let boundary = week.boundary_day();
    if first == boundary || second == boundary {
        return Err(AppError::validation_with_details(
            "the boundary day cannot be omitted from the Day scheme",
            serde_json::json!({ "boundaryDay": boundary }),
        ));
    }

    Ok(())
}
