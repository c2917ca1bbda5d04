use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DAYS_PER_WEEK: u8 = 7;
pub const HOURS_PER_DAY: u8 = 24;

const WEEKDAY_SHORT_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Organisation-defined accounting week.
///
/// Days are numbered 0..=6 starting from Sunday, hours 0..=23. A week is the
/// half-open interval `[start, end)` recurring every seven days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSettings {
    pub week_start_day: u8,
    pub week_start_hour: u8,
    pub week_end_day: u8,
    pub week_end_hour: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl WeekSettings {
    pub fn new(start_day: u8, start_hour: u8, end_day: u8, end_hour: u8) -> Self {
        Self {
            week_start_day: start_day,
            week_start_hour: start_hour,
            week_end_day: end_day,
            week_end_hour: end_hour,
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Start and end fall on the same day and hour, so the week is exactly 7x24h.
    pub fn is_symmetric(&self) -> bool {
        self.week_start_day == self.week_end_day && self.week_start_hour == self.week_end_hour
    }

    /// The weekday the reporting week closes on.
    pub fn boundary_day(&self) -> u8 {
        self.week_end_day
    }
}

impl Default for WeekSettings {
    fn default() -> Self {
        // Thursday 14:00 to Thursday 14:00.
        Self::new(4, 14, 4, 14)
    }
}

/// Concrete instants of one accounting week, plus the date the week is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub week_ending_date: NaiveDate,
}

pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn weekday_short_name(weekday: u8) -> &'static str {
    WEEKDAY_SHORT_NAMES[(weekday % DAYS_PER_WEEK) as usize]
}
