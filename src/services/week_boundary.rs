//! Date arithmetic over an organisation-defined week.
//!
//! Every comparison is modular over 7 days and 24 hours. A configured
//! timezone is resolved once per call into a fixed offset; there is no
//! daylight-saving correction inside a single computation.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;
use tracing::warn;

use crate::models::week::{weekday_index, WeekSettings, WeekWindow, DAYS_PER_WEEK, HOURS_PER_DAY};

pub fn resolve_offset(now: DateTime<Utc>, settings: &WeekSettings) -> FixedOffset {
    let name = settings
        .timezone
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match name {
        None => Utc.fix(),
        Some(name) => match name.parse::<Tz>() {
            Ok(tz) => tz.offset_from_utc_datetime(&now.naive_utc()).fix(),
            Err(_) => {
                warn!(target: "app::week", timezone = %name, "unknown timezone, using UTC");
                Utc.fix()
            }
        },
    }
}

/// Most recent `(week_start_day, week_start_hour)` at or before `now`.
pub fn current_week_start(now: DateTime<Utc>, settings: &WeekSettings) -> DateTime<FixedOffset> {
    let offset = resolve_offset(now, settings);
    let local_now = now.with_timezone(&offset).naive_local();
    let today = local_now.date();

    let days_back = days_between(settings.week_start_day, weekday_index(today));
    let mut start =
        (today - Duration::days(days_back)).and_time(boundary_time(settings.week_start_hour));
    if start > local_now {
        start -= Duration::days(DAYS_PER_WEEK as i64);
    }

    localize(start, offset)
}

pub fn current_week_end(now: DateTime<Utc>, settings: &WeekSettings) -> DateTime<FixedOffset> {
    let start = current_week_start(now, settings);
    week_end_from_start(start, settings)
}

pub fn current_week(now: DateTime<Utc>, settings: &WeekSettings) -> WeekWindow {
    let start = current_week_start(now, settings);
    let end = week_end_from_start(start, settings);
    WeekWindow {
        start,
        end,
        week_ending_date: end.date_naive(),
    }
}

/// Smallest date at or after `date` that falls on `week_end_day`. When `date`
/// is already that weekday and its hour has reached `boundary_hour`, the
/// current week is over and the following week's date is returned.
pub fn week_ending_on_or_after(
    date: NaiveDateTime,
    week_end_day: u8,
    boundary_hour: Option<u8>,
) -> NaiveDate {
    let day = date.date();
    let mut days_ahead = days_between(weekday_index(day), week_end_day);
    if days_ahead == 0 {
        if let Some(hour) = boundary_hour {
            if date.hour() >= hour as u32 {
                days_ahead = DAYS_PER_WEEK as i64;
            }
        }
    }
    day + Duration::days(days_ahead)
}

pub fn week_ending_on_or_before(date: NaiveDate, week_end_day: u8) -> NaiveDate {
    date - Duration::days(days_between(week_end_day, weekday_index(date)))
}

fn week_end_from_start(
    start: DateTime<FixedOffset>,
    settings: &WeekSettings,
) -> DateTime<FixedOffset> {
    if settings.is_symmetric() {
        return start + Duration::days(DAYS_PER_WEEK as i64);
    }

    let local_start = start.naive_local();
    let days_ahead = days_between(settings.week_start_day, settings.week_end_day);
    let mut end = (local_start.date() + Duration::days(days_ahead))
        .and_time(boundary_time(settings.week_end_hour));
    if end <= local_start {
        end += Duration::days(DAYS_PER_WEEK as i64);
    }

    localize(end, *start.offset())
}

pub(crate) fn days_between(from: u8, to: u8) -> i64 {
    let week = DAYS_PER_WEEK as i64;
    ((to as i64 - from as i64) % week + week) % week
}

fn boundary_time(hour: u8) -> NaiveTime {
    NaiveTime::from_hms_opt((hour % HOURS_PER_DAY) as u32, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn localize(local: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = local - Duration::seconds(offset.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, offset)
}
