use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{AppError, AppResult};
use crate::models::week::WeekSettings;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Appended to the base date of a split boundary day's second half. Any
/// suffix keeps `date < date+suffix < date+1` because the shorter key is a
/// prefix of the longer one and the next day differs inside the date digits.
pub const SECOND_HALF_SUFFIX: &str = "_b";

/// Calendar date, optionally tagged as the second accounting half of a split
/// boundary day. Field order gives `(d, false) < (d, true) < (d + 1, false)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey {
    pub date: NaiveDate,
    pub is_second_half: bool,
}

impl DateKey {
    pub fn new(date: NaiveDate, is_second_half: bool) -> Self {
        Self {
            date,
            is_second_half,
        }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, false)
    }

    pub fn second_half(date: NaiveDate) -> Self {
        Self::new(date, true)
    }

    pub fn encode(&self) -> String {
        encode(self.date, self.is_second_half)
    }

    pub fn decode(key: &str) -> AppResult<Self> {
        let (date, is_second_half) = decode(key)?;
        Ok(Self::new(date, is_second_half))
    }

    pub fn shifted_days(&self, days: i64) -> Self {
        Self::new(self.date + Duration::days(days), self.is_second_half)
    }
}

/// True when `weekday` is the one day shared by week start and week end and
/// the boundary hour splits it into two accounting halves.
pub fn is_split_boundary_day(weekday: u8, settings: &WeekSettings) -> bool {
    settings.week_start_day == settings.week_end_day
        && settings.week_start_hour > 0
        && weekday == settings.week_start_day
}

pub fn encode(date: NaiveDate, is_second_half: bool) -> String {
    let base = date.format(DATE_FORMAT).to_string();
    if is_second_half {
        format!("{base}{SECOND_HALF_SUFFIX}")
    } else {
        base
    }
}

pub fn decode(key: &str) -> AppResult<(NaiveDate, bool)> {
    let trimmed = key.trim();
    let (base, is_second_half) = match trimmed.strip_suffix(SECOND_HALF_SUFFIX) {
        Some(base) => (base, true),
        None => (trimmed, false),
    };

    let date = NaiveDate::parse_from_str(base, DATE_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid date key",
            serde_json::json!({ "value": key, "error": err.to_string() }),
        )
    })?;

    Ok((date, is_second_half))
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for DateKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateKey::decode(s)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        DateKey::day(date)
    }
}

impl Serialize for DateKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}

struct DateKeyVisitor;

impl<'de> Visitor<'de> for DateKeyVisitor {
    type Value = DateKey;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a YYYY-MM-DD date key, optionally with a second-half suffix")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let (date, is_second_half) = decode_silently(value)
            .ok_or_else(|| E::custom(format!("invalid date key: {value}")))?;
        Ok(DateKey::new(date, is_second_half))
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(DateKeyVisitor)
    }
}

// Deserialization reports through serde, not through the validation log.
fn decode_silently(key: &str) -> Option<(NaiveDate, bool)> {
    let trimmed = key.trim();
    let (base, is_second_half) = match trimmed.strip_suffix(SECOND_HALF_SUFFIX) {
        Some(base) => (base, true),
        None => (trimmed, false),
    };
    NaiveDate::parse_from_str(base, DATE_FORMAT)
        .ok()
        .map(|date| (date, is_second_half))
}
