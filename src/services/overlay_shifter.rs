use chrono::{Duration, Months, NaiveDate};

use crate::models::date_key::DateKey;
use crate::models::entry::{PeriodType, StatEntry};
use crate::models::report::OverlayPoint;

/// Monthly shifts are exact inverses only on month-start dates. Results
/// outside chrono's range leave the date unchanged.
pub fn shift(date: NaiveDate, offset: i32, period_type: PeriodType) -> NaiveDate {
    let shifted = match period_type {
        PeriodType::Daily => date.checked_add_signed(Duration::days(offset as i64)),
        PeriodType::Weekly => date.checked_add_signed(Duration::weeks(offset as i64)),
        PeriodType::Monthly => {
            let months = Months::new(offset.unsigned_abs());
            if offset >= 0 {
                date.checked_add_months(months)
            } else {
                date.checked_sub_months(months)
            }
        }
    };
    shifted.unwrap_or(date)
}

/// Places a secondary series on the primary chart. Each entry moves by
/// `-offset` periods; entries landing outside `[start, end]` are dropped.
pub fn overlay(
    entries: &[StatEntry],
    offset: i32,
    period_type: PeriodType,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<OverlayPoint> {
    let mut points: Vec<OverlayPoint> = entries
        .iter()
        .filter_map(|entry| {
            let original = entry.date_key;
            let visible = DateKey::new(
                shift(original.date, -offset, period_type),
                original.is_second_half,
            );
            (visible.date >= start && visible.date <= end).then_some(OverlayPoint {
                date_key: visible,
                original_date_key: original,
                value: entry.value,
            })
        })
        .collect();
    points.sort_by(|a, b| a.date_key.cmp(&b.date_key));
    points
}

pub fn original_date(visible: NaiveDate, offset: i32, period_type: PeriodType) -> NaiveDate {
    shift(visible, offset, period_type)
}
