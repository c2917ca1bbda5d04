//! Sub-week reporting columns for the weekly cumulative report.

use chrono::{Duration, NaiveDate};

use crate::models::date_key::{is_split_boundary_day, DateKey};
use crate::models::report::Slot;
use crate::models::stat::OrgCategory;
use crate::models::week::{weekday_index, weekday_short_name, WeekSettings, DAYS_PER_WEEK};
use crate::services::week_boundary::days_between;

pub const FOUNDATION_SLOT_COUNT: usize = 8;
pub const DAY_SLOT_COUNT: usize = 6;

/// Saturday and Sunday.
pub const DEFAULT_DAY_OMITTED_WEEKDAYS: [u8; 2] = [6, 0];

/// Ordered slots for one week: the boundary day's second half, the six days
/// after it, then the boundary day's first half. The "Day" schedule drops
/// the two `day_omitted_weekdays` from the interior.
pub fn generate_slots(
    category: OrgCategory,
    settings: &WeekSettings,
    day_omitted_weekdays: [u8; 2],
) -> Vec<Slot> {
    let boundary = settings.boundary_day();
    let boundary_name = weekday_short_name(boundary);

    let mut slots = Vec::with_capacity(FOUNDATION_SLOT_COUNT);
    slots.push(Slot {
        weekday: boundary,
        label: format!("{boundary_name} from {:02}:00", settings.week_start_hour),
        is_second_half: true,
        is_first_half: false,
    });

    for step in 1..DAYS_PER_WEEK {
        let weekday = (boundary + step) % DAYS_PER_WEEK;
        if category == OrgCategory::Day && day_omitted_weekdays.contains(&weekday) {
            continue;
        }
        slots.push(Slot {
            weekday,
            label: weekday_short_name(weekday).to_string(),
            is_second_half: false,
            is_first_half: false,
        });
    }

    slots.push(Slot {
        weekday: boundary,
        label: format!("{boundary_name} until {:02}:00", settings.week_end_hour),
        is_second_half: false,
        is_first_half: true,
    });

    slots
}

pub fn slot_count(category: OrgCategory) -> usize {
    match category {
        OrgCategory::Day => DAY_SLOT_COUNT,
        OrgCategory::Foundation => FOUNDATION_SLOT_COUNT,
    }
}

pub fn slot_dates(week_ending: NaiveDate, slots: &[Slot], settings: &WeekSettings) -> Vec<DateKey> {
    let week_start = week_ending - Duration::days(DAYS_PER_WEEK as i64);
    let start_weekday = weekday_index(week_start);
    let split = is_split_boundary_day(settings.boundary_day(), settings);

    slots
        .iter()
        .map(|slot| {
            if slot.is_second_half {
                DateKey::new(week_start, split)
            } else if slot.is_first_half {
                DateKey::day(week_ending)
            } else {
                let mut offset = days_between(start_weekday, slot.weekday);
                // Never land on the opening slot's date.
                if offset == 0 {
                    offset = DAYS_PER_WEEK as i64;
                }
                DateKey::day(week_start + Duration::days(offset))
            }
        })
        .collect()
}
