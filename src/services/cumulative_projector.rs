//! Running totals for the weekly cumulative report.

use std::collections::HashMap;

use crate::models::date_key::DateKey;
use crate::models::report::{CumulativePoint, Slot};

#[derive(Debug, Clone, Copy)]
pub struct PreviousWeek<'a> {
    pub keys: &'a [DateKey],
    pub values: &'a HashMap<DateKey, f64>,
}

/// Walks the slots in order, accumulating recorded values, quota and
/// (optionally) last week's values. Unset slots contribute nothing and keep
/// `daily: None`. The quota line is `None` throughout unless at least one
/// quota value is non-zero.
pub fn project(
    slots: &[Slot],
    keys: &[DateKey],
    values: &HashMap<DateKey, f64>,
    quotas: &[f64],
    previous: Option<PreviousWeek<'_>>,
) -> Vec<CumulativePoint> {
    let show_quota = quotas.iter().any(|quota| *quota != 0.0);

    let mut cumulative = 0.0;
    let mut cumulative_quota = 0.0;
    let mut prev_cumulative = 0.0;

    slots
        .iter()
        .zip(keys.iter())
        .enumerate()
        .map(|(index, (slot, key))| {
            let daily = values.get(key).copied();
            if let Some(value) = daily {
                cumulative += value;
            }

            cumulative_quota += quotas.get(index).copied().unwrap_or(0.0);

            let prev = previous.map(|week| {
                if let Some(value) = week.keys.get(index).and_then(|key| week.values.get(key)) {
                    prev_cumulative += *value;
                }
                prev_cumulative
            });

            CumulativePoint {
                date_key: *key,
                label: slot.label.clone(),
                cumulative,
                quota: show_quota.then_some(cumulative_quota),
                daily,
                prev_cumulative: prev,
            }
        })
        .collect()
}
