use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::date_key::DateKey;
use crate::models::entry::{PeriodType, StatEntry};
use crate::models::stat::OrgCategory;

/// One reporting column of a weekly cumulative report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub weekday: u8,
    pub label: String,
    pub is_second_half: bool,
    pub is_first_half: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativePoint {
    pub date_key: DateKey,
    pub label: String,
    pub cumulative: f64,
    /// Running quota total; `None` when the week has no non-zero quota.
    pub quota: Option<f64>,
    /// Raw value for the slot; `None` when nothing was recorded.
    pub daily: Option<f64>,
    /// Running total of the prior week; `None` unless requested.
    pub prev_cumulative: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCumulativeReport {
    pub stat_id: String,
    pub category: OrgCategory,
    pub week_ending: NaiveDate,
    pub quota_week_ending: Option<NaiveDate>,
    pub points: Vec<CumulativePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartAxis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeLine {
    pub stat_id: String,
    pub name: String,
    pub axis: ChartAxis,
    pub is_inverted: bool,
    pub is_money: bool,
    pub is_percentage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeRow {
    pub date_key: DateKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line1_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line3_value: Option<f64>,
}

impl CompositeRow {
    pub fn empty(date_key: DateKey) -> Self {
        Self {
            date_key,
            line1_value: None,
            line2_value: None,
            line3_value: None,
        }
    }

    /// Lines past the third are dropped.
    pub fn set_value(&mut self, line: usize, value: f64) {
        match line {
            0 => self.line1_value = Some(value),
            1 => self.line2_value = Some(value),
            2 => self.line3_value = Some(value),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeChart {
    pub stat_id: String,
    pub name: String,
    pub period_type: PeriodType,
    pub lines: Vec<CompositeLine>,
    pub rows: Vec<CompositeRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPoint {
    /// Position on the primary chart after shifting.
    pub date_key: DateKey,
    /// Date the value was actually recorded on, for tooltips.
    pub original_date_key: DateKey,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayChart {
    pub primary_stat_id: String,
    pub secondary_stat_id: String,
    pub period_type: PeriodType,
    pub offset: i32,
    pub primary: Vec<StatEntry>,
    pub secondary: Vec<OverlayPoint>,
}
