use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatQuota {
    pub id: String,
    pub stat_id: String,
    /// Always the base week-ending date, never a split half.
    pub week_ending: NaiveDate,
    pub quotas: Vec<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl StatQuota {
    pub fn has_nonzero(&self) -> bool {
        self.quotas.iter().any(|value| *value != 0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaUpsert {
    pub stat_id: String,
    pub week_ending: NaiveDate,
    pub quotas: Vec<f64>,
}

/// Result of a quota lookup; `exact_match` is false when an earlier week's
/// quota was used as the fallback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaLookup {
    pub quota: StatQuota,
    pub exact_match: bool,
}
