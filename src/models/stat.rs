use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_COMPOSITE_LINES: usize = 2;
pub const MAX_COMPOSITE_LINES: usize = 3;

/// Organisational operating schedule that selects the weekly slot scheme.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrgCategory {
    Day,
    #[default]
    Foundation,
}

impl OrgCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgCategory::Day => "day",
            OrgCategory::Foundation => "foundation",
        }
    }
}

impl fmt::Display for OrgCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OrgCategory {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "day" => Ok(OrgCategory::Day),
            "foundation" => Ok(OrgCategory::Foundation),
            other => Err(format!("unsupported organisational category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatDefinition {
    pub id: String,
    pub name: String,
    pub user_id: String,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub is_money: bool,
    pub is_percentage: bool,
    pub is_inverted: bool,
    #[serde(default)]
    pub linked_stat_ids: Vec<String>,
    #[serde(default)]
    pub category: OrgCategory,
    pub created_at: String,
    pub updated_at: String,
}

impl StatDefinition {
    /// A composite owns no entries; it only groups other stats.
    pub fn is_composite(&self) -> bool {
        !self.linked_stat_ids.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatCreateInput {
    pub name: String,
    pub user_id: String,
    pub created_by: String,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub is_money: bool,
    #[serde(default)]
    pub is_percentage: bool,
    #[serde(default)]
    pub is_inverted: bool,
    #[serde(default)]
    pub linked_stat_ids: Vec<String>,
    #[serde(default)]
    pub category: Option<OrgCategory>,
}

/// Partial update. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatUpdateInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub division: Option<Option<String>>,
    #[serde(default)]
    pub department: Option<Option<String>>,
    #[serde(default)]
    pub is_money: Option<bool>,
    #[serde(default)]
    pub is_percentage: Option<bool>,
    #[serde(default)]
    pub is_inverted: Option<bool>,
    #[serde(default)]
    pub linked_stat_ids: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<OrgCategory>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition decorated with its computed trend. Composites carry neither field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatSummary {
    #[serde(flatten)]
    pub definition: StatDefinition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down_streak: Option<u32>,
}
