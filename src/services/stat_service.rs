use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::stat_definition_repository::StatDefinitionRepository;
use crate::db::repositories::stat_entry_repository::StatEntryRepository;
use crate::db::repositories::stat_quota_repository::StatQuotaRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::entry::PeriodType;
use crate::models::stat::{
    StatCreateInput, StatDefinition, StatSummary, StatUpdateInput, MAX_COMPOSITE_LINES,
    MIN_COMPOSITE_LINES,
};
use crate::services::entry_service::EntryService;
use crate::services::settings_service::SettingsService;
use crate::services::slot_scheme::slot_count;
use crate::services::trend_analyzer;
use crate::services::week_boundary::current_week;

/// Weekly entries considered when computing a listing's down streak.
const TREND_LOOKBACK: usize = 12;

pub struct StatService {
    db: DbPool,
    entries: Arc<EntryService>,
    settings: Arc<SettingsService>,
}

impl StatService {
    pub fn new(db: DbPool, entries: Arc<EntryService>, settings: Arc<SettingsService>) -> Self {
        Self {
            db,
            entries,
            settings,
        }
    }

    pub fn create_definition(&self, input: StatCreateInput) -> AppResult<StatDefinition> {
        let name = normalize_name(&input.name)?;
        if input.user_id.trim().is_empty() {
            return Err(AppError::validation("stat owner is required"));
        }
        let now = Utc::now().to_rfc3339();
        let definition = StatDefinition {
            id: Uuid::new_v4().to_string(),
            name,
            user_id: input.user_id.trim().to_string(),
            created_by: input.created_by.trim().to_string(),
            division: normalize_tag(input.division),
            department: normalize_tag(input.department),
            is_money: input.is_money,
            is_percentage: input.is_percentage,
            is_inverted: input.is_inverted,
            linked_stat_ids: input.linked_stat_ids,
            category: input.category.unwrap_or_default(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.with_connection(|conn| {
            validate_links(conn, &definition)?;
            StatDefinitionRepository::insert(conn, &definition)
        })?;

        info!(
            target: "app::stats",
            stat_id = %definition.id,
            owner = %definition.user_id,
            composite = definition.is_composite(),
            "stat definition created"
        );
        Ok(definition)
    }

    pub fn update_definition(
        &self,
        id: &str,
        input: StatUpdateInput,
    ) -> AppResult<StatDefinition> {
        let definition = self.db.with_connection(|conn| {
            let mut definition =
                StatDefinitionRepository::find_by_id(conn, id)?.ok_or_else(AppError::not_found)?;

            if let Some(name) = input.name.as_deref() {
                definition.name = normalize_name(name)?;
            }
            if let Some(user_id) = input.user_id.as_deref() {
                let user_id = user_id.trim();
                if user_id.is_empty() {
                    return Err(AppError::validation("stat owner is required"));
                }
                definition.user_id = user_id.to_string();
            }
            if let Some(division) = input.division.clone() {
                definition.division = normalize_tag(division);
            }
            if let Some(department) = input.department.clone() {
                definition.department = normalize_tag(department);
            }
            if let Some(flag) = input.is_money {
                definition.is_money = flag;
            }
            if let Some(flag) = input.is_percentage {
                definition.is_percentage = flag;
            }
            if let Some(flag) = input.is_inverted {
                definition.is_inverted = flag;
            }
            if let Some(category) = input.category {
                if category != definition.category {
                    ensure_quotas_fit(conn, id, slot_count(category))?;
                }
                definition.category = category;
            }
            if let Some(linked) = input.linked_stat_ids.clone() {
                let was_composite = definition.is_composite();
                definition.linked_stat_ids = linked;
                if !was_composite && definition.is_composite() {
                    ensure_not_linked(conn, id)?;
                    ensure_no_own_data(conn, id)?;
                }
            }

            validate_links(conn, &definition)?;
            definition.updated_at = Utc::now().to_rfc3339();
            StatDefinitionRepository::update(conn, &definition)?;
            Ok(definition)
        })?;

        info!(target: "app::stats", stat_id = %definition.id, "stat definition updated");
        Ok(definition)
    }

    /// Entries and quotas are removed with the definition. A stat still
    /// grouped by a composite cannot be deleted.
    pub fn delete_definition(&self, id: &str) -> AppResult<()> {
        self.db.with_connection(|conn| {
            ensure_not_linked(conn, id)?;
            StatDefinitionRepository::delete(conn, id)
        })?;
        info!(target: "app::stats", stat_id = id, "stat definition deleted");
        Ok(())
    }

    pub fn get_definition(&self, id: &str) -> AppResult<StatDefinition> {
        self.db
            .with_connection(|conn| StatDefinitionRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)
    }

    pub fn owner_of(&self, stat_id: &str) -> AppResult<String> {
        Ok(self.get_definition(stat_id)?.user_id)
    }

    pub fn list_definitions(
        &self,
        for_user: &str,
        is_admin: bool,
        include_all: bool,
    ) -> AppResult<Vec<StatSummary>> {
        self.list_definitions_at(Utc::now(), for_user, is_admin, include_all)
    }

    /// Definitions owned by `for_user`, or every definition when an admin
    /// asks for all of them, each with trend and down streak computed from
    /// weekly entries up to the week that contains `now`.
    pub fn list_definitions_at(
        &self,
        now: DateTime<Utc>,
        for_user: &str,
        is_admin: bool,
        include_all: bool,
    ) -> AppResult<Vec<StatSummary>> {
        let definitions = self.db.with_connection(|conn| {
            if include_all && is_admin {
                StatDefinitionRepository::list_all(conn)
            } else {
                StatDefinitionRepository::list_by_user(conn, for_user)
            }
        })?;

        let week = self.settings.week_settings()?;
        let reference = current_week(now, &week).week_ending_date;

        let mut summaries = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if definition.is_composite() {
                summaries.push(StatSummary {
                    definition,
                    trend: None,
                    down_streak: None,
                });
                continue;
            }

            let recent = self.entries.last_n_before(
                &definition.id,
                reference,
                PeriodType::Weekly,
                TREND_LOOKBACK,
                true,
            )?;
            let values: Vec<f64> = recent.iter().map(|entry| entry.value).collect();
            let trend = trend_analyzer::trend(&values, definition.is_inverted);
            let down_streak = trend_analyzer::down_streak(&values, definition.is_inverted);

            summaries.push(StatSummary {
                definition,
                trend,
                down_streak: Some(down_streak),
            });
        }

        debug!(
            target: "app::stats",
            for_user,
            include_all = include_all && is_admin,
            count = summaries.len(),
            %reference,
            "stat definitions listed"
        );
        Ok(summaries)
    }
}

fn normalize_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("stat name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn normalize_tag(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// A composite links 2 or 3 distinct, existing, non-composite stats.
fn validate_links(conn: &Connection, definition: &StatDefinition) -> AppResult<()> {
    let links = &definition.linked_stat_ids;
    if links.is_empty() {
        return Ok(());
    }

    if links.len() < MIN_COMPOSITE_LINES || links.len() > MAX_COMPOSITE_LINES {
        return Err(AppError::validation_with_details(
            "a composite stat links two or three stats",
            serde_json::json!({ "linked": links.len() }),
        ));
    }

    let mut seen = HashSet::new();
    for linked_id in links {
        if linked_id == &definition.id {
            return Err(AppError::validation("a composite stat cannot link itself"));
        }
        if !seen.insert(linked_id.as_str()) {
            return Err(AppError::validation_with_details(
                "a composite stat cannot link the same stat twice",
                serde_json::json!({ "statId": linked_id }),
            ));
        }

        let linked = StatDefinitionRepository::find_by_id(conn, linked_id)?.ok_or_else(|| {
            AppError::validation_with_details(
                "linked stat does not exist",
                serde_json::json!({ "statId": linked_id }),
            )
        })?;
        if linked.is_composite() {
            return Err(AppError::validation_with_details(
                "composite stats cannot be nested",
                serde_json::json!({ "statId": linked_id }),
            ));
        }
    }

    Ok(())
}

fn ensure_not_linked(conn: &Connection, stat_id: &str) -> AppResult<()> {
    let composites = StatDefinitionRepository::list_composites_linking(conn, stat_id)?;
    if composites.is_empty() {
        return Ok(());
    }
    let ids: Vec<&str> = composites.iter().map(|stat| stat.id.as_str()).collect();
    Err(AppError::conflict(format!(
        "stat {stat_id} is grouped by composite(s) {}",
        ids.join(", ")
    )))
}

/// Composites hold no entries or quotas of their own.
fn ensure_no_own_data(conn: &Connection, stat_id: &str) -> AppResult<()> {
    let entries = StatEntryRepository::count_for_stat(conn, stat_id)?;
    let quotas = StatQuotaRepository::list_for_stat(conn, stat_id)?.len();
    if entries == 0 && quotas == 0 {
        return Ok(());
    }
    Err(AppError::conflict(format!(
        "stat {stat_id} has {entries} entries and {quotas} quotas and cannot become a composite"
    )))
}

fn ensure_quotas_fit(conn: &Connection, stat_id: &str, expected: usize) -> AppResult<()> {
    let quotas = StatQuotaRepository::list_for_stat(conn, stat_id)?;
    let Some(mismatch) = quotas.iter().find(|quota| quota.quotas.len() != expected) else {
        return Ok(());
    };
    Err(AppError::validation_with_details(
        "stored quotas do not match the new category's slot scheme",
        serde_json::json!({
            "expected": expected,
            "stored": mismatch.quotas.len(),
            "weekEnding": mismatch.week_ending.to_string(),
        }),
    ))
}
