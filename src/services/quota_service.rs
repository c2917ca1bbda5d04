use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::db::repositories::stat_definition_repository::StatDefinitionRepository;
use crate::db::repositories::stat_quota_repository::StatQuotaRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::quota::{QuotaLookup, QuotaUpsert, StatQuota};
use crate::models::week::{weekday_index, weekday_short_name};
use crate::services::settings_service::SettingsService;
use crate::services::slot_scheme::slot_count;

pub struct QuotaService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl QuotaService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    /// Exact week first, otherwise the latest quota filed before it.
    pub fn get_quota(
        &self,
        stat_id: &str,
        week_ending: NaiveDate,
    ) -> AppResult<Option<QuotaLookup>> {
        let lookup = self.db.with_connection(|conn| {
            if let Some(quota) = StatQuotaRepository::find_exact(conn, stat_id, week_ending)? {
                return Ok(Some(QuotaLookup {
                    quota,
                    exact_match: true,
                }));
            }
            let fallback = StatQuotaRepository::find_at_or_before(conn, stat_id, week_ending)?;
            Ok(fallback.map(|quota| QuotaLookup {
                quota,
                exact_match: false,
            }))
        })?;

        debug!(
            target: "app::quotas",
            stat_id,
            %week_ending,
            found = lookup.is_some(),
            exact = lookup.as_ref().map(|found| found.exact_match).unwrap_or(false),
            "quota lookup"
        );
        Ok(lookup)
    }

    pub fn upsert_quota(&self, input: QuotaUpsert) -> AppResult<StatQuota> {
        let week = self.settings.week_settings()?;
        let boundary = week.boundary_day();
        if weekday_index(input.week_ending) != boundary {
            return Err(AppError::validation_with_details(
                "quota week ending must fall on the week's closing day",
                serde_json::json!({
                    "weekEnding": input.week_ending,
                    "expectedWeekday": weekday_short_name(boundary),
                }),
            ));
        }
        if input.quotas.iter().any(|value| !value.is_finite()) {
            return Err(AppError::validation("quota values must be finite numbers"));
        }

        let quota = self.db.with_connection(|conn| {
            let definition = StatDefinitionRepository::find_by_id(conn, &input.stat_id)?
                .ok_or_else(AppError::not_found)?;
            if definition.is_composite() {
                return Err(AppError::validation("composite stats do not carry quotas"));
            }

            let expected = slot_count(definition.category);
            if input.quotas.len() != expected {
                return Err(AppError::validation_with_details(
                    "quota values must match the slot scheme length",
                    serde_json::json!({
                        "category": definition.category.as_str(),
                        "expected": expected,
                        "actual": input.quotas.len(),
                    }),
                ));
            }

            StatQuotaRepository::upsert(conn, &input)
        })?;

        info!(
            target: "app::quotas",
            stat_id = %quota.stat_id,
            week_ending = %quota.week_ending,
            "quota stored"
        );
        Ok(quota)
    }

    pub fn delete_quota(&self, stat_id: &str, week_ending: NaiveDate) -> AppResult<()> {
        self.db
            .with_connection(|conn| StatQuotaRepository::delete(conn, stat_id, week_ending))?;
        info!(target: "app::quotas", stat_id, %week_ending, "quota deleted");
        Ok(())
    }
}
