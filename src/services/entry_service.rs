use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::repositories::stat_definition_repository::StatDefinitionRepository;
use crate::db::repositories::stat_entry_repository::{EntryRangeFilter, StatEntryRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::date_key::{is_split_boundary_day, DateKey};
use crate::models::entry::{EntryUpsert, ImportRow, ImportSummary, PeriodType, StatEntry};
use crate::models::stat::StatDefinition;
use crate::models::week::{weekday_index, WeekSettings};
use crate::services::import_parser::parse_import_text;
use crate::services::settings_service::SettingsService;

/// Keyed storage of stat entries. Uniqueness of `(stat, date key, period)`
/// lives in the schema; this layer validates input and never locks.
pub struct EntryService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl EntryService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    pub fn upsert_entry(&self, input: EntryUpsert) -> AppResult<StatEntry> {
        let week = self.settings.week_settings()?;
        let normalized = normalize_upsert(input, &week)?;

        let entry = self.db.with_connection(|conn| {
            ensure_entry_target(conn, &normalized.stat_id)?;
            StatEntryRepository::upsert(conn, &normalized)
        })?;

        info!(
            target: "app::entries",
            stat_id = %entry.stat_id,
            date_key = %entry.date_key,
            period = %entry.period_type,
            "entry stored"
        );
        Ok(entry)
    }

    /// Inclusive on base dates; both halves of a split day are returned when
    /// that day is in range.
    pub fn get_entries(
        &self,
        stat_id: &str,
        period_type: Option<PeriodType>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<StatEntry>> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::validation_with_details(
                    "range start must not be after range end",
                    serde_json::json!({ "start": start, "end": end }),
                ));
            }
        }

        self.db.with_connection(|conn| {
            ensure_stat_exists(conn, stat_id)?;
            StatEntryRepository::range(
                conn,
                &EntryRangeFilter {
                    stat_id,
                    period_type,
                    start,
                    end,
                },
            )
        })
    }

    /// Newest first. See [`StatEntryRepository::last_n_before`] for how
    /// `include_populated_current` treats an entry dated `reference`.
    pub fn last_n_before(
        &self,
        stat_id: &str,
        reference: NaiveDate,
        period_type: PeriodType,
        limit: usize,
        include_populated_current: bool,
    ) -> AppResult<Vec<StatEntry>> {
        self.db.with_connection(|conn| {
            StatEntryRepository::last_n_before(
                conn,
                stat_id,
                reference,
                period_type,
                limit,
                include_populated_current,
            )
        })
    }

    /// Applies each row on its own; a failing row is counted and the rest
    /// are still attempted. Only an unknown or composite stat stops the call.
    pub fn bulk_import(
        &self,
        stat_id: &str,
        period_type: PeriodType,
        rows: &[ImportRow],
    ) -> AppResult<ImportSummary> {
        let week = self.settings.week_settings()?;

        let summary = self.db.with_connection(|conn| {
            ensure_entry_target(conn, stat_id)?;

            let mut summary = ImportSummary::default();
            for row in rows {
                let upsert = EntryUpsert {
                    stat_id: stat_id.to_string(),
                    date_key: DateKey::day(row.date),
                    value: row.value,
                    period_type,
                };
                let result = normalize_upsert(upsert, &week)
                    .and_then(|upsert| StatEntryRepository::upsert(conn, &upsert));
                match result {
                    Ok(_) => summary.imported += 1,
                    Err(err) => {
                        warn!(
                            target: "app::import",
                            stat_id,
                            date = %row.date,
                            error = %err,
                            "import row failed"
                        );
                        summary.failed += 1;
                    }
                }
            }
            Ok(summary)
        })?;

        info!(
            target: "app::import",
            stat_id,
            period = %period_type,
            imported = summary.imported,
            failed = summary.failed,
            "bulk import finished"
        );
        Ok(summary)
    }

    pub fn import_text(
        &self,
        stat_id: &str,
        period_type: PeriodType,
        text: &str,
    ) -> AppResult<ImportSummary> {
        let parsed = parse_import_text(text);
        let mut summary = self.bulk_import(stat_id, period_type, &parsed.rows)?;
        summary.skipped = parsed.skipped;
        Ok(summary)
    }

    pub fn find_entry(&self, entry_id: &str) -> AppResult<StatEntry> {
        self.db
            .with_connection(|conn| StatEntryRepository::find_by_id(conn, entry_id))?
            .ok_or_else(AppError::not_found)
    }

    pub fn update_entry_value(&self, entry_id: &str, value: f64) -> AppResult<()> {
        ensure_finite(value)?;
        self.db
            .with_connection(|conn| StatEntryRepository::update_value(conn, entry_id, value))?;
        debug!(target: "app::entries", entry_id, value, "entry value updated");
        Ok(())
    }

    pub fn delete_entry(&self, entry_id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| StatEntryRepository::delete(conn, entry_id))?;
        info!(target: "app::entries", entry_id, "entry deleted");
        Ok(())
    }
}

fn normalize_upsert(mut input: EntryUpsert, week: &WeekSettings) -> AppResult<EntryUpsert> {
    if input.stat_id.trim().is_empty() {
        return Err(AppError::validation("entry is missing its stat id"));
    }
    ensure_finite(input.value)?;

    if input.date_key.is_second_half {
        let allowed = input.period_type == PeriodType::Daily
            && is_split_boundary_day(weekday_index(input.date_key.date), week);
        if !allowed {
            return Err(AppError::validation_with_details(
                "second-half entries are only accepted on the split boundary day",
                serde_json::json!({
                    "dateKey": input.date_key.encode(),
                    "periodType": input.period_type.as_str(),
                }),
            ));
        }
    }

    if input.period_type == PeriodType::Monthly {
        let date = input.date_key.date;
        if let Some(first) = date.with_day(1) {
            input.date_key = DateKey::day(first);
        }
    }

    Ok(input)
}

fn ensure_finite(value: f64) -> AppResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AppError::validation("entry value must be a finite number"))
    }
}

fn ensure_stat_exists(conn: &Connection, stat_id: &str) -> AppResult<StatDefinition> {
    StatDefinitionRepository::find_by_id(conn, stat_id)?.ok_or_else(AppError::not_found)
}

fn ensure_entry_target(conn: &Connection, stat_id: &str) -> AppResult<StatDefinition> {
    let definition = ensure_stat_exists(conn, stat_id)?;
    if definition.is_composite() {
        return Err(AppError::validation_with_details(
            "composite stats hold no entries of their own",
            serde_json::json!({ "statId": stat_id }),
        ));
    }
    Ok(definition)
}
