use std::convert::TryFrom;

use chrono::{NaiveDate, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::quota::{QuotaUpsert, StatQuota};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str = r#"
    SELECT id, stat_id, week_ending, quota_values, created_at, updated_at
    FROM stat_quotas
"#;

#[derive(Debug, Clone)]
pub struct StatQuotaRow {
    pub id: String,
    pub stat_id: String,
    pub week_ending: String,
    pub quota_values: String,
    pub created_at: String,
    pub updated_at: String,
}

impl StatQuotaRow {
    pub fn into_quota(self) -> AppResult<StatQuota> {
        let week_ending =
            NaiveDate::parse_from_str(&self.week_ending, DATE_FORMAT).map_err(|err| {
                AppError::database(format!(
                    "stored quota {} has malformed week ending {}: {err}",
                    self.id, self.week_ending
                ))
            })?;

        Ok(StatQuota {
            id: self.id,
            stat_id: self.stat_id,
            week_ending,
            quotas: serde_json::from_str(&self.quota_values)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for StatQuotaRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            stat_id: row.get("stat_id")?,
            week_ending: row.get("week_ending")?,
            quota_values: row.get("quota_values")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct StatQuotaRepository;

impl StatQuotaRepository {
    pub fn upsert(conn: &Connection, input: &QuotaUpsert) -> AppResult<StatQuota> {
        let now = Utc::now().to_rfc3339();
        let quota_values = serde_json::to_string(&input.quotas)?;

        conn.execute(
            r#"
                INSERT INTO stat_quotas (
                    id, stat_id, week_ending, quota_values, created_at, updated_at
                ) VALUES (
                    :id, :stat_id, :week_ending, :quota_values, :now, :now
                )
                ON CONFLICT(stat_id, week_ending) DO UPDATE SET
                    quota_values = excluded.quota_values,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":id": uuid::Uuid::new_v4().to_string(),
                ":stat_id": &input.stat_id,
                ":week_ending": input.week_ending.format(DATE_FORMAT).to_string(),
                ":quota_values": &quota_values,
                ":now": &now,
            },
        )?;

        Self::find_exact(conn, &input.stat_id, input.week_ending)?.ok_or_else(AppError::not_found)
    }

    pub fn find_exact(
        conn: &Connection,
        stat_id: &str,
        week_ending: NaiveDate,
    ) -> AppResult<Option<StatQuota>> {
        let sql = format!("{SELECT_COLUMNS} WHERE stat_id = :stat_id AND week_ending = :week_ending");
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row(
                named_params! {
                    ":stat_id": stat_id,
                    ":week_ending": week_ending.format(DATE_FORMAT).to_string(),
                },
                |row| StatQuotaRow::try_from(row),
            )
            .optional()?;

        row.map(StatQuotaRow::into_quota).transpose()
    }

    /// Most recent quota with a week ending at or before `week_ending`.
    pub fn find_at_or_before(
        conn: &Connection,
        stat_id: &str,
        week_ending: NaiveDate,
    ) -> AppResult<Option<StatQuota>> {
        let sql = format!(
            r#"{SELECT_COLUMNS}
                WHERE stat_id = :stat_id AND week_ending <= :week_ending
                ORDER BY week_ending DESC
                LIMIT 1
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row(
                named_params! {
                    ":stat_id": stat_id,
                    ":week_ending": week_ending.format(DATE_FORMAT).to_string(),
                },
                |row| StatQuotaRow::try_from(row),
            )
            .optional()?;

        row.map(StatQuotaRow::into_quota).transpose()
    }

    pub fn list_for_stat(conn: &Connection, stat_id: &str) -> AppResult<Vec<StatQuota>> {
        let sql = format!("{SELECT_COLUMNS} WHERE stat_id = :stat_id ORDER BY week_ending ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(named_params! {":stat_id": stat_id}, |row| {
                StatQuotaRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StatQuotaRow::into_quota).collect()
    }

    pub fn delete(conn: &Connection, stat_id: &str, week_ending: NaiveDate) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM stat_quotas WHERE stat_id = :stat_id AND week_ending = :week_ending",
            named_params! {
                ":stat_id": stat_id,
                ":week_ending": week_ending.format(DATE_FORMAT).to_string(),
            },
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}
