use std::convert::TryFrom;

use chrono::{NaiveDate, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::date_key::DateKey;
use crate::models::entry::{EntryUpsert, PeriodType, StatEntry};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str = r#"
    SELECT
        id,
        stat_id,
        entry_date,
        is_second_half,
        period_type,
        value,
        created_at,
        updated_at
    FROM stat_entries
"#;

#[derive(Debug, Clone)]
pub struct StatEntryRow {
    pub id: String,
    pub stat_id: String,
    pub entry_date: String,
    pub is_second_half: bool,
    pub period_type: String,
    pub value: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl StatEntryRow {
    pub fn into_entry(self) -> AppResult<StatEntry> {
        let date = NaiveDate::parse_from_str(&self.entry_date, DATE_FORMAT).map_err(|err| {
            AppError::database(format!(
                "stored entry {} has malformed date {}: {err}",
                self.id, self.entry_date
            ))
        })?;
        let period_type =
            PeriodType::try_from(self.period_type.as_str()).map_err(AppError::database)?;

        Ok(StatEntry {
            id: self.id,
            stat_id: self.stat_id,
            date_key: DateKey::new(date, self.is_second_half),
            value: self.value,
            period_type,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for StatEntryRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            stat_id: row.get("stat_id")?,
            entry_date: row.get("entry_date")?,
            is_second_half: row.get("is_second_half")?,
            period_type: row.get("period_type")?,
            value: row.get("value")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Filter for [`StatEntryRepository::range`]. Bounds are inclusive and
/// compare the base date, so both halves of a split day fall inside a range
/// that contains that day.
#[derive(Debug, Clone, Default)]
pub struct EntryRangeFilter<'a> {
    pub period_type: Option<PeriodType>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub stat_id: &'a str,
}

pub struct StatEntryRepository;

impl StatEntryRepository {
    /// Inserts or overwrites the row for `(stat_id, date_key, period_type)`
    /// and returns what is stored afterwards.
    pub fn upsert(conn: &Connection, input: &EntryUpsert) -> AppResult<StatEntry> {
        let now = Utc::now().to_rfc3339();
        let id = uuid::Uuid::new_v4().to_string();
        let entry_date = input.date_key.date.format(DATE_FORMAT).to_string();

        conn.execute(
            r#"
                INSERT INTO stat_entries (
                    id, stat_id, entry_date, is_second_half, period_type,
                    value, created_at, updated_at
                ) VALUES (
                    :id, :stat_id, :entry_date, :is_second_half, :period_type,
                    :value, :now, :now
                )
                ON CONFLICT(stat_id, entry_date, is_second_half, period_type) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":id": &id,
                ":stat_id": &input.stat_id,
                ":entry_date": &entry_date,
                ":is_second_half": input.date_key.is_second_half,
                ":period_type": input.period_type.as_str(),
                ":value": input.value,
                ":now": &now,
            },
        )?;

        Self::find_by_key(
            conn,
            &input.stat_id,
            &input.date_key,
            input.period_type,
        )?
        .ok_or_else(AppError::not_found)
    }

    pub fn find_by_key(
        conn: &Connection,
        stat_id: &str,
        date_key: &DateKey,
        period_type: PeriodType,
    ) -> AppResult<Option<StatEntry>> {
        let sql = format!(
            r#"{SELECT_COLUMNS}
                WHERE stat_id = :stat_id
                  AND entry_date = :entry_date
                  AND is_second_half = :is_second_half
                  AND period_type = :period_type
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row(
                named_params! {
                    ":stat_id": stat_id,
                    ":entry_date": date_key.date.format(DATE_FORMAT).to_string(),
                    ":is_second_half": date_key.is_second_half,
                    ":period_type": period_type.as_str(),
                },
                |row| StatEntryRow::try_from(row),
            )
            .optional()?;

        row.map(StatEntryRow::into_entry).transpose()
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<StatEntry>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = :id");
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row(named_params! {":id": id}, |row| StatEntryRow::try_from(row))
            .optional()?;

        row.map(StatEntryRow::into_entry).transpose()
    }

    /// Ascending by date key.
    pub fn range(conn: &Connection, filter: &EntryRangeFilter<'_>) -> AppResult<Vec<StatEntry>> {
        let sql = format!(
            r#"{SELECT_COLUMNS}
                WHERE stat_id = :stat_id
                  AND (:period_type IS NULL OR period_type = :period_type)
                  AND (:start IS NULL OR entry_date >= :start)
                  AND (:end IS NULL OR entry_date <= :end)
                ORDER BY entry_date ASC, is_second_half ASC, period_type ASC
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":stat_id": filter.stat_id,
                    ":period_type": filter.period_type.map(|period| period.as_str()),
                    ":start": filter.start.map(|date| date.format(DATE_FORMAT).to_string()),
                    ":end": filter.end.map(|date| date.format(DATE_FORMAT).to_string()),
                },
                |row| StatEntryRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StatEntryRow::into_entry).collect()
    }

    /// Up to `limit` entries newest first with a base date before `reference`.
    /// With `include_populated_current`, an entry dated `reference` itself is
    /// eligible once it holds a non-zero value.
    pub fn last_n_before(
        conn: &Connection,
        stat_id: &str,
        reference: NaiveDate,
        period_type: PeriodType,
        limit: usize,
        include_populated_current: bool,
    ) -> AppResult<Vec<StatEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"{SELECT_COLUMNS}
                WHERE stat_id = :stat_id
                  AND period_type = :period_type
                  AND (
                      entry_date < :reference
                      OR (:include_current = 1 AND entry_date = :reference AND value != 0)
                  )
                ORDER BY entry_date DESC, is_second_half DESC
                LIMIT :limit
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":stat_id": stat_id,
                    ":period_type": period_type.as_str(),
                    ":reference": reference.format(DATE_FORMAT).to_string(),
                    ":include_current": include_populated_current,
                    ":limit": limit as i64,
                },
                |row| StatEntryRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StatEntryRow::into_entry).collect()
    }

    pub fn update_value(conn: &Connection, id: &str, value: f64) -> AppResult<()> {
        let affected = conn.execute(
            "UPDATE stat_entries SET value = :value, updated_at = :updated_at WHERE id = :id",
            named_params! {
                ":id": id,
                ":value": value,
                ":updated_at": Utc::now().to_rfc3339(),
            },
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM stat_entries WHERE id = :id",
            named_params! {":id": id},
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn count_for_stat(conn: &Connection, stat_id: &str) -> AppResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM stat_entries WHERE stat_id = :stat_id",
            named_params! {":stat_id": stat_id},
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
