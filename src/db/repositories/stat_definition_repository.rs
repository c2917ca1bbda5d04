use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::stat::{OrgCategory, StatDefinition};

const SELECT_COLUMNS: &str = r#"
    SELECT
        id,
        name,
        user_id,
        created_by,
        division,
        department,
        is_money,
        is_percentage,
        is_inverted,
        linked_stat_ids,
        category,
        created_at,
        updated_at
    FROM stat_definitions
"#;

#[derive(Debug, Clone)]
pub struct StatDefinitionRow {
    pub id: String,
    pub name: String,
    pub user_id: String,
    pub created_by: String,
    pub division: Option<String>,
    pub department: Option<String>,
    pub is_money: bool,
    pub is_percentage: bool,
    pub is_inverted: bool,
    pub linked_stat_ids: Option<String>,
    pub category: String,
    pub created_at: String,
    pub updated_at: String,
}

impl StatDefinitionRow {
    pub fn from_definition(definition: &StatDefinition) -> AppResult<Self> {
        let linked_stat_ids = if definition.linked_stat_ids.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&definition.linked_stat_ids)?)
        };

        Ok(Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            user_id: definition.user_id.clone(),
            created_by: definition.created_by.clone(),
            division: definition.division.clone(),
            department: definition.department.clone(),
            is_money: definition.is_money,
            is_percentage: definition.is_percentage,
            is_inverted: definition.is_inverted,
            linked_stat_ids,
            category: definition.category.as_str().to_string(),
            created_at: definition.created_at.clone(),
            updated_at: definition.updated_at.clone(),
        })
    }

    pub fn into_definition(self) -> AppResult<StatDefinition> {
        let linked_stat_ids = match self.linked_stat_ids.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)?,
            _ => Vec::new(),
        };
        let category = OrgCategory::try_from(self.category.as_str()).map_err(AppError::other)?;

        Ok(StatDefinition {
            id: self.id,
            name: self.name,
            user_id: self.user_id,
            created_by: self.created_by,
            division: self.division,
            department: self.department,
            is_money: self.is_money,
            is_percentage: self.is_percentage,
            is_inverted: self.is_inverted,
            linked_stat_ids,
            category,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for StatDefinitionRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            user_id: row.get("user_id")?,
            created_by: row.get("created_by")?,
            division: row.get("division")?,
            department: row.get("department")?,
            is_money: row.get("is_money")?,
            is_percentage: row.get("is_percentage")?,
            is_inverted: row.get("is_inverted")?,
            linked_stat_ids: row.get("linked_stat_ids")?,
            category: row.get("category")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct StatDefinitionRepository;

impl StatDefinitionRepository {
    pub fn insert(conn: &Connection, definition: &StatDefinition) -> AppResult<()> {
        let row = StatDefinitionRow::from_definition(definition)?;
        conn.execute(
            r#"
                INSERT INTO stat_definitions (
                    id, name, user_id, created_by, division, department,
                    is_money, is_percentage, is_inverted, linked_stat_ids,
                    category, created_at, updated_at
                ) VALUES (
                    :id, :name, :user_id, :created_by, :division, :department,
                    :is_money, :is_percentage, :is_inverted, :linked_stat_ids,
                    :category, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":name": &row.name,
                ":user_id": &row.user_id,
                ":created_by": &row.created_by,
                ":division": &row.division,
                ":department": &row.department,
                ":is_money": row.is_money,
                ":is_percentage": row.is_percentage,
                ":is_inverted": row.is_inverted,
                ":linked_stat_ids": &row.linked_stat_ids,
                ":category": &row.category,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;
        Ok(())
    }

    pub fn update(conn: &Connection, definition: &StatDefinition) -> AppResult<()> {
        let row = StatDefinitionRow::from_definition(definition)?;
        let affected = conn.execute(
            r#"
                UPDATE stat_definitions SET
                    name = :name,
                    user_id = :user_id,
                    division = :division,
                    department = :department,
                    is_money = :is_money,
                    is_percentage = :is_percentage,
                    is_inverted = :is_inverted,
                    linked_stat_ids = :linked_stat_ids,
                    category = :category,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":name": &row.name,
                ":user_id": &row.user_id,
                ":division": &row.division,
                ":department": &row.department,
                ":is_money": row.is_money,
                ":is_percentage": row.is_percentage,
                ":is_inverted": row.is_inverted,
                ":linked_stat_ids": &row.linked_stat_ids,
                ":category": &row.category,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<StatDefinition>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = :id");
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row(named_params! {":id": id}, |row| StatDefinitionRow::try_from(row))
            .optional()?;

        row.map(StatDefinitionRow::into_definition).transpose()
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<StatDefinition>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY name COLLATE NOCASE ASC, id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| StatDefinitionRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(StatDefinitionRow::into_definition)
            .collect()
    }

    pub fn list_by_user(conn: &Connection, user_id: &str) -> AppResult<Vec<StatDefinition>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE user_id = :user_id ORDER BY name COLLATE NOCASE ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                StatDefinitionRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(StatDefinitionRow::into_definition)
            .collect()
    }

    /// Composites whose links include `stat_id`; used to refuse deleting a
    /// stat that a composite still groups.
    pub fn list_composites_linking(
        conn: &Connection,
        stat_id: &str,
    ) -> AppResult<Vec<StatDefinition>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE linked_stat_ids IS NOT NULL AND linked_stat_ids LIKE :pattern"
        );
        let pattern = format!("%\"{stat_id}\"%");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(named_params! {":pattern": pattern}, |row| {
                StatDefinitionRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let definitions = rows
            .into_iter()
            .map(StatDefinitionRow::into_definition)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(definitions
            .into_iter()
            .filter(|definition| definition.linked_stat_ids.iter().any(|id| id == stat_id))
            .collect())
    }

    /// Entries and quotas go with the definition through the foreign key cascade.
    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM stat_definitions WHERE id = :id",
            named_params! {":id": id},
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}
