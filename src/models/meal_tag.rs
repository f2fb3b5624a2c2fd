//! Meal tag model

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::connection::optional;
use crate::db::{DbError, DbResult};

use super::ingredient_group::DEFAULT_GROUP_COLOR;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealTag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealTagCreate {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealTagUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl MealTag {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            color: row.get("color")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &MealTagCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO meal_tags (name, color) VALUES (?1, ?2)",
            params![
                data.name.trim(),
                data.color.as_deref().unwrap_or(DEFAULT_GROUP_COLOR)
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT * FROM meal_tags WHERE id = ?1",
            [id],
            Self::from_row,
        ))
    }

    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meal_tags ORDER BY name COLLATE NOCASE ASC")?;
        let tags = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Tags attached to a meal, by name
    pub fn for_meal(conn: &Connection, meal_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT t.* FROM meal_tags t
            JOIN meal_tag_links l ON l.tag_id = t.id
            WHERE l.meal_id = ?1
            ORDER BY t.name COLLATE NOCASE ASC
            "#,
        )?;
        let tags = stmt
            .query_map([meal_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    pub fn update(conn: &Connection, id: i64, data: &MealTagUpdate) -> DbResult<Option<Self>> {
        if let Some(ref name) = data.name {
            conn.execute(
                "UPDATE meal_tags SET name = ?1 WHERE id = ?2",
                params![name.trim(), id],
            )?;
        }
        if let Some(ref color) = data.color {
            conn.execute(
                "UPDATE meal_tags SET color = ?1 WHERE id = ?2",
                params![color, id],
            )?;
        }
        Self::get_by_id(conn, id)
    }

    /// Delete a tag; its links to meals go with it
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM meal_tags WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
