//! Ingredient group model
//!
//! Groups categorize ingredients and drive the group filter on the
//! ingredient list.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::connection::optional;
use crate::db::{DbError, DbResult};

pub const DEFAULT_GROUP_COLOR: &str = "#9ca3af";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientGroup {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientGroupCreate {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientGroupUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Group with the number of ingredients filed under it
#[derive(Debug, Clone, Serialize)]
pub struct IngredientGroupWithCount {
    #[serde(flatten)]
    pub group: IngredientGroup,
    pub ingredient_count: i64,
}

impl IngredientGroup {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            color: row.get("color")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &IngredientGroupCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO ingredient_groups (name, color) VALUES (?1, ?2)",
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
            "SELECT * FROM ingredient_groups WHERE id = ?1",
            [id],
            Self::from_row,
        ))
    }

    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT * FROM ingredient_groups WHERE name = ?1 COLLATE NOCASE",
            [name],
            Self::from_row,
        ))
    }

    /// All groups by name, with ingredient counts
    pub fn list(conn: &Connection) -> DbResult<Vec<IngredientGroupWithCount>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT g.*, COUNT(i.id) AS ingredient_count
            FROM ingredient_groups g
            LEFT JOIN ingredients i ON i.group_id = g.id
            GROUP BY g.id
            ORDER BY g.name COLLATE NOCASE ASC
            "#,
        )?;

        let groups = stmt
            .query_map([], |row| {
                Ok(IngredientGroupWithCount {
                    group: Self::from_row(row)?,
                    ingredient_count: row.get("ingredient_count")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(groups)
    }

    pub fn update(
        conn: &Connection,
        id: i64,
        data: &IngredientGroupUpdate,
    ) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        if let Some(ref color) = data.color {
            updates.push(format!("color = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(color.clone()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());
        let sql = format!(
            "UPDATE ingredient_groups SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Delete a group. Fails with a foreign key error while ingredients
    /// still reference it; `Ok(false)` when no such group exists.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM ingredient_groups WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
