//! Daily nutrition goals (single row)

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::connection::optional;
use crate::db::{DbError, DbResult};

use super::NutritionValue;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionGoals {
    #[serde(flatten)]
    pub targets: NutritionValue,
}

impl NutritionGoals {
    /// `None` until goals have been set once
    pub fn get(conn: &Connection) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT calories, protein, carbs, fat FROM nutrition_goals WHERE id = 1",
            [],
            |row| {
                Ok(Self {
                    targets: NutritionValue {
                        calories: row.get(0)?,
                        protein: row.get(1)?,
                        carbs: row.get(2)?,
                        fat: row.get(3)?,
                    },
                })
            },
        ))
    }

    pub fn set(conn: &Connection, targets: &NutritionValue) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO nutrition_goals (id, calories, protein, carbs, fat, updated_at)
            VALUES (1, ?1, ?2, ?3, ?4, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                calories = excluded.calories,
                protein = excluded.protein,
                carbs = excluded.carbs,
                fat = excluded.fat,
                updated_at = excluded.updated_at
            "#,
            params![targets.calories, targets.protein, targets.carbs, targets.fat],
        )?;
        Self::get(conn)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_conn;

    #[test]
    fn test_unset_then_set_then_overwrite() {
        let conn = test_conn();
        assert!(NutritionGoals::get(&conn).unwrap().is_none());

        NutritionGoals::set(&conn, &NutritionValue::new(2000.0, 150.0, 250.0, 70.0)).unwrap();
        let goals = NutritionGoals::set(&conn, &NutritionValue::new(1800.0, 140.0, 200.0, 60.0)).unwrap();
        assert_eq!(goals.targets.calories, 1800.0);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM nutrition_goals", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_negative_goal_is_rejected() {
        let conn = test_conn();
        assert!(NutritionGoals::set(&conn, &NutritionValue::new(-1.0, 0.0, 0.0, 0.0)).is_err());
    }
}
