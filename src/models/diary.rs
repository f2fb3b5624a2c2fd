//! Food diary model
//!
//! One entry per date holds ordered meals; each meal holds line items whose
//! totals are multiplied out for the logged amount when they are written.
//! Items keep a snapshot of the ingredient name so they survive the
//! ingredient being deleted.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::connection::optional;
use crate::db::{DbError, DbResult};
use crate::nutrition::{line_totals, LineItem, MealInput};

use super::{round2, Ingredient, Meal};

/// A diary date, ISO `YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: i64,
    pub entry_date: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryMeal {
    pub id: i64,
    pub diary_entry_id: i64,
    pub name: String,
    pub meal_order: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiaryMealUpdate {
    pub name: Option<String>,
    pub meal_order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryItem {
    pub id: i64,
    pub diary_meal_id: i64,
    /// `None` once the ingredient has been deleted
    pub ingredient_id: Option<i64>,
    pub ingredient_name: String,
    pub amount: f64,
    #[serde(flatten)]
    pub totals: LineItem,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiaryMealWithItems {
    #[serde(flatten)]
    pub meal: DiaryMeal,
    pub items: Vec<DiaryItem>,
}

/// Everything logged on one date, meals in display order
#[derive(Debug, Clone, Serialize)]
pub struct DiaryDay {
    pub entry: DiaryEntry,
    pub meals: Vec<DiaryMealWithItems>,
}

impl DiaryDay {
    /// Aggregator input, one per meal, order preserved
    pub fn to_meal_inputs(&self) -> Vec<MealInput> {
        self.meals
            .iter()
            .map(|m| MealInput {
                id: Some(m.meal.id),
                name: m.meal.name.clone(),
                meal_order: m.meal.meal_order,
                items: m.items.iter().map(|i| i.totals.clone()).collect(),
            })
            .collect()
    }

    /// Distinct ids of ingredients still linked from this day's items
    pub fn ingredient_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .meals
            .iter()
            .flat_map(|m| m.items.iter().filter_map(|i| i.ingredient_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl DiaryEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            entry_date: row.get("entry_date")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT * FROM diary_entries WHERE id = ?1",
            [id],
            Self::from_row,
        ))
    }

    pub fn get_by_date(conn: &Connection, date: &str) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT * FROM diary_entries WHERE entry_date = ?1",
            [date],
            Self::from_row,
        ))
    }

    pub fn get_or_create(conn: &Connection, date: &str) -> DbResult<Self> {
        conn.execute(
            "INSERT OR IGNORE INTO diary_entries (entry_date) VALUES (?1)",
            [date],
        )?;
        Self::get_by_date(conn, date)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn set_notes(conn: &Connection, id: i64, notes: Option<&str>) -> DbResult<Option<Self>> {
        conn.execute(
            "UPDATE diary_entries SET notes = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![notes, id],
        )?;
        Self::get_by_id(conn, id)
    }

    /// Entries between two dates inclusive, oldest first
    pub fn list_range(conn: &Connection, start_date: &str, end_date: &str) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM diary_entries
            WHERE entry_date >= ?1 AND entry_date <= ?2
            ORDER BY entry_date ASC
            "#,
        )?;
        let entries = stmt
            .query_map([start_date, end_date], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Load a date with its meals and items; `None` if nothing was logged
    pub fn load_day(conn: &Connection, date: &str) -> DbResult<Option<DiaryDay>> {
        let Some(entry) = Self::get_by_date(conn, date)? else {
            return Ok(None);
        };
        Self::load_entry(conn, entry).map(Some)
    }

    pub fn load_entry(conn: &Connection, entry: DiaryEntry) -> DbResult<DiaryDay> {
        let meals = DiaryMeal::for_entry(conn, entry.id)?
            .into_iter()
            .map(|meal| {
                let items = DiaryItem::for_meal(conn, meal.id)?;
                Ok(DiaryMealWithItems { meal, items })
            })
            .collect::<DbResult<Vec<_>>>()?;
        Ok(DiaryDay { entry, meals })
    }

    fn touch(conn: &Connection, id: i64) -> DbResult<()> {
        conn.execute(
            "UPDATE diary_entries SET updated_at = datetime('now') WHERE id = ?1",
            [id],
        )?;
        Ok(())
    }
}

impl DiaryMeal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            diary_entry_id: row.get("diary_entry_id")?,
            name: row.get("name")?,
            meal_order: row.get("meal_order")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT * FROM diary_meals WHERE id = ?1",
            [id],
            Self::from_row,
        ))
    }

    pub fn for_entry(conn: &Connection, entry_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM diary_meals WHERE diary_entry_id = ?1 ORDER BY meal_order ASC, id ASC",
        )?;
        let meals = stmt
            .query_map([entry_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meals)
    }

    /// Append a meal after the day's last one
    pub fn add(conn: &Connection, entry_id: i64, name: &str) -> DbResult<Self> {
        let next_order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(meal_order) + 1, 0) FROM diary_meals WHERE diary_entry_id = ?1",
            [entry_id],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO diary_meals (diary_entry_id, name, meal_order) VALUES (?1, ?2, ?3)",
            params![entry_id, name.trim(), next_order],
        )?;
        let id = conn.last_insert_rowid();
        DiaryEntry::touch(conn, entry_id)?;

        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn update(conn: &Connection, id: i64, data: &DiaryMealUpdate) -> DbResult<Option<Self>> {
        let Some(meal) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };
        if let Some(ref name) = data.name {
            conn.execute(
                "UPDATE diary_meals SET name = ?1 WHERE id = ?2",
                params![name.trim(), id],
            )?;
        }
        if let Some(order) = data.meal_order {
            conn.execute(
                "UPDATE diary_meals SET meal_order = ?1 WHERE id = ?2",
                params![order, id],
            )?;
        }
        DiaryEntry::touch(conn, meal.diary_entry_id)?;
        Self::get_by_id(conn, id)
    }

    /// Delete a meal and its items
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let Some(meal) = Self::get_by_id(conn, id)? else {
            return Ok(false);
        };
        conn.execute("DELETE FROM diary_meals WHERE id = ?1", [id])?;
        DiaryEntry::touch(conn, meal.diary_entry_id)?;
        Ok(true)
    }

    /// Copy a library meal into a date as a new diary meal.
    ///
    /// Each library line becomes an item with totals computed from the
    /// ingredient's current values.
    pub fn log_library_meal(
        conn: &Connection,
        date: &str,
        meal_id: i64,
        name: Option<&str>,
    ) -> DbResult<Option<DiaryMealWithItems>> {
        let Some(library_meal) = Meal::get_by_id(conn, meal_id)? else {
            return Ok(None);
        };
        let lines = Meal::lines(conn, meal_id)?;

        let entry = DiaryEntry::get_or_create(conn, date)?;
        let meal = Self::add(conn, entry.id, name.unwrap_or(&library_meal.name))?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let ingredient = Ingredient::get_by_id(conn, line.ingredient_id)?
                .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
            items.push(DiaryItem::add(conn, meal.id, &ingredient, line.amount)?);
        }

        Ok(Some(DiaryMealWithItems { meal, items }))
    }
}

impl DiaryItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            diary_meal_id: row.get("diary_meal_id")?,
            ingredient_id: row.get("ingredient_id")?,
            ingredient_name: row.get("ingredient_name")?,
            amount: row.get("amount")?,
            totals: LineItem {
                total_calories: row.get("total_calories")?,
                total_protein: row.get("total_protein")?,
                total_carbs: row.get("total_carbs")?,
                total_fat: row.get("total_fat")?,
            },
            created_at: row.get("created_at")?,
        })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT * FROM diary_items WHERE id = ?1",
            [id],
            Self::from_row,
        ))
    }

    pub fn for_meal(conn: &Connection, diary_meal_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM diary_items WHERE diary_meal_id = ?1 ORDER BY id ASC")?;
        let items = stmt
            .query_map([diary_meal_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Log `amount` of an ingredient into a diary meal
    pub fn add(conn: &Connection, diary_meal_id: i64, ingredient: &Ingredient, amount: f64) -> DbResult<Self> {
        let totals = line_totals(ingredient, amount);
        conn.execute(
            r#"
            INSERT INTO diary_items (
                diary_meal_id, ingredient_id, ingredient_name, amount,
                total_calories, total_protein, total_carbs, total_fat
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                diary_meal_id,
                ingredient.id,
                ingredient.name,
                amount,
                totals.calories,
                totals.protein,
                totals.carbs,
                totals.fat,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Change the logged amount and recompute totals.
    ///
    /// Uses the linked ingredient when it still exists; an orphaned item has
    /// its stored totals scaled by the amount ratio instead.
    pub fn update_amount(conn: &Connection, id: i64, amount: f64) -> DbResult<Option<Self>> {
        let Some(item) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };
        if amount <= 0.0 {
            return Err(DbError::Invalid("amount must be greater than 0".to_string()));
        }

        let ingredient = match item.ingredient_id {
            Some(ingredient_id) => Ingredient::get_by_id(conn, ingredient_id)?,
            None => None,
        };
        let totals = match ingredient {
            Some(ingredient) => LineItem::from_totals(line_totals(&ingredient, amount)),
            None => {
                let ratio = amount / item.amount;
                let scale = |v: Option<f64>| v.map(|v| round2(v * ratio));
                LineItem {
                    total_calories: scale(item.totals.total_calories),
                    total_protein: scale(item.totals.total_protein),
                    total_carbs: scale(item.totals.total_carbs),
                    total_fat: scale(item.totals.total_fat),
                }
            }
        };

        conn.execute(
            r#"
            UPDATE diary_items
            SET amount = ?1, total_calories = ?2, total_protein = ?3, total_carbs = ?4, total_fat = ?5
            WHERE id = ?6
            "#,
            params![
                amount,
                totals.total_calories,
                totals.total_protein,
                totals.total_carbs,
                totals.total_fat,
                id,
            ],
        )?;
        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM diary_items WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_conn;
    use crate::models::{IngredientCreate, MealCreate, MealLineInput, NutritionValue};
    use crate::nutrition::{NutritionAggregator, UnitType};

    fn ingredient(conn: &Connection, name: &str, unit_type: UnitType, n: NutritionValue) -> Ingredient {
        conn.execute("INSERT OR IGNORE INTO ingredient_groups (id, name) VALUES (1, 'Misc')", [])
            .unwrap();
        Ingredient::create(
            conn,
            &IngredientCreate {
                group_id: 1,
                name: name.into(),
                unit_type,
                calories: n.calories,
                protein: n.protein,
                carbs: n.carbs,
                fat: n.fat,
                price: None,
                notes: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let conn = test_conn();
        let a = DiaryEntry::get_or_create(&conn, "2025-03-01").unwrap();
        let b = DiaryEntry::get_or_create(&conn, "2025-03-01").unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_meals_append_in_order() {
        let conn = test_conn();
        let entry = DiaryEntry::get_or_create(&conn, "2025-03-01").unwrap();
        let breakfast = DiaryMeal::add(&conn, entry.id, "Breakfast").unwrap();
        let lunch = DiaryMeal::add(&conn, entry.id, "Lunch").unwrap();
        assert_eq!(breakfast.meal_order, 0);
        assert_eq!(lunch.meal_order, 1);

        DiaryMeal::update(
            &conn,
            lunch.id,
            &DiaryMealUpdate {
                name: None,
                meal_order: Some(-1),
            },
        )
        .unwrap();
        let names: Vec<String> = DiaryMeal::for_entry(&conn, entry.id)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Lunch", "Breakfast"]);
    }

    #[test]
    fn test_items_store_multiplied_totals() {
        let conn = test_conn();
        let rice = ingredient(&conn, "Rice", UnitType::PerKg, NutritionValue::new(1300.0, 27.0, 280.0, 3.0));
        let entry = DiaryEntry::get_or_create(&conn, "2025-03-02").unwrap();
        let meal = DiaryMeal::add(&conn, entry.id, "Dinner").unwrap();

        let item = DiaryItem::add(&conn, meal.id, &rice, 250.0).unwrap();
        assert_eq!(item.totals.total_calories, Some(325.0));
        assert_eq!(item.totals.total_protein, Some(6.75));

        let item = DiaryItem::update_amount(&conn, item.id, 500.0).unwrap().unwrap();
        assert_eq!(item.totals.total_calories, Some(650.0));
        assert!(DiaryItem::update_amount(&conn, item.id, 0.0).is_err());
    }

    #[test]
    fn test_items_survive_ingredient_delete() {
        let conn = test_conn();
        let apple = ingredient(&conn, "Apple", UnitType::PerPiece, NutritionValue::new(95.0, 0.5, 25.0, 0.3));
        let entry = DiaryEntry::get_or_create(&conn, "2025-03-03").unwrap();
        let meal = DiaryMeal::add(&conn, entry.id, "Snack").unwrap();
        let item = DiaryItem::add(&conn, meal.id, &apple, 2.0).unwrap();

        assert!(Ingredient::delete(&conn, apple.id).unwrap());
        let orphan = DiaryItem::get_by_id(&conn, item.id).unwrap().unwrap();
        assert_eq!(orphan.ingredient_id, None);
        assert_eq!(orphan.ingredient_name, "Apple");

        let scaled = DiaryItem::update_amount(&conn, item.id, 1.0).unwrap().unwrap();
        assert_eq!(scaled.totals.total_calories, Some(95.0));
    }

    #[test]
    fn test_log_library_meal_and_aggregate_day() {
        let conn = test_conn();
        let egg = ingredient(&conn, "Egg", UnitType::PerPiece, NutritionValue::new(78.0, 6.3, 0.6, 5.3));
        let bread = ingredient(&conn, "Bread", UnitType::Per100g, NutritionValue::new(265.0, 9.0, 49.0, 3.2));
        let meal = Meal::create(
            &conn,
            &MealCreate {
                name: "Eggs on toast".into(),
                description: None,
                tag_ids: vec![],
            },
        )
        .unwrap();
        Meal::set_ingredients(
            &conn,
            meal.id,
            &[
                MealLineInput { ingredient_id: egg.id, amount: 2.0 },
                MealLineInput { ingredient_id: bread.id, amount: 60.0 },
            ],
        )
        .unwrap();

        let logged = DiaryMeal::log_library_meal(&conn, "2025-03-04", meal.id, None)
            .unwrap()
            .unwrap();
        assert_eq!(logged.meal.name, "Eggs on toast");
        assert_eq!(logged.items.len(), 2);

        let day = DiaryEntry::load_day(&conn, "2025-03-04").unwrap().unwrap();
        assert_eq!(day.ingredient_ids(), {
            let mut ids = vec![egg.id, bread.id];
            ids.sort_unstable();
            ids
        });
        let inputs = day.to_meal_inputs();
        let aggregator = NutritionAggregator::new(&inputs, &[]);
        assert_eq!(
            aggregator.daily_nutrition(),
            NutritionValue::new(315.0, 18.0, 30.6, 12.52)
        );

        assert!(DiaryMeal::log_library_meal(&conn, "2025-03-04", 999, None).unwrap().is_none());
    }

    #[test]
    fn test_list_range() {
        let conn = test_conn();
        for date in ["2025-02-27", "2025-03-01", "2025-03-05"] {
            DiaryEntry::get_or_create(&conn, date).unwrap();
        }
        let entries = DiaryEntry::list_range(&conn, "2025-03-01", "2025-03-31").unwrap();
        let dates: Vec<&str> = entries.iter().map(|e| e.entry_date.as_str()).collect();
        assert_eq!(dates, vec!["2025-03-01", "2025-03-05"]);
        assert!(DiaryEntry::load_day(&conn, "2025-01-01").unwrap().is_none());
    }
}
