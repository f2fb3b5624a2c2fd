//! Meal library model
//!
//! A library meal is an ordered list of ingredient amounts plus tags. Its
//! nutrition is never stored; it is derived from the current ingredient
//! values whenever the meal is read.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::connection::optional;
use crate::db::{DbError, DbResult};
use crate::filter::{FilterState, MealSort};
use crate::nutrition::{calculate_meal_nutrition, line_totals, LineItem, MealInput, UnitType};

use super::{Ingredient, MealTag, NutritionValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealCreate {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// One requested line when replacing a meal's ingredients
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MealLineInput {
    pub ingredient_id: i64,
    pub amount: f64,
}

/// A stored line with its ingredient and computed totals
#[derive(Debug, Clone, Serialize)]
pub struct MealIngredientLine {
    pub id: i64,
    pub position: i64,
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub unit_type: UnitType,
    pub amount: f64,
    /// "g" or "pcs"
    pub amount_unit: &'static str,
    pub totals: NutritionValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealDetail {
    #[serde(flatten)]
    pub meal: Meal,
    pub tags: Vec<MealTag>,
    pub ingredients: Vec<MealIngredientLine>,
    pub nutrition: NutritionValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealListItem {
    #[serde(flatten)]
    pub meal: Meal,
    pub tags: Vec<MealTag>,
    pub ingredient_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealPage {
    pub items: Vec<MealListItem>,
    pub total: i64,
}

impl Meal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a meal and link its tags. Run inside a transaction so a bad
    /// tag id leaves nothing behind.
    pub fn create(conn: &Connection, data: &MealCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO meals (name, description) VALUES (?1, ?2)",
            params![data.name.trim(), data.description],
        )?;
        let id = conn.last_insert_rowid();
        Self::set_tags(conn, id, &data.tag_ids)?;

        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        optional(conn.query_row("SELECT * FROM meals WHERE id = ?1", [id], Self::from_row))
    }

    /// Ordered lines with totals for their amounts
    pub fn lines(conn: &Connection, meal_id: i64) -> DbResult<Vec<MealIngredientLine>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, position, ingredient_id, amount
            FROM meal_ingredients
            WHERE meal_id = ?1
            ORDER BY position ASC, id ASC
            "#,
        )?;
        let rows = stmt
            .query_map([meal_id], |row| {
                Ok((
                    row.get::<_, i64>("id")?,
                    row.get::<_, i64>("position")?,
                    row.get::<_, i64>("ingredient_id")?,
                    row.get::<_, f64>("amount")?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<i64> = rows.iter().map(|(_, _, ingredient_id, _)| *ingredient_id).collect();
        let ingredients = Ingredient::get_many(conn, &ids)?;

        let mut lines = Vec::with_capacity(rows.len());
        for (id, position, ingredient_id, amount) in rows {
            // RESTRICT on meal_ingredients keeps the ingredient around
            let ingredient = ingredients
                .iter()
                .find(|i| i.id == ingredient_id)
                .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
            lines.push(MealIngredientLine {
                id,
                position,
                ingredient_id,
                ingredient_name: ingredient.name.clone(),
                unit_type: ingredient.unit_type,
                amount,
                amount_unit: ingredient.unit_type.amount_unit(),
                totals: line_totals(ingredient, amount),
            });
        }
        Ok(lines)
    }

    pub fn get_detail(conn: &Connection, id: i64) -> DbResult<Option<MealDetail>> {
        let Some(meal) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };
        let tags = MealTag::for_meal(conn, id)?;
        let ingredients = Self::lines(conn, id)?;
        let nutrition = calculate_meal_nutrition(&MealInput {
            id: Some(meal.id),
            name: meal.name.clone(),
            meal_order: 0,
            items: ingredients
                .iter()
                .map(|line| LineItem::from_totals(line.totals))
                .collect(),
        })
        .nutrition;

        Ok(Some(MealDetail {
            meal,
            tags,
            ingredients,
            nutrition,
        }))
    }

    /// One page of the meal library.
    ///
    /// Search matches name or description, the group filter matches a tag name.
    pub fn list(conn: &Connection, filter: &FilterState<MealSort>) -> DbResult<MealPage> {
        let mut conditions = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(pattern) = filter.search_pattern() {
            let n = params_vec.len() + 1;
            conditions.push(format!(
                "(m.name LIKE ?{n} ESCAPE '\\' OR m.description LIKE ?{n} ESCAPE '\\')"
            ));
            params_vec.push(Box::new(pattern));
        }
        if let Some(tag) = filter.group_filter() {
            conditions.push(format!(
                r#"EXISTS (
                    SELECT 1 FROM meal_tag_links l
                    JOIN meal_tags t ON t.id = l.tag_id
                    WHERE l.meal_id = m.id AND t.name = ?{} COLLATE NOCASE
                )"#,
                params_vec.len() + 1
            ));
            params_vec.push(Box::new(tag.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM meals m {}", where_clause),
            params_refs.as_slice(),
            |row| row.get(0),
        )?;

        let sql = format!(
            r#"
            SELECT m.*,
                   (SELECT COUNT(*) FROM meal_ingredients mi WHERE mi.meal_id = m.id) AS ingredient_count
            FROM meals m
            {}
            ORDER BY {}, m.id ASC
            LIMIT ?{} OFFSET ?{}
            "#,
            where_clause,
            filter.order_clause(),
            params_vec.len() + 1,
            params_vec.len() + 2
        );
        params_vec.push(Box::new(i64::from(filter.limit)));
        let offset = i64::try_from(filter.offset)
            .map_err(|_| DbError::Invalid(format!("offset {} is out of range", filter.offset)))?;
        params_vec.push(Box::new(offset));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok((Self::from_row(row)?, row.get::<_, i64>("ingredient_count")?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut items = Vec::with_capacity(rows.len());
        for (meal, ingredient_count) in rows {
            let tags = MealTag::for_meal(conn, meal.id)?;
            items.push(MealListItem {
                meal,
                tags,
                ingredient_count,
            });
        }

        Ok(MealPage { items, total })
    }

    pub fn update(conn: &Connection, id: i64, data: &MealUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        if let Some(ref description) = data.description {
            updates.push(format!("description = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(description.clone()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());
        let sql = format!(
            "UPDATE meals SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Replace the meal's ingredient lines; positions follow slice order
    pub fn set_ingredients(conn: &Connection, meal_id: i64, lines: &[MealLineInput]) -> DbResult<()> {
        conn.execute("DELETE FROM meal_ingredients WHERE meal_id = ?1", [meal_id])?;

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO meal_ingredients (meal_id, ingredient_id, amount, position)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )?;
        for (position, line) in lines.iter().enumerate() {
            stmt.execute(params![meal_id, line.ingredient_id, line.amount, position as i64])?;
        }

        conn.execute(
            "UPDATE meals SET updated_at = datetime('now') WHERE id = ?1",
            [meal_id],
        )?;
        Ok(())
    }

    /// Replace the meal's tag links
    pub fn set_tags(conn: &Connection, meal_id: i64, tag_ids: &[i64]) -> DbResult<()> {
        conn.execute("DELETE FROM meal_tag_links WHERE meal_id = ?1", [meal_id])?;
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO meal_tag_links (meal_id, tag_id) VALUES (?1, ?2)",
        )?;
        for tag_id in tag_ids {
            stmt.execute(params![meal_id, tag_id])?;
        }
        Ok(())
    }

    /// Delete a meal with its lines and tag links
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM meals WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_conn;
    use crate::models::{IngredientCreate, MealTagCreate};

    fn setup(conn: &Connection) -> (i64, i64) {
        conn.execute("INSERT INTO ingredient_groups (name) VALUES ('Misc')", []).unwrap();
        let group_id = conn.last_insert_rowid();
        let oats = Ingredient::create(
            conn,
            &IngredientCreate {
                group_id,
                name: "Oats".into(),
                unit_type: UnitType::Per100g,
                calories: 389.0,
                protein: 16.9,
                carbs: 66.3,
                fat: 6.9,
                price: None,
                notes: None,
            },
        )
        .unwrap();
        let banana = Ingredient::create(
            conn,
            &IngredientCreate {
                group_id,
                name: "Banana".into(),
                unit_type: UnitType::PerPiece,
                calories: 105.0,
                protein: 1.3,
                carbs: 27.0,
                fat: 0.4,
                price: None,
                notes: None,
            },
        )
        .unwrap();
        (oats.id, banana.id)
    }

    fn meal(conn: &Connection, name: &str, tag_ids: Vec<i64>) -> Meal {
        Meal::create(
            conn,
            &MealCreate {
                name: name.into(),
                description: None,
                tag_ids,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_detail_derives_nutrition_from_lines() {
        let conn = test_conn();
        let (oats, banana) = setup(&conn);
        let porridge = meal(&conn, "Porridge", vec![]);
        Meal::set_ingredients(
            &conn,
            porridge.id,
            &[
                MealLineInput { ingredient_id: banana, amount: 1.0 },
                MealLineInput { ingredient_id: oats, amount: 50.0 },
            ],
        )
        .unwrap();

        let detail = Meal::get_detail(&conn, porridge.id).unwrap().unwrap();
        let names: Vec<&str> = detail.ingredients.iter().map(|l| l.ingredient_name.as_str()).collect();
        assert_eq!(names, vec!["Banana", "Oats"]);
        assert_eq!(detail.ingredients[1].totals, NutritionValue::new(194.5, 8.45, 33.15, 3.45));
        assert_eq!(detail.ingredients[0].amount_unit, "pcs");
        assert_eq!(detail.nutrition, NutritionValue::new(299.5, 9.75, 60.15, 3.85));
    }

    #[test]
    fn test_set_ingredients_replaces_lines() {
        let conn = test_conn();
        let (oats, banana) = setup(&conn);
        let m = meal(&conn, "Snack", vec![]);
        Meal::set_ingredients(&conn, m.id, &[MealLineInput { ingredient_id: oats, amount: 30.0 }]).unwrap();
        Meal::set_ingredients(&conn, m.id, &[MealLineInput { ingredient_id: banana, amount: 2.0 }]).unwrap();

        let lines = Meal::lines(&conn, m.id).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].ingredient_id, banana);
        assert_eq!(lines[0].position, 0);
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        let conn = test_conn();
        let (oats, _) = setup(&conn);
        let m = meal(&conn, "Empty", vec![]);
        let result = Meal::set_ingredients(&conn, m.id, &[MealLineInput { ingredient_id: oats, amount: 0.0 }]);
        assert!(result.is_err());
    }

    #[test]
    fn test_list_filters_by_tag() {
        let conn = test_conn();
        let breakfast = MealTag::create(&conn, &MealTagCreate { name: "Breakfast".into(), color: None }).unwrap();
        meal(&conn, "Porridge", vec![breakfast.id]);
        meal(&conn, "Omelette", vec![breakfast.id]);
        meal(&conn, "Curry", vec![]);

        let all = Meal::list(&conn, &FilterState::default()).unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].meal.name, "Curry");

        let filter = FilterState::<MealSort>::default().on_group_change("breakfast");
        let page = Meal::list(&conn, &filter).unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|m| m.tags.len() == 1));
    }

    #[test]
    fn test_ingredient_in_meal_cannot_be_deleted() {
        let conn = test_conn();
        let (oats, _) = setup(&conn);
        let m = meal(&conn, "Granola", vec![]);
        Meal::set_ingredients(&conn, m.id, &[MealLineInput { ingredient_id: oats, amount: 80.0 }]).unwrap();
        assert!(Ingredient::delete(&conn, oats).is_err());
        assert_eq!(Ingredient::used_in_meals(&conn, oats).unwrap(), vec!["Granola".to_string()]);

        assert!(Meal::delete(&conn, m.id).unwrap());
        assert!(Ingredient::delete(&conn, oats).unwrap());
    }
}
