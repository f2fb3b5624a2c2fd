//! Ingredient model
//!
//! An ingredient carries its macros per declared unit (per 100 g, per kg or
//! per piece) and belongs to exactly one group.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::connection::optional;
use crate::db::{DbError, DbResult};
use crate::filter::{FilterState, IngredientSort};
use crate::nutrition::UnitType;

use super::NutritionValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub group_id: i64,
    pub name: String,
    pub unit_type: UnitType,
    /// Macros per declared unit
    pub nutrition: NutritionValue,
    pub price: Option<f64>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientCreate {
    pub group_id: i64,
    pub name: String,
    #[serde(default)]
    pub unit_type: UnitType,
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    pub price: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientUpdate {
    pub group_id: Option<i64>,
    pub name: Option<String>,
    pub unit_type: Option<UnitType>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub price: Option<f64>,
    pub notes: Option<String>,
}

/// List row: ingredient plus its group's display fields
#[derive(Debug, Clone, Serialize)]
pub struct IngredientListItem {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub group_name: String,
    pub group_color: String,
}

/// One page of ingredients and the size of the whole filtered set
#[derive(Debug, Clone, Serialize)]
pub struct IngredientPage {
    pub items: Vec<IngredientListItem>,
    pub total: i64,
}

impl Ingredient {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let unit: String = row.get("unit_type")?;
        Ok(Self {
            id: row.get("id")?,
            group_id: row.get("group_id")?,
            name: row.get("name")?,
            unit_type: unit.parse().unwrap_or_default(),
            nutrition: NutritionValue {
                calories: row.get("calories")?,
                protein: row.get("protein")?,
                carbs: row.get("carbs")?,
                fat: row.get("fat")?,
            },
            price: row.get("price")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &IngredientCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO ingredients (
                group_id, name, unit_type, calories, protein, carbs, fat, price, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                data.group_id,
                data.name.trim(),
                data.unit_type.as_str(),
                data.calories,
                data.protein,
                data.carbs,
                data.fat,
                data.price,
                data.notes,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT * FROM ingredients WHERE id = ?1",
            [id],
            Self::from_row,
        ))
    }

    /// Ingredients with the given ids, in no particular order
    pub fn get_many(conn: &Connection, ids: &[i64]) -> DbResult<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM ingredients WHERE id IN ({})", placeholders);
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Quick name search, used by the assistant
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let state = FilterState::<IngredientSort> {
            search: query.to_string(),
            ..FilterState::default()
        };
        let pattern = state.search_pattern().unwrap_or_else(|| "%".to_string());
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM ingredients
            WHERE name LIKE ?1 ESCAPE '\'
            ORDER BY name COLLATE NOCASE ASC
            LIMIT ?2
            "#,
        )?;
        let items = stmt
            .query_map(params![pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// One page of the ingredient list for a filter state.
    ///
    /// Search matches the name, the group filter matches the group name.
    pub fn list(conn: &Connection, filter: &FilterState<IngredientSort>) -> DbResult<IngredientPage> {
        let mut conditions = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(pattern) = filter.search_pattern() {
            conditions.push(format!("i.name LIKE ?{} ESCAPE '\\'", params_vec.len() + 1));
            params_vec.push(Box::new(pattern));
        }
        if let Some(group) = filter.group_filter() {
            conditions.push(format!("g.name = ?{} COLLATE NOCASE", params_vec.len() + 1));
            params_vec.push(Box::new(group.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!(
            "SELECT COUNT(*) FROM ingredients i JOIN ingredient_groups g ON g.id = i.group_id {}",
            where_clause
        );
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let total: i64 = conn.query_row(&count_sql, params_refs.as_slice(), |row| row.get(0))?;

        let sql = format!(
            r#"
            SELECT i.*, g.name AS group_name, g.color AS group_color
            FROM ingredients i
            JOIN ingredient_groups g ON g.id = i.group_id
            {}
            ORDER BY {}, i.id ASC
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
        let items = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok(IngredientListItem {
                    ingredient: Self::from_row(row)?,
                    group_name: row.get("group_name")?,
                    group_color: row.get("group_color")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IngredientPage { items, total })
    }

    pub fn update(conn: &Connection, id: i64, data: &IngredientUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident, $col:expr) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        add_update!(group_id, "group_id");
        add_update!(calories, "calories");
        add_update!(protein, "protein");
        add_update!(carbs, "carbs");
        add_update!(fat, "fat");
        add_update!(price, "price");
        add_update!(notes, "notes");

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        if let Some(unit) = data.unit_type {
            updates.push(format!("unit_type = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(unit.as_str()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());
        let sql = format!(
            "UPDATE ingredients SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Names of library meals that use this ingredient
    pub fn used_in_meals(conn: &Connection, id: i64) -> DbResult<Vec<String>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT m.name FROM meals m
            JOIN meal_ingredients mi ON mi.meal_id = m.id
            WHERE mi.ingredient_id = ?1
            ORDER BY m.name
            "#,
        )?;
        let names = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Delete an ingredient. Diary items keep their snapshot and lose the
    /// link; library meals block the delete with a foreign key error.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_conn;
    use crate::filter::SortOrder;

    fn group(conn: &Connection, name: &str) -> i64 {
        conn.execute("INSERT INTO ingredient_groups (name) VALUES (?1)", [name])
            .unwrap();
        conn.last_insert_rowid()
    }

    fn ingredient(conn: &Connection, group_id: i64, name: &str, calories: f64) -> Ingredient {
        Ingredient::create(
            conn,
            &IngredientCreate {
                group_id,
                name: name.to_string(),
                unit_type: UnitType::Per100g,
                calories,
                protein: 1.0,
                carbs: 2.0,
                fat: 3.0,
                price: None,
                notes: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let conn = test_conn();
        let g = group(&conn, "Proteins");
        let created = ingredient(&conn, g, " Chicken breast ", 165.0);
        assert_eq!(created.name, "Chicken breast");
        assert_eq!(created.unit_type, UnitType::Per100g);

        let fetched = Ingredient::get_by_id(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(Ingredient::get_by_id(&conn, 999).unwrap().is_none());
    }

    #[test]
    fn test_list_filters_by_group_and_search() {
        let conn = test_conn();
        let proteins = group(&conn, "Proteins");
        let grains = group(&conn, "Grains");
        ingredient(&conn, proteins, "Chicken breast", 165.0);
        ingredient(&conn, proteins, "Chicken thigh", 209.0);
        ingredient(&conn, proteins, "Tofu", 76.0);
        ingredient(&conn, grains, "Rice", 130.0);

        let filter = FilterState::<IngredientSort>::parse("?group=Proteins&order=desc&orderBy=calories");
        let page = Ingredient::list(&conn, &filter).unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<&str> = page.items.iter().map(|i| i.ingredient.name.as_str()).collect();
        assert_eq!(names, vec!["Chicken thigh", "Chicken breast", "Tofu"]);
        assert_eq!(page.items[0].group_name, "Proteins");

        let filter = filter.on_search_change("chick");
        let page = Ingredient::list(&conn, &filter).unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_list_pages_and_counts_whole_set() {
        let conn = test_conn();
        let g = group(&conn, "Misc");
        for i in 0..5 {
            ingredient(&conn, g, &format!("Item {}", i), 10.0);
        }
        let filter = FilterState::<IngredientSort>::default()
            .on_limit_change(2)
            .on_page_change(2);
        assert_eq!(filter.order, SortOrder::Asc);
        let page = Ingredient::list(&conn, &filter).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].ingredient.name, "Item 4");
    }

    #[test]
    fn test_list_deep_offset() {
        let conn = test_conn();
        let g = group(&conn, "Misc");
        ingredient(&conn, g, "Apple", 52.0);

        let filter = FilterState::<IngredientSort>::default().on_page_change(u64::MAX / 2);
        let page = Ingredient::list(&conn, &filter).unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items.is_empty());

        let filter = FilterState::<IngredientSort> {
            offset: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(Ingredient::list(&conn, &filter), Err(DbError::Invalid(_))));
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let conn = test_conn();
        let g = group(&conn, "Misc");
        ingredient(&conn, g, "100% juice", 45.0);
        ingredient(&conn, g, "Apple", 52.0);
        assert_eq!(Ingredient::search(&conn, "%", 10).unwrap().len(), 1);
        assert_eq!(Ingredient::search(&conn, "", 10).unwrap().len(), 2);
    }

    #[test]
    fn test_partial_update() {
        let conn = test_conn();
        let g = group(&conn, "Proteins");
        let egg = ingredient(&conn, g, "Egg", 155.0);
        let updated = Ingredient::update(
            &conn,
            egg.id,
            &IngredientUpdate {
                unit_type: Some(UnitType::PerPiece),
                calories: Some(78.0),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.unit_type, UnitType::PerPiece);
        assert_eq!(updated.nutrition.calories, 78.0);
        assert_eq!(updated.nutrition.protein, 1.0);
        assert_eq!(updated.name, "Egg");
    }

    #[test]
    fn test_get_many() {
        let conn = test_conn();
        let g = group(&conn, "Misc");
        let a = ingredient(&conn, g, "A", 1.0);
        let b = ingredient(&conn, g, "B", 2.0);
        let found = Ingredient::get_many(&conn, &[a.id, b.id, 999]).unwrap();
        assert_eq!(found.len(), 2);
        assert!(Ingredient::get_many(&conn, &[]).unwrap().is_empty());
    }
}
