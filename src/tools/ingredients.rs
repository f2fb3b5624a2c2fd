//! Ingredient tools

use serde::Serialize;

use crate::db::Database;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::filter::IngredientSort;
use crate::models::{
    Ingredient, IngredientCreate, IngredientGroup, IngredientListItem, IngredientUpdate,
};

use super::{require_name, require_non_negative, BrowseRequest, BrowseResponse, DeleteResponse};

const FIELDS: &[(&str, &str)] = &[("ingredients.name", "name")];

/// Full ingredient detail with where it is used
#[derive(Debug, Serialize)]
pub struct IngredientDetail {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub group_name: String,
    /// "g" or "pcs"
    pub amount_unit: &'static str,
    pub used_in_meals: Vec<String>,
}

fn validate_macros(values: &[(Option<f64>, &str)]) -> AppResult<()> {
    for (value, field) in values {
        if let Some(v) = value {
            require_non_negative(*v, field)?;
        }
    }
    Ok(())
}

fn validate_price(price: Option<f64>) -> AppResult<()> {
    match price {
        Some(p) if !p.is_finite() || p <= 0.0 => {
            Err(AppError::validation("price must be greater than 0").with_field("price"))
        }
        _ => Ok(()),
    }
}

fn require_group(db: &Database, group_id: i64) -> AppResult<()> {
    db.with_conn(|conn| IngredientGroup::get_by_id(conn, group_id))?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Ingredient group", group_id).with_field("group_id"))
}

pub fn add_ingredient(db: &Database, data: IngredientCreate) -> AppResult<Ingredient> {
    require_name(&data.name, "Ingredient")?;
    validate_macros(&[
        (Some(data.calories), "calories"),
        (Some(data.protein), "protein"),
        (Some(data.carbs), "carbs"),
        (Some(data.fat), "fat"),
    ])?;
    validate_price(data.price)?;
    require_group(db, data.group_id)?;

    let ingredient = db
        .with_conn(|conn| Ingredient::create(conn, &data))
        .map_err(|e| AppError::from_store(e, FIELDS))?;
    tracing::info!(id = ingredient.id, name = %ingredient.name, "created ingredient");
    Ok(ingredient)
}

pub fn get_ingredient(db: &Database, id: i64) -> AppResult<IngredientDetail> {
    db.with_conn(|conn| {
        let Some(ingredient) = Ingredient::get_by_id(conn, id)? else {
            return Ok(None);
        };
        let group_name = IngredientGroup::get_by_id(conn, ingredient.group_id)?
            .map(|g| g.name)
            .unwrap_or_default();
        let used_in_meals = Ingredient::used_in_meals(conn, id)?;
        Ok(Some(IngredientDetail {
            amount_unit: ingredient.unit_type.amount_unit(),
            ingredient,
            group_name,
            used_in_meals,
        }))
    })?
    .ok_or_else(|| AppError::not_found("Ingredient", id))
}

pub fn update_ingredient(db: &Database, id: i64, data: IngredientUpdate) -> AppResult<Ingredient> {
    if let Some(ref name) = data.name {
        require_name(name, "Ingredient")?;
    }
    validate_macros(&[
        (data.calories, "calories"),
        (data.protein, "protein"),
        (data.carbs, "carbs"),
        (data.fat, "fat"),
    ])?;
    validate_price(data.price)?;
    if let Some(group_id) = data.group_id {
        require_group(db, group_id)?;
    }

    db.with_conn(|conn| Ingredient::update(conn, id, &data))
        .map_err(|e| AppError::from_store(e, FIELDS))?
        .ok_or_else(|| AppError::not_found("Ingredient", id))
}

pub fn delete_ingredient(db: &Database, id: i64) -> AppResult<DeleteResponse> {
    let used_in = db.with_conn(|conn| Ingredient::used_in_meals(conn, id))?;
    if !used_in.is_empty() {
        return Err(AppError::new(
            ErrorKind::ForeignKeyViolation,
            format!("Ingredient is used in meals: {}", used_in.join(", ")),
        ));
    }

    let deleted = db.with_conn(|conn| Ingredient::delete(conn, id))?;
    if !deleted {
        return Err(AppError::not_found("Ingredient", id));
    }
    tracing::info!(id, "deleted ingredient");
    Ok(DeleteResponse { success: true, deleted_id: id })
}

#[derive(Debug, Serialize)]
pub struct SearchIngredientsResponse {
    pub items: Vec<Ingredient>,
    pub total: usize,
}

/// Name search outside the list state, capped at `limit` (1..=100)
pub fn search_ingredients(db: &Database, query: &str, limit: u32) -> AppResult<SearchIngredientsResponse> {
    let limit = i64::from(limit.clamp(1, crate::filter::MAX_LIMIT));
    let items = db.with_conn(|conn| Ingredient::search(conn, query, limit))?;
    Ok(SearchIngredientsResponse {
        total: items.len(),
        items,
    })
}

/// Browse the ingredient list; group filter is a group name
pub fn browse_ingredients(db: &Database, request: &BrowseRequest) -> AppResult<BrowseResponse<IngredientListItem>> {
    let state = request.resolve::<IngredientSort>()?;
    let page = db.with_conn(|conn| Ingredient::list(conn, &state))?;
    Ok(BrowseResponse::new(&state, page.total, page.items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngredientGroupCreate, MealCreate, MealLineInput, Meal};
    use crate::nutrition::UnitType;
    use crate::tools::ingredient_groups::create_ingredient_group;
    use crate::tools::test_support::test_db;

    fn group(db: &Database, name: &str) -> i64 {
        create_ingredient_group(
            db,
            IngredientGroupCreate {
                name: name.into(),
                color: None,
            },
        )
        .unwrap()
        .id
    }

    fn data(group_id: i64, name: &str, calories: f64) -> IngredientCreate {
        IngredientCreate {
            group_id,
            name: name.into(),
            unit_type: UnitType::Per100g,
            calories,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            price: None,
            notes: None,
        }
    }

    #[test]
    fn test_add_validates_input() {
        let (_dir, db) = test_db();
        let g = group(&db, "Misc");

        let err = add_ingredient(&db, data(g, "  ", 10.0)).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("name"));

        let err = add_ingredient(&db, data(g, "Bad", -1.0)).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("calories"));

        let err = add_ingredient(&db, IngredientCreate { price: Some(0.0), ..data(g, "Free", 1.0) }).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("price"));

        let err = add_ingredient(&db, data(999, "Orphan", 1.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.field.as_deref(), Some("group_id"));
    }

    #[test]
    fn test_duplicate_name_maps_to_field() {
        let (_dir, db) = test_db();
        let g = group(&db, "Misc");
        add_ingredient(&db, data(g, "Salt", 0.0)).unwrap();
        let err = add_ingredient(&db, data(g, "Salt", 0.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UniqueViolation);
        assert_eq!(err.field.as_deref(), Some("name"));
        assert_eq!(err.message, "Name already exists");
    }

    #[test]
    fn test_browse_echoes_query() {
        let (_dir, db) = test_db();
        let proteins = group(&db, "Proteins");
        let grains = group(&db, "Grains");
        add_ingredient(&db, data(proteins, "Chicken", 165.0)).unwrap();
        add_ingredient(&db, data(proteins, "Beef", 250.0)).unwrap();
        add_ingredient(&db, data(grains, "Rice", 130.0)).unwrap();

        let response = browse_ingredients(
            &db,
            &BrowseRequest::from_query("?group=Proteins&order=desc&orderBy=calories"),
        )
        .unwrap();
        assert_eq!(response.query, "group=Proteins&order=desc&orderBy=calories");
        assert_eq!(response.total, 2);
        assert_eq!(response.items[0].ingredient.name, "Beef");

        let response = browse_ingredients(
            &db,
            &BrowseRequest {
                query: Some(response.query),
                group: Some("All".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(response.query, "order=desc&orderBy=calories");
        assert_eq!(response.total, 3);
    }

    #[test]
    fn test_delete_blocked_by_meal() {
        let (_dir, db) = test_db();
        let g = group(&db, "Misc");
        let oats = add_ingredient(&db, data(g, "Oats", 389.0)).unwrap();
        db.with_conn(|conn| {
            let meal = Meal::create(conn, &MealCreate { name: "Porridge".into(), description: None, tag_ids: vec![] })?;
            Meal::set_ingredients(conn, meal.id, &[MealLineInput { ingredient_id: oats.id, amount: 50.0 }])
        })
        .unwrap();

        let err = delete_ingredient(&db, oats.id).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ForeignKeyViolation);
        assert!(err.message.contains("Porridge"));

        let detail = get_ingredient(&db, oats.id).unwrap();
        assert_eq!(detail.group_name, "Misc");
        assert_eq!(detail.used_in_meals, vec!["Porridge".to_string()]);
    }

    #[test]
    fn test_update_and_missing() {
        let (_dir, db) = test_db();
        let g = group(&db, "Misc");
        let egg = add_ingredient(&db, data(g, "Egg", 155.0)).unwrap();
        let updated = update_ingredient(
            &db,
            egg.id,
            IngredientUpdate {
                unit_type: Some(UnitType::PerPiece),
                calories: Some(78.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.unit_type, UnitType::PerPiece);
        assert_eq!(
            update_ingredient(&db, 999, IngredientUpdate::default()).unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert_eq!(get_ingredient(&db, 999).unwrap_err().kind, ErrorKind::NotFound);
    }
}
