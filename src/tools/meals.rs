//! Meal library tools

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::filter::MealSort;
use crate::models::{Meal, MealCreate, MealDetail, MealLineInput, MealListItem, MealTag, MealUpdate};

use super::{require_name, require_positive, BrowseRequest, BrowseResponse, DeleteResponse};

const FIELDS: &[(&str, &str)] = &[("meals.name", "name")];

fn require_tags(db: &Database, tag_ids: &[i64]) -> AppResult<()> {
    for &tag_id in tag_ids {
        if db.with_conn(|conn| MealTag::get_by_id(conn, tag_id))?.is_none() {
            return Err(AppError::not_found("Meal tag", tag_id).with_field("tag_ids"));
        }
    }
    Ok(())
}

fn detail(db: &Database, id: i64) -> AppResult<MealDetail> {
    db.with_conn(|conn| Meal::get_detail(conn, id))?
        .ok_or_else(|| AppError::not_found("Meal", id))
}

pub fn create_meal(db: &Database, data: MealCreate) -> AppResult<MealDetail> {
    require_name(&data.name, "Meal")?;
    require_tags(db, &data.tag_ids)?;

    let meal = db
        .with_tx(|tx| Meal::create(tx, &data))
        .map_err(|e| AppError::from_store(e, FIELDS))?;
    tracing::info!(id = meal.id, name = %meal.name, "created meal");
    detail(db, meal.id)
}

pub fn get_meal(db: &Database, id: i64) -> AppResult<MealDetail> {
    detail(db, id)
}

pub fn update_meal(db: &Database, id: i64, data: MealUpdate) -> AppResult<MealDetail> {
    if let Some(ref name) = data.name {
        require_name(name, "Meal")?;
    }
    db.with_conn(|conn| Meal::update(conn, id, &data))
        .map_err(|e| AppError::from_store(e, FIELDS))?
        .ok_or_else(|| AppError::not_found("Meal", id))?;
    detail(db, id)
}

/// Replace a meal's ingredient lines in one transaction
pub fn set_meal_ingredients(db: &Database, meal_id: i64, lines: Vec<MealLineInput>) -> AppResult<MealDetail> {
    for line in &lines {
        require_positive(line.amount, "amount")?;
    }
    if db.with_conn(|conn| Meal::get_by_id(conn, meal_id))?.is_none() {
        return Err(AppError::not_found("Meal", meal_id));
    }

    db.with_tx(|tx| Meal::set_ingredients(tx, meal_id, &lines))
        .map_err(|e| AppError::from(e).with_field("ingredients"))?;
    detail(db, meal_id)
}

pub fn set_meal_tags(db: &Database, meal_id: i64, tag_ids: Vec<i64>) -> AppResult<MealDetail> {
    require_tags(db, &tag_ids)?;
    if db.with_conn(|conn| Meal::get_by_id(conn, meal_id))?.is_none() {
        return Err(AppError::not_found("Meal", meal_id));
    }
    db.with_tx(|tx| Meal::set_tags(tx, meal_id, &tag_ids))?;
    detail(db, meal_id)
}

pub fn delete_meal(db: &Database, id: i64) -> AppResult<DeleteResponse> {
    if !db.with_conn(|conn| Meal::delete(conn, id))? {
        return Err(AppError::not_found("Meal", id));
    }
    tracing::info!(id, "deleted meal");
    Ok(DeleteResponse { success: true, deleted_id: id })
}

/// Browse the meal library; group filter is a tag name
pub fn browse_meals(db: &Database, request: &BrowseRequest) -> AppResult<BrowseResponse<MealListItem>> {
    let state = request.resolve::<MealSort>()?;
    let page = db.with_conn(|conn| Meal::list(conn, &state))?;
    Ok(BrowseResponse::new(&state, page.total, page.items))
}
