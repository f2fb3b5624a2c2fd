//! Meal tag tools

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{MealTag, MealTagCreate, MealTagUpdate};

use super::{require_name, DeleteResponse};

const FIELDS: &[(&str, &str)] = &[("meal_tags.name", "name")];

pub fn create_meal_tag(db: &Database, data: MealTagCreate) -> AppResult<MealTag> {
    require_name(&data.name, "Tag")?;
    db.with_conn(|conn| MealTag::create(conn, &data))
        .map_err(|e| AppError::from_store(e, FIELDS))
}

pub fn list_meal_tags(db: &Database) -> AppResult<Vec<MealTag>> {
    Ok(db.with_conn(MealTag::list)?)
}

pub fn update_meal_tag(db: &Database, id: i64, data: MealTagUpdate) -> AppResult<MealTag> {
    if let Some(ref name) = data.name {
        require_name(name, "Tag")?;
    }
    db.with_conn(|conn| MealTag::update(conn, id, &data))
        .map_err(|e| AppError::from_store(e, FIELDS))?
        .ok_or_else(|| AppError::not_found("Meal tag", id))
}

pub fn delete_meal_tag(db: &Database, id: i64) -> AppResult<DeleteResponse> {
    if !db.with_conn(|conn| MealTag::delete(conn, id))? {
        return Err(AppError::not_found("Meal tag", id));
    }
    Ok(DeleteResponse { success: true, deleted_id: id })
}
