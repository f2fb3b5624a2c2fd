//! Nutrition goal tools

use crate::db::Database;
use crate::error::AppResult;
use crate::models::{NutritionGoals, NutritionValue};

use super::require_non_negative;

/// Current goals, `None` until they are set
pub fn get_goals(db: &Database) -> AppResult<Option<NutritionGoals>> {
    Ok(db.with_conn(NutritionGoals::get)?)
}

pub fn set_goals(db: &Database, targets: NutritionValue) -> AppResult<NutritionGoals> {
    require_non_negative(targets.calories, "calories")?;
    require_non_negative(targets.protein, "protein")?;
    require_non_negative(targets.carbs, "carbs")?;
    require_non_negative(targets.fat, "fat")?;

    let goals = db.with_conn(|conn| NutritionGoals::set(conn, &targets))?;
    tracing::info!(calories = goals.targets.calories, "updated nutrition goals");
    Ok(goals)
}
