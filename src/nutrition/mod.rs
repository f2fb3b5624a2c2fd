//! Nutrition calculation module
//!
//! Handles nutrition aggregation and ingredient unit handling.

pub mod aggregator;
pub mod units;

pub use aggregator::{
    calculate_meal_nutrition, daily_nutrition, line_totals, nutrition_progress, LineItem,
    MealInput, MealNutrition, NutrientProgress, NutritionAggregator, NutritionProgress,
};
pub use units::{UnitType, UnknownUnitType};
