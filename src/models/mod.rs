//! Data models
//!
//! Rust structs representing database entities.

mod diary;
mod goal;
mod ingredient;
mod ingredient_group;
mod meal;
mod meal_tag;
mod measurement;
mod nutrition;

pub use diary::{DiaryDay, DiaryEntry, DiaryItem, DiaryMeal, DiaryMealUpdate, DiaryMealWithItems};
pub use goal::NutritionGoals;
pub use ingredient::{Ingredient, IngredientCreate, IngredientListItem, IngredientPage, IngredientUpdate};
pub use ingredient_group::{
    IngredientGroup, IngredientGroupCreate, IngredientGroupUpdate, IngredientGroupWithCount,
    DEFAULT_GROUP_COLOR,
};
pub use meal::{
    Meal, MealCreate, MealDetail, MealIngredientLine, MealLineInput, MealListItem, MealPage,
    MealUpdate,
};
pub use meal_tag::{MealTag, MealTagCreate, MealTagUpdate};
pub use measurement::{
    Measurement, MeasurementCreate, MeasurementPage, MeasurementType, MeasurementTypeCreate,
    MeasurementWithType,
};
pub use nutrition::{round2, NutritionValue};
