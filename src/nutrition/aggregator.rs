//! Nutrition aggregation
//!
//! Reduces line items into per-meal and per-day totals and compares the day
//! against goals. Pure and total: missing values count as zero and nothing
//! here returns an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{round2, Ingredient, NutritionValue};

/// A line item with totals already multiplied out for its amount
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub total_calories: Option<f64>,
    pub total_protein: Option<f64>,
    pub total_carbs: Option<f64>,
    pub total_fat: Option<f64>,
}

impl LineItem {
    pub fn from_totals(totals: NutritionValue) -> Self {
        Self {
            total_calories: Some(totals.calories),
            total_protein: Some(totals.protein),
            total_carbs: Some(totals.carbs),
            total_fat: Some(totals.fat),
        }
    }

    fn totals(&self) -> NutritionValue {
        NutritionValue::new(
            self.total_calories.unwrap_or(0.0),
            self.total_protein.unwrap_or(0.0),
            self.total_carbs.unwrap_or(0.0),
            self.total_fat.unwrap_or(0.0),
        )
    }
}

/// A meal as seen by the aggregator. `id` is `None` until persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealInput {
    pub id: Option<i64>,
    pub name: String,
    pub meal_order: i64,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealNutrition {
    /// Persisted id, or `temp-<order>` for a meal not saved yet
    pub meal_id: String,
    pub meal_name: String,
    pub meal_order: i64,
    #[serde(flatten)]
    pub nutrition: NutritionValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutrientProgress {
    pub consumed: f64,
    pub goal: f64,
    pub remaining: f64,
    /// `inf` or `NaN` when the goal is zero (serialized as `null`)
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutritionProgress {
    pub calories: NutrientProgress,
    pub protein: NutrientProgress,
    pub carbs: NutrientProgress,
    pub fat: NutrientProgress,
}

/// Pre-multiplied totals for `amount` of an ingredient
pub fn line_totals(ingredient: &Ingredient, amount: f64) -> NutritionValue {
    ingredient
        .nutrition
        .scale(ingredient.unit_type.multiplier(amount))
}

/// Sum a meal's line items, rounding the running sum after every addition
pub fn calculate_meal_nutrition(meal: &MealInput) -> MealNutrition {
    let nutrition = meal
        .items
        .iter()
        .fold(NutritionValue::zero(), |acc, item| acc.add(&item.totals()));

    MealNutrition {
        meal_id: meal
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("temp-{}", meal.meal_order)),
        meal_name: meal.name.clone(),
        meal_order: meal.meal_order,
        nutrition,
    }
}

/// Element-wise sum over meal totals, same rounding discipline
pub fn daily_nutrition(meals: &[MealNutrition]) -> NutritionValue {
    meals
        .iter()
        .fold(NutritionValue::zero(), |acc, m| acc.add(&m.nutrition))
}

fn nutrient_progress(consumed: f64, goal: f64) -> NutrientProgress {
    NutrientProgress {
        consumed,
        goal,
        remaining: round2((goal - consumed).max(0.0)),
        percentage: (consumed / goal * 100.0).round(),
    }
}

pub fn nutrition_progress(consumed: &NutritionValue, goals: &NutritionValue) -> NutritionProgress {
    NutritionProgress {
        calories: nutrient_progress(consumed.calories, goals.calories),
        protein: nutrient_progress(consumed.protein, goals.protein),
        carbs: nutrient_progress(consumed.carbs, goals.carbs),
        fat: nutrient_progress(consumed.fat, goals.fat),
    }
}

/// Derived view over one day's meals.
///
/// Built in one pass from its inputs; callers construct a new one when the
/// meals or ingredient list change.
pub struct NutritionAggregator<'a> {
    ingredient_index: HashMap<i64, &'a Ingredient>,
    meal_nutrition: Vec<MealNutrition>,
    daily: NutritionValue,
}

impl<'a> NutritionAggregator<'a> {
    pub fn new(meals: &[MealInput], available_ingredients: &'a [Ingredient]) -> Self {
        let ingredient_index = available_ingredients.iter().map(|i| (i.id, i)).collect();
        let meal_nutrition: Vec<MealNutrition> =
            meals.iter().map(calculate_meal_nutrition).collect();
        let daily = daily_nutrition(&meal_nutrition);

        Self {
            ingredient_index,
            meal_nutrition,
            daily,
        }
    }

    pub fn ingredient(&self, id: i64) -> Option<&'a Ingredient> {
        self.ingredient_index.get(&id).copied()
    }

    pub fn meal_nutrition(&self) -> &[MealNutrition] {
        &self.meal_nutrition
    }

    pub fn daily_nutrition(&self) -> NutritionValue {
        self.daily
    }

    pub fn progress(&self, goals: &NutritionValue) -> NutritionProgress {
        nutrition_progress(&self.daily, goals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::UnitType;

    fn item(c: Option<f64>, p: Option<f64>, cb: Option<f64>, f: Option<f64>) -> LineItem {
        LineItem {
            total_calories: c,
            total_protein: p,
            total_carbs: cb,
            total_fat: f,
        }
    }

    fn meal(id: Option<i64>, order: i64, items: Vec<LineItem>) -> MealInput {
        MealInput {
            id,
            name: format!("Meal {}", order),
            meal_order: order,
            items,
        }
    }

    #[test]
    fn test_missing_macros_count_as_zero() {
        let m = meal(Some(1), 0, vec![item(Some(100.0), None, None, None)]);
        let result = calculate_meal_nutrition(&m);
        assert_eq!(result.nutrition, NutritionValue::new(100.0, 0.0, 0.0, 0.0));
        assert_eq!(result.meal_id, "1");
    }

    #[test]
    fn test_unsaved_meal_gets_placeholder_id() {
        let m = meal(None, 3, vec![]);
        let result = calculate_meal_nutrition(&m);
        assert_eq!(result.meal_id, "temp-3");
        assert_eq!(result.meal_order, 3);
        assert_eq!(result.nutrition, NutritionValue::zero());
    }

    #[test]
    fn test_two_meal_day() {
        let meals = vec![
            meal(Some(1), 0, vec![item(Some(250.0), Some(20.0), None, None)]),
            meal(
                Some(2),
                1,
                vec![
                    item(Some(100.0), None, Some(10.0), None),
                    item(Some(50.0), None, None, Some(5.0)),
                ],
            ),
        ];
        let aggregator = NutritionAggregator::new(&meals, &[]);
        assert_eq!(
            aggregator.daily_nutrition(),
            NutritionValue::new(400.0, 20.0, 10.0, 5.0)
        );
        let names: Vec<&str> = aggregator
            .meal_nutrition()
            .iter()
            .map(|m| m.meal_name.as_str())
            .collect();
        assert_eq!(names, vec!["Meal 0", "Meal 1"]);
    }

    #[test]
    fn test_meal_order_is_preserved_not_sorted() {
        let meals = vec![meal(Some(9), 5, vec![]), meal(Some(4), 1, vec![])];
        let aggregator = NutritionAggregator::new(&meals, &[]);
        let orders: Vec<i64> = aggregator.meal_nutrition().iter().map(|m| m.meal_order).collect();
        assert_eq!(orders, vec![5, 1]);
    }

    #[test]
    fn test_daily_equals_sum_of_meals() {
        let meals = vec![
            meal(Some(1), 0, vec![item(Some(10.11), Some(1.01), Some(2.02), Some(0.33))]),
            meal(Some(2), 1, vec![item(Some(20.22), Some(3.03), None, Some(0.67))]),
            meal(Some(3), 2, vec![item(Some(0.07), None, Some(4.44), None)]),
        ];
        let aggregator = NutritionAggregator::new(&meals, &[]);
        let summed: NutritionValue = aggregator
            .meal_nutrition()
            .iter()
            .map(|m| m.nutrition)
            .sum();
        let daily = aggregator.daily_nutrition();
        assert!((summed.calories - daily.calories).abs() < 1e-9);
        assert!((summed.protein - daily.protein).abs() < 1e-9);
        assert!((summed.carbs - daily.carbs).abs() < 1e-9);
        assert!((summed.fat - daily.fat).abs() < 1e-9);
    }

    #[test]
    fn test_rounding_after_each_step_matches_rounding_once() {
        let values = [0.1, 0.2, 0.3, 1.15, 2.05, 7.99, 0.01, 12.34];
        let items: Vec<LineItem> = values
            .iter()
            .map(|v| item(Some(*v), Some(*v), Some(*v), Some(*v)))
            .collect();
        let stepwise = calculate_meal_nutrition(&meal(Some(1), 0, items)).nutrition;
        let once = round2(values.iter().sum::<f64>());
        assert_eq!(stepwise.calories, once);
        assert_eq!(stepwise.fat, once);
    }

    #[test]
    fn test_progress_against_goal() {
        let consumed = NutritionValue::new(1500.0, 90.0, 200.0, 80.0);
        let goals = NutritionValue::new(2000.0, 150.0, 250.0, 70.0);
        let progress = nutrition_progress(&consumed, &goals);
        assert_eq!(
            progress.calories,
            NutrientProgress {
                consumed: 1500.0,
                goal: 2000.0,
                remaining: 500.0,
                percentage: 75.0,
            }
        );
        assert_eq!(progress.protein.percentage, 60.0);
        // Over goal: remaining clamps to zero, percentage keeps going
        assert_eq!(progress.fat.remaining, 0.0);
        assert_eq!(progress.fat.percentage, 114.0);
    }

    #[test]
    fn test_progress_zero_goal_is_not_guarded() {
        let consumed = NutritionValue::new(100.0, 0.0, 0.0, 0.0);
        let goals = NutritionValue::zero();
        let progress = nutrition_progress(&consumed, &goals);
        assert!(progress.calories.percentage.is_infinite());
        assert!(progress.protein.percentage.is_nan());

        let json = serde_json::to_value(&progress).unwrap();
        assert!(json["calories"]["percentage"].is_null());
    }

    #[test]
    fn test_line_totals_and_index() {
        let chicken = Ingredient {
            id: 7,
            group_id: 1,
            name: "Chicken breast".into(),
            unit_type: UnitType::Per100g,
            nutrition: NutritionValue::new(165.0, 31.0, 0.0, 3.6),
            price: None,
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(
            line_totals(&chicken, 150.0),
            NutritionValue::new(247.5, 46.5, 0.0, 5.4)
        );

        let ingredients = vec![chicken];
        let aggregator = NutritionAggregator::new(&[], &ingredients);
        assert_eq!(aggregator.ingredient(7).map(|i| i.name.as_str()), Some("Chicken breast"));
        assert!(aggregator.ingredient(8).is_none());
    }
}
