//! Food diary tools
//!
//! Reads go through the nutrition aggregator so every day view carries
//! per-meal totals, the daily total and, when goals are set, progress.

use serde::Serialize;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{
    DiaryEntry, DiaryItem, DiaryMeal, DiaryMealUpdate, DiaryMealWithItems, Ingredient,
    NutritionGoals, NutritionValue,
};
use crate::nutrition::{MealNutrition, NutritionAggregator, NutritionProgress};

use super::{require_date, require_name, require_positive, DeleteResponse};

#[derive(Debug, Serialize)]
pub struct DayMealView {
    #[serde(flatten)]
    pub meal: DiaryMealWithItems,
    pub nutrition: MealNutrition,
}

/// A date as the diary page shows it
#[derive(Debug, Serialize)]
pub struct DayView {
    pub date: String,
    pub entry_id: Option<i64>,
    pub notes: Option<String>,
    pub meals: Vec<DayMealView>,
    pub daily: NutritionValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<NutritionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<NutritionProgress>,
}

#[derive(Debug, Serialize)]
pub struct DayTotals {
    pub date: String,
    pub meal_count: usize,
    pub item_count: usize,
    pub nutrition: NutritionValue,
}

#[derive(Debug, Serialize)]
pub struct ListDaysResponse {
    pub days: Vec<DayTotals>,
    pub count: usize,
    pub average: NutritionValue,
}

/// Day view for a date; a date with nothing logged is an empty day
pub fn get_day(db: &Database, date: &str) -> AppResult<DayView> {
    let date = require_date(date)?;
    let (day, ingredients, goals) = db.with_conn(|conn| {
        let day = DiaryEntry::load_day(conn, &date)?;
        let ingredients = match &day {
            Some(day) => Ingredient::get_many(conn, &day.ingredient_ids())?,
            None => Vec::new(),
        };
        let goals = NutritionGoals::get(conn)?;
        Ok((day, ingredients, goals))
    })?;

    let Some(day) = day else {
        let daily = NutritionValue::zero();
        return Ok(DayView {
            date,
            entry_id: None,
            notes: None,
            meals: Vec::new(),
            daily,
            goals: goals.map(|g| g.targets),
            progress: goals.map(|g| crate::nutrition::nutrition_progress(&daily, &g.targets)),
        });
    };

    let inputs = day.to_meal_inputs();
    let aggregator = NutritionAggregator::new(&inputs, &ingredients);
    let meals = day
        .meals
        .into_iter()
        .zip(aggregator.meal_nutrition().iter().cloned())
        .map(|(meal, nutrition)| DayMealView { meal, nutrition })
        .collect();

    Ok(DayView {
        date,
        entry_id: Some(day.entry.id),
        notes: day.entry.notes,
        meals,
        daily: aggregator.daily_nutrition(),
        goals: goals.map(|g| g.targets),
        progress: goals.map(|g| aggregator.progress(&g.targets)),
    })
}

pub fn set_day_notes(db: &Database, date: &str, notes: Option<String>) -> AppResult<DiaryEntry> {
    let date = require_date(date)?;
    db.with_conn(|conn| {
        let entry = DiaryEntry::get_or_create(conn, &date)?;
        DiaryEntry::set_notes(conn, entry.id, notes.as_deref())
    })?
    .ok_or_else(|| AppError::not_found("Diary entry", &date))
}

pub fn add_diary_meal(db: &Database, date: &str, name: &str) -> AppResult<DiaryMeal> {
    let date = require_date(date)?;
    require_name(name, "Meal")?;
    Ok(db.with_tx(|tx| {
        let entry = DiaryEntry::get_or_create(tx, &date)?;
        DiaryMeal::add(tx, entry.id, name)
    })?)
}

/// Rename or reorder a diary meal
pub fn update_diary_meal(db: &Database, id: i64, data: DiaryMealUpdate) -> AppResult<DiaryMeal> {
    if let Some(ref name) = data.name {
        require_name(name, "Meal")?;
    }
    db.with_conn(|conn| DiaryMeal::update(conn, id, &data))?
        .ok_or_else(|| AppError::not_found("Diary meal", id))
}

pub fn delete_diary_meal(db: &Database, id: i64) -> AppResult<DeleteResponse> {
    if !db.with_conn(|conn| DiaryMeal::delete(conn, id))? {
        return Err(AppError::not_found("Diary meal", id));
    }
    Ok(DeleteResponse { success: true, deleted_id: id })
}

pub fn add_diary_item(db: &Database, diary_meal_id: i64, ingredient_id: i64, amount: f64) -> AppResult<DiaryItem> {
    require_positive(amount, "amount")?;
    db.with_conn(|conn| {
        let Some(_) = DiaryMeal::get_by_id(conn, diary_meal_id)? else {
            return Ok(Err(AppError::not_found("Diary meal", diary_meal_id)));
        };
        let Some(ingredient) = Ingredient::get_by_id(conn, ingredient_id)? else {
            return Ok(Err(AppError::not_found("Ingredient", ingredient_id).with_field("ingredient_id")));
        };
        DiaryItem::add(conn, diary_meal_id, &ingredient, amount).map(Ok)
    })?
}

pub fn update_diary_item(db: &Database, id: i64, amount: f64) -> AppResult<DiaryItem> {
    require_positive(amount, "amount")?;
    db.with_conn(|conn| DiaryItem::update_amount(conn, id, amount))?
        .ok_or_else(|| AppError::not_found("Diary item", id))
}

pub fn remove_diary_item(db: &Database, id: i64) -> AppResult<DeleteResponse> {
    if !db.with_conn(|conn| DiaryItem::delete(conn, id))? {
        return Err(AppError::not_found("Diary item", id));
    }
    Ok(DeleteResponse { success: true, deleted_id: id })
}

/// Copy a library meal into a date
pub fn log_meal(db: &Database, date: &str, meal_id: i64, name: Option<&str>) -> AppResult<DiaryMealWithItems> {
    let date = require_date(date)?;
    if let Some(name) = name {
        require_name(name, "Meal")?;
    }
    let logged = db
        .with_tx(|tx| DiaryMeal::log_library_meal(tx, &date, meal_id, name))?
        .ok_or_else(|| AppError::not_found("Meal", meal_id).with_field("meal_id"))?;
    tracing::info!(date = %date, meal_id, items = logged.items.len(), "logged library meal");
    Ok(logged)
}

/// Per-day totals between two dates inclusive; days without entries are skipped
pub fn list_days(db: &Database, start_date: &str, end_date: &str) -> AppResult<ListDaysResponse> {
    let start_date = require_date(start_date)?;
    let end_date = require_date(end_date)?;
    if start_date > end_date {
        return Err(AppError::validation("start_date must not be after end_date").with_field("start_date"));
    }

    let days = db.with_conn(|conn| {
        DiaryEntry::list_range(conn, &start_date, &end_date)?
            .into_iter()
            .map(|entry| DiaryEntry::load_entry(conn, entry))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let totals: Vec<DayTotals> = days
        .iter()
        .map(|day| {
            let inputs = day.to_meal_inputs();
            let aggregator = NutritionAggregator::new(&inputs, &[]);
            DayTotals {
                date: day.entry.entry_date.clone(),
                meal_count: day.meals.len(),
                item_count: day.meals.iter().map(|m| m.items.len()).sum(),
                nutrition: aggregator.daily_nutrition(),
            }
        })
        .collect();

    let average = if totals.is_empty() {
        NutritionValue::zero()
    } else {
        let sum: NutritionValue = totals.iter().map(|d| d.nutrition).sum();
        sum.scale(1.0 / totals.len() as f64)
    };

    Ok(ListDaysResponse {
        count: totals.len(),
        days: totals,
        average,
    })
}
