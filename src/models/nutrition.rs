//! Shared nutrition data structure
//!
//! Used across ingredients, meals, diary items and goals.

use serde::{Deserialize, Serialize};

/// Round to two decimal places.
///
/// Applied after every arithmetic step so repeated aggregation is stable.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Macro values: calories (kcal), protein/carbs/fat (grams)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionValue {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutritionValue {
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self { calories, protein, carbs, fat }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale by a multiplier, rounding each field
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories: round2(self.calories * multiplier),
            protein: round2(self.protein * multiplier),
            carbs: round2(self.carbs * multiplier),
            fat: round2(self.fat * multiplier),
        }
    }

    /// Element-wise sum, rounding each field
    pub fn add(&self, other: &NutritionValue) -> Self {
        Self {
            calories: round2(self.calories + other.calories),
            protein: round2(self.protein + other.protein),
            carbs: round2(self.carbs + other.carbs),
            fat: round2(self.fat + other.fat),
        }
    }

    pub fn is_non_negative(&self) -> bool {
        self.calories >= 0.0 && self.protein >= 0.0 && self.carbs >= 0.0 && self.fat >= 0.0
    }
}

impl std::ops::Add for NutritionValue {
    type Output = NutritionValue;

    fn add(self, other: NutritionValue) -> NutritionValue {
        NutritionValue::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for NutritionValue {
    type Output = NutritionValue;

    fn mul(self, multiplier: f64) -> NutritionValue {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for NutritionValue {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(NutritionValue::zero(), |acc, n| acc + n)
    }
}
