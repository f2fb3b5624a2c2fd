//! Ingredient unit types
//!
//! An ingredient declares its macros per 100 g, per kg or per piece. Logged
//! amounts are grams for the weight units and a piece count otherwise.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Grams in the reference quantity of `per_100g`
pub const GRAMS_PER_HUNDRED: f64 = 100.0;

/// Grams in the reference quantity of `per_kg`
pub const GRAMS_PER_KG: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    #[default]
    #[serde(rename = "per_100g")]
    Per100g,
    PerKg,
    PerPiece,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Per100g => "per_100g",
            UnitType::PerKg => "per_kg",
            UnitType::PerPiece => "per_piece",
        }
    }

    /// Label for the logged amount
    pub fn amount_unit(&self) -> &'static str {
        match self {
            UnitType::Per100g | UnitType::PerKg => "g",
            UnitType::PerPiece => "pcs",
        }
    }

    /// Multiplier applied to per-unit macros for a logged amount
    pub fn multiplier(&self, amount: f64) -> f64 {
        match self {
            UnitType::Per100g => amount / GRAMS_PER_HUNDRED,
            UnitType::PerKg => amount / GRAMS_PER_KG,
            UnitType::PerPiece => amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown unit type: {0}")]
pub struct UnknownUnitType(pub String);

impl FromStr for UnitType {
    type Err = UnknownUnitType;

    /// Accepts the stored names plus short and hyphenated spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "per_100g" | "100g" => Ok(UnitType::Per100g),
            "per_kg" | "kg" => Ok(UnitType::PerKg),
            "per_piece" | "piece" | "pieces" | "count" => Ok(UnitType::PerPiece),
            _ => Err(UnknownUnitType(s.to_string())),
        }
    }
}
