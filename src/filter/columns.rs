//! Sortable columns per list

use super::SortColumn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngredientSort {
    Name,
    Calories,
    Protein,
    Carbs,
    Fat,
    Price,
    CreatedAt,
}

impl SortColumn for IngredientSort {
    const DEFAULT: Self = IngredientSort::Name;

    fn all() -> &'static [Self] {
        &[
            IngredientSort::Name,
            IngredientSort::Calories,
            IngredientSort::Protein,
            IngredientSort::Carbs,
            IngredientSort::Fat,
            IngredientSort::Price,
            IngredientSort::CreatedAt,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            IngredientSort::Name => "name",
            IngredientSort::Calories => "calories",
            IngredientSort::Protein => "protein",
            IngredientSort::Carbs => "carbs",
            IngredientSort::Fat => "fat",
            IngredientSort::Price => "price",
            IngredientSort::CreatedAt => "created_at",
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            IngredientSort::Name => "i.name COLLATE NOCASE",
            IngredientSort::Calories => "i.calories",
            IngredientSort::Protein => "i.protein",
            IngredientSort::Carbs => "i.carbs",
            IngredientSort::Fat => "i.fat",
            IngredientSort::Price => "i.price",
            IngredientSort::CreatedAt => "i.created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealSort {
    Name,
    CreatedAt,
    UpdatedAt,
}

impl SortColumn for MealSort {
    const DEFAULT: Self = MealSort::Name;

    fn all() -> &'static [Self] {
        &[MealSort::Name, MealSort::CreatedAt, MealSort::UpdatedAt]
    }

    fn as_str(&self) -> &'static str {
        match self {
            MealSort::Name => "name",
            MealSort::CreatedAt => "created_at",
            MealSort::UpdatedAt => "updated_at",
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            MealSort::Name => "m.name COLLATE NOCASE",
            MealSort::CreatedAt => "m.created_at",
            MealSort::UpdatedAt => "m.updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementSort {
    MeasuredAt,
    Value,
    Name,
}

impl SortColumn for MeasurementSort {
    const DEFAULT: Self = MeasurementSort::MeasuredAt;

    fn all() -> &'static [Self] {
        &[
            MeasurementSort::MeasuredAt,
            MeasurementSort::Value,
            MeasurementSort::Name,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            MeasurementSort::MeasuredAt => "measured_at",
            MeasurementSort::Value => "value",
            MeasurementSort::Name => "name",
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            MeasurementSort::MeasuredAt => "m.measured_at",
            MeasurementSort::Value => "m.value",
            MeasurementSort::Name => "t.name COLLATE NOCASE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_names_round_trip<C: SortColumn>() {
        for column in C::all() {
            assert_eq!(C::parse(column.as_str()), Some(*column));
        }
        assert!(C::all().contains(&C::DEFAULT));
    }

    #[test]
    fn test_column_names_round_trip() {
        assert_names_round_trip::<IngredientSort>();
        assert_names_round_trip::<MealSort>();
        assert_names_round_trip::<MeasurementSort>();
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        assert_eq!(IngredientSort::parse("name; DROP TABLE ingredients"), None);
        assert_eq!(MealSort::parse("calories"), None);
    }
}
