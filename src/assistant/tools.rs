//! Local data the assistant may ask for

use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::tools::{diary, goals, ingredients};

use super::client::ToolDefinition;

#[derive(Debug, Deserialize)]
struct DayArgs {
    date: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<u32>,
}

/// Executes assistant tool requests against the database
#[derive(Clone)]
pub struct AssistantTools {
    db: Database,
    search_limit: u32,
}

impl AssistantTools {
    pub fn new(db: Database, search_limit: u32) -> Self {
        Self { db, search_limit }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "get_day_summary",
                description: "Get the food diary for a date: meals, per-meal and daily calories/protein/carbs/fat, and progress against goals.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "date": {"type": "string", "description": "Date in YYYY-MM-DD format"}
                    },
                    "required": ["date"]
                }),
            },
            ToolDefinition {
                name: "search_ingredients",
                description: "Search the user's ingredient library by name. Macros are per 100 g, per kg or per piece depending on unit_type.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Part of the ingredient name"},
                        "limit": {"type": "integer", "minimum": 1, "maximum": 100}
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "get_goals",
                description: "Get the user's daily nutrition goals (calories, protein, carbs, fat). Returns null when none are set.",
                input_schema: json!({"type": "object", "properties": {}}),
            },
        ]
    }

    /// Run one tool; errors come back as text for the model to read
    pub fn execute(&self, name: &str, input: &Value) -> Result<String, String> {
        let result = match name {
            "get_day_summary" => parse::<DayArgs>(input)
                .and_then(|args| to_json(diary::get_day(&self.db, &args.date)?)),
            "search_ingredients" => parse::<SearchArgs>(input).and_then(|args| {
                let limit = args.limit.unwrap_or(self.search_limit);
                to_json(ingredients::search_ingredients(&self.db, &args.query, limit)?)
            }),
            "get_goals" => goals::get_goals(&self.db).and_then(to_json),
            other => Err(AppError::validation(format!("Unknown tool: {}", other))),
        };

        result.map_err(|e| {
            tracing::debug!(tool = name, error = %e, "assistant tool failed");
            format!("{}: {}", e.kind.code(), e.message)
        })
    }
}

fn parse<T: for<'de> Deserialize<'de>>(input: &Value) -> AppResult<T> {
    serde_json::from_value(input.clone())
        .map_err(|e| AppError::validation(format!("Invalid tool input: {}", e)))
}

fn to_json<T: serde::Serialize>(value: T) -> AppResult<String> {
    serde_json::to_string(&value).map_err(|e| AppError::server(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NutritionValue;
    use crate::tools::test_support::test_db;

    #[test]
    fn test_definitions_named() {
        let (_dir, db) = test_db();
        let tools = AssistantTools::new(db, 20);
        let names: Vec<_> = tools.definitions().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["get_day_summary", "search_ingredients", "get_goals"]);
    }

    #[test]
    fn test_execute_reads_local_data() {
        let (_dir, db) = test_db();
        goals::set_goals(&db, NutritionValue::new(2000.0, 150.0, 200.0, 60.0)).unwrap();
        let tools = AssistantTools::new(db, 20);

        let goals: Value = serde_json::from_str(&tools.execute("get_goals", &json!({})).unwrap()).unwrap();
        assert_eq!(goals["calories"], 2000.0);

        let day: Value =
            serde_json::from_str(&tools.execute("get_day_summary", &json!({"date": "2025-03-01"})).unwrap()).unwrap();
        assert_eq!(day["date"], "2025-03-01");
        assert_eq!(day["progress"]["calories"]["remaining"], 2000.0);

        let search: Value =
            serde_json::from_str(&tools.execute("search_ingredients", &json!({"query": "oat"})).unwrap()).unwrap();
        assert_eq!(search["total"], 0);
    }

    #[test]
    fn test_execute_errors_are_text() {
        let (_dir, db) = test_db();
        let tools = AssistantTools::new(db, 20);
        let err = tools.execute("get_day_summary", &json!({"date": "soon"})).unwrap_err();
        assert!(err.starts_with("validation_error"));
        assert!(tools.execute("delete_everything", &json!({})).is_err());
        assert!(tools.execute("search_ingredients", &json!({})).is_err());
    }
}
