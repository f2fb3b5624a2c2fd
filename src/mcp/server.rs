//! Nutrack MCP Server Implementation
//!
//! Implements the MCP server with all nutrack tools.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};

use crate::assistant::{AssistantError, ChatBackend};
use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::models::{
    DiaryMealUpdate, IngredientCreate, IngredientGroupCreate, IngredientGroupUpdate,
    IngredientUpdate, MealCreate, MealLineInput, MealTagCreate, MealTagUpdate, MealUpdate,
    MeasurementCreate, MeasurementTypeCreate, NutritionValue,
};
use crate::notify::{Notification, NotificationQueue};
use crate::nutrition::UnitType;
use crate::tools::status::StatusTracker;
use crate::tools::{
    self, assistant, diary, goals, ingredient_groups, ingredients, meal_tags, meals, measurements,
    BrowseRequest,
};

/// Nutrack MCP Service
#[derive(Clone)]
pub struct NutrackService {
    status_tracker: Arc<StatusTracker>,
    database: Database,
    config: Arc<AppConfig>,
    /// Session toasts, drained by `get_notifications`
    notifications: Arc<NotificationQueue>,
    assistant: Option<Arc<dyn ChatBackend>>,
    tool_router: ToolRouter<NutrackService>,
}

impl NutrackService {
    pub fn new(database: Database, config: AppConfig) -> Self {
        let assistant: Option<Arc<dyn ChatBackend>> = match assistant::build_backend(&config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::info!(reason = %e, "assistant disabled");
                None
            }
        };
        Self {
            status_tracker: Arc::new(StatusTracker::new(
                config.database_path.clone(),
                assistant.is_some(),
            )),
            database,
            config: Arc::new(config),
            notifications: Arc::new(NotificationQueue::new()),
            assistant,
            tool_router: Self::tool_router(),
        }
    }

    /// Queue a toast for a mutation's outcome and turn it into a tool result
    fn mutation<T: Serialize>(&self, success_message: &str, result: AppResult<T>) -> Result<CallToolResult, McpError> {
        respond(tools::report(&*self.notifications, success_message, result))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn respond<T: Serialize>(result: AppResult<T>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => to_json(&value),
        Err(e) => Err(to_mcp_error(e)),
    }
}

/// Map the error taxonomy onto protocol errors, keeping kind and field as data
fn to_mcp_error(err: AppError) -> McpError {
    let data = serde_json::json!({
        "kind": err.kind.code(),
        "field": err.field,
    });
    match err.kind {
        ErrorKind::Validation => McpError::invalid_params(err.message, Some(data)),
        ErrorKind::NotFound => McpError::resource_not_found(err.message, Some(data)),
        _ => McpError::internal_error(err.message, Some(data)),
    }
}

fn parse_unit_type(value: Option<&str>) -> AppResult<Option<UnitType>> {
    value
        .map(|s| {
            s.parse::<UnitType>().map_err(|_| {
                AppError::validation(format!(
                    "Unknown unit_type '{}', expected per_100g, per_kg or per_piece",
                    s
                ))
                .with_field("unit_type")
            })
        })
        .transpose()
}

// ============================================================================
// Shared Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BrowseParams {
    /// Query string the previous page was fetched for, e.g. "group=Proteins&order=desc"
    pub query: Option<String>,
    /// New search text; resets to the first page
    pub search: Option<String>,
    /// New group filter; "All" clears it
    pub group: Option<String>,
    /// Column to sort by; repeating the current column flips the order
    pub sort: Option<String>,
    pub limit: Option<u32>,
    /// Zero-based page index
    pub page: Option<u64>,
}

impl From<BrowseParams> for BrowseRequest {
    fn from(p: BrowseParams) -> Self {
        BrowseRequest {
            query: p.query,
            search: p.search,
            group: p.group,
            sort: p.sort,
            limit: p.limit,
            page: p.page,
        }
    }
}

// ============================================================================
// Ingredient Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateIngredientGroupParams {
    pub name: String,
    /// Hex color such as "#22c55e"
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateIngredientGroupParams {
    pub id: i64,
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddIngredientParams {
    pub group_id: i64,
    pub name: String,
    /// per_100g (default), per_kg or per_piece
    pub unit_type: Option<String>,
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    pub price: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateIngredientParams {
    pub id: i64,
    pub group_id: Option<i64>,
    pub name: Option<String>,
    pub unit_type: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub price: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchIngredientsParams {
    pub query: String,
    pub limit: Option<u32>,
}

// ============================================================================
// Meal Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateMealTagParams {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateMealTagParams {
    pub id: i64,
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateMealParams {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateMealParams {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealLineParams {
    pub ingredient_id: i64,
    /// Grams for per_100g/per_kg ingredients, pieces for per_piece
    pub amount: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetMealIngredientsParams {
    pub meal_id: i64,
    /// Full ordered list; replaces the current lines
    pub ingredients: Vec<MealLineParams>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetMealTagsParams {
    pub meal_id: i64,
    pub tag_ids: Vec<i64>,
}

// ============================================================================
// Diary Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DateParams {
    /// YYYY-MM-DD
    pub date: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetDayNotesParams {
    pub date: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddDiaryMealParams {
    pub date: String,
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateDiaryMealParams {
    pub id: i64,
    pub name: Option<String>,
    pub meal_order: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddDiaryItemParams {
    pub diary_meal_id: i64,
    pub ingredient_id: i64,
    pub amount: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateDiaryItemParams {
    pub id: i64,
    pub amount: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogMealParams {
    pub date: String,
    pub meal_id: i64,
    /// Diary meal name; defaults to the library meal's name
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDaysParams {
    pub start_date: String,
    pub end_date: String,
}

// ============================================================================
// Measurement and Goal Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateMeasurementTypeParams {
    pub name: String,
    /// e.g. body, circumference, composition
    pub category: String,
    pub metric_unit: String,
    pub imperial_unit: String,
    pub display_order: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddMeasurementParams {
    pub measurement_type_id: i64,
    /// In the type's metric unit
    pub value: f64,
    /// RFC 3339 timestamp or YYYY-MM-DD; defaults to now
    pub measured_at: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetGoalsParams {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AskAssistantParams {
    pub question: String,
    /// Date the assistant treats as today (YYYY-MM-DD); defaults to the local date
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
struct NotificationsResponse {
    notifications: Vec<Notification>,
    count: usize,
}

#[tool_router]
impl NutrackService {
    // --- Status ---

    #[tool(description = "Get the current status of the nutrack service including build info, database status, and process information")]
    async fn nutrack_status(&self) -> Result<CallToolResult, McpError> {
        let status = self.status_tracker.get_status(&self.database);
        to_json(&status)
    }

    #[tool(description = "Get instructions for using the nutrack tools: ingredients, list browsing, meals, diary, measurements. Call this first when unsure how the tools fit together.")]
    fn usage_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::USAGE_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(USAGE_INSTRUCTIONS)]))
    }

    #[tool(description = "Drain the success/error notifications queued by earlier mutating tool calls")]
    fn get_notifications(&self) -> Result<CallToolResult, McpError> {
        let notifications = self.notifications.drain();
        to_json(&NotificationsResponse {
            count: notifications.len(),
            notifications,
        })
    }

    // --- Ingredient Groups ---

    #[tool(description = "Create an ingredient group (e.g. Proteins, Grains) with an optional hex color")]
    fn create_ingredient_group(&self, Parameters(p): Parameters<CreateIngredientGroupParams>) -> Result<CallToolResult, McpError> {
        let data = IngredientGroupCreate { name: p.name, color: p.color };
        self.mutation(
            "Ingredient group created",
            ingredient_groups::create_ingredient_group(&self.database, data),
        )
    }

    #[tool(description = "List ingredient groups with the number of ingredients in each")]
    fn list_ingredient_groups(&self) -> Result<CallToolResult, McpError> {
        respond(ingredient_groups::list_ingredient_groups(&self.database))
    }

    #[tool(description = "Rename or recolor an ingredient group")]
    fn update_ingredient_group(&self, Parameters(p): Parameters<UpdateIngredientGroupParams>) -> Result<CallToolResult, McpError> {
        let data = IngredientGroupUpdate { name: p.name, color: p.color };
        self.mutation(
            "Ingredient group updated",
            ingredient_groups::update_ingredient_group(&self.database, p.id, data),
        )
    }

    #[tool(description = "Delete an ingredient group (only allowed when it has no ingredients)")]
    fn delete_ingredient_group(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        self.mutation(
            "Ingredient group deleted",
            ingredient_groups::delete_ingredient_group(&self.database, p.id),
        )
    }

    // --- Ingredients ---

    #[tool(description = "Add an ingredient with macros per unit: per_100g (default), per_kg or per_piece")]
    fn add_ingredient(&self, Parameters(p): Parameters<AddIngredientParams>) -> Result<CallToolResult, McpError> {
        let result = parse_unit_type(p.unit_type.as_deref()).and_then(|unit_type| {
            let data = IngredientCreate {
                group_id: p.group_id,
                name: p.name,
                unit_type: unit_type.unwrap_or_default(),
                calories: p.calories,
                protein: p.protein,
                carbs: p.carbs,
                fat: p.fat,
                price: p.price,
                notes: p.notes,
            };
            ingredients::add_ingredient(&self.database, data)
        });
        self.mutation("Ingredient added", result)
    }

    #[tool(description = "Get an ingredient with its group and the meals that use it")]
    fn get_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        respond(ingredients::get_ingredient(&self.database, p.id))
    }

    #[tool(description = "Update an ingredient; only the given fields change")]
    fn update_ingredient(&self, Parameters(p): Parameters<UpdateIngredientParams>) -> Result<CallToolResult, McpError> {
        let result = parse_unit_type(p.unit_type.as_deref()).and_then(|unit_type| {
            let data = IngredientUpdate {
                group_id: p.group_id,
                name: p.name,
                unit_type,
                calories: p.calories,
                protein: p.protein,
                carbs: p.carbs,
                fat: p.fat,
                price: p.price,
                notes: p.notes,
            };
            ingredients::update_ingredient(&self.database, p.id, data)
        });
        self.mutation("Ingredient updated", result)
    }

    #[tool(description = "Delete an ingredient (only allowed if no meal uses it)")]
    fn delete_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        self.mutation("Ingredient deleted", ingredients::delete_ingredient(&self.database, p.id))
    }

    #[tool(description = "Search ingredients by name")]
    fn search_ingredients(&self, Parameters(p): Parameters<SearchIngredientsParams>) -> Result<CallToolResult, McpError> {
        let limit = p.limit.unwrap_or(self.config.page_size);
        respond(ingredients::search_ingredients(&self.database, &p.query, limit))
    }

    #[tool(description = "Browse the ingredient list. Group filter is a group name; sort by name, calories, protein, carbs, fat, price or created_at. Pass back the returned query string.")]
    fn browse_ingredients(&self, Parameters(p): Parameters<BrowseParams>) -> Result<CallToolResult, McpError> {
        respond(ingredients::browse_ingredients(&self.database, &p.into()))
    }

    // --- Meal Tags ---

    #[tool(description = "Create a meal tag (e.g. Breakfast, High protein)")]
    fn create_meal_tag(&self, Parameters(p): Parameters<CreateMealTagParams>) -> Result<CallToolResult, McpError> {
        let data = MealTagCreate { name: p.name, color: p.color };
        self.mutation("Meal tag created", meal_tags::create_meal_tag(&self.database, data))
    }

    #[tool(description = "List meal tags")]
    fn list_meal_tags(&self) -> Result<CallToolResult, McpError> {
        respond(meal_tags::list_meal_tags(&self.database))
    }

    #[tool(description = "Rename or recolor a meal tag")]
    fn update_meal_tag(&self, Parameters(p): Parameters<UpdateMealTagParams>) -> Result<CallToolResult, McpError> {
        let data = MealTagUpdate { name: p.name, color: p.color };
        self.mutation("Meal tag updated", meal_tags::update_meal_tag(&self.database, p.id, data))
    }

    #[tool(description = "Delete a meal tag; meals keep existing without it")]
    fn delete_meal_tag(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        self.mutation("Meal tag deleted", meal_tags::delete_meal_tag(&self.database, p.id))
    }

    // --- Meals ---

    #[tool(description = "Create a library meal with optional tags. Add ingredients with set_meal_ingredients.")]
    fn create_meal(&self, Parameters(p): Parameters<CreateMealParams>) -> Result<CallToolResult, McpError> {
        let data = MealCreate {
            name: p.name,
            description: p.description,
            tag_ids: p.tag_ids,
        };
        self.mutation("Meal created", meals::create_meal(&self.database, data))
    }

    #[tool(description = "Get a meal with its tags, ordered ingredient lines with totals, and total nutrition")]
    fn get_meal(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        respond(meals::get_meal(&self.database, p.id))
    }

    #[tool(description = "Update a meal's name or description")]
    fn update_meal(&self, Parameters(p): Parameters<UpdateMealParams>) -> Result<CallToolResult, McpError> {
        let data = MealUpdate {
            name: p.name,
            description: p.description,
        };
        self.mutation("Meal updated", meals::update_meal(&self.database, p.id, data))
    }

    #[tool(description = "Replace a meal's ingredient lines with the given ordered list of {ingredient_id, amount}")]
    fn set_meal_ingredients(&self, Parameters(p): Parameters<SetMealIngredientsParams>) -> Result<CallToolResult, McpError> {
        let lines = p
            .ingredients
            .into_iter()
            .map(|l| MealLineInput {
                ingredient_id: l.ingredient_id,
                amount: l.amount,
            })
            .collect();
        self.mutation(
            "Meal ingredients saved",
            meals::set_meal_ingredients(&self.database, p.meal_id, lines),
        )
    }

    #[tool(description = "Replace a meal's tags")]
    fn set_meal_tags(&self, Parameters(p): Parameters<SetMealTagsParams>) -> Result<CallToolResult, McpError> {
        self.mutation("Meal tags saved", meals::set_meal_tags(&self.database, p.meal_id, p.tag_ids))
    }

    #[tool(description = "Delete a library meal; diary entries logged from it are kept")]
    fn delete_meal(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        self.mutation("Meal deleted", meals::delete_meal(&self.database, p.id))
    }

    #[tool(description = "Browse library meals. Group filter is a tag name; sort by name, created_at or updated_at. Pass back the returned query string.")]
    fn browse_meals(&self, Parameters(p): Parameters<BrowseParams>) -> Result<CallToolResult, McpError> {
        respond(meals::browse_meals(&self.database, &p.into()))
    }

    // --- Diary ---

    #[tool(description = "Get the diary for a date: meals with items, per-meal nutrition, daily total and progress against goals")]
    fn get_day(&self, Parameters(p): Parameters<DateParams>) -> Result<CallToolResult, McpError> {
        respond(diary::get_day(&self.database, &p.date))
    }

    #[tool(description = "Set or clear the notes for a date")]
    fn set_day_notes(&self, Parameters(p): Parameters<SetDayNotesParams>) -> Result<CallToolResult, McpError> {
        self.mutation("Notes saved", diary::set_day_notes(&self.database, &p.date, p.notes))
    }

    #[tool(description = "Add an empty named meal to a date; it is appended after existing meals")]
    fn add_diary_meal(&self, Parameters(p): Parameters<AddDiaryMealParams>) -> Result<CallToolResult, McpError> {
        self.mutation("Meal added", diary::add_diary_meal(&self.database, &p.date, &p.name))
    }

    #[tool(description = "Rename or reorder a diary meal")]
    fn update_diary_meal(&self, Parameters(p): Parameters<UpdateDiaryMealParams>) -> Result<CallToolResult, McpError> {
        let data = DiaryMealUpdate {
            name: p.name,
            meal_order: p.meal_order,
        };
        self.mutation("Meal updated", diary::update_diary_meal(&self.database, p.id, data))
    }

    #[tool(description = "Delete a diary meal and its items")]
    fn delete_diary_meal(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        self.mutation("Meal deleted", diary::delete_diary_meal(&self.database, p.id))
    }

    #[tool(description = "Log an ingredient into a diary meal; totals are computed from the ingredient's macros")]
    fn add_diary_item(&self, Parameters(p): Parameters<AddDiaryItemParams>) -> Result<CallToolResult, McpError> {
        self.mutation(
            "Item added",
            diary::add_diary_item(&self.database, p.diary_meal_id, p.ingredient_id, p.amount),
        )
    }

    #[tool(description = "Change the amount of a diary item and recompute its totals")]
    fn update_diary_item(&self, Parameters(p): Parameters<UpdateDiaryItemParams>) -> Result<CallToolResult, McpError> {
        self.mutation("Item updated", diary::update_diary_item(&self.database, p.id, p.amount))
    }

    #[tool(description = "Remove an item from a diary meal")]
    fn remove_diary_item(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        self.mutation("Item removed", diary::remove_diary_item(&self.database, p.id))
    }

    #[tool(description = "Copy a library meal into a date as a new diary meal with one item per ingredient line")]
    fn log_meal(&self, Parameters(p): Parameters<LogMealParams>) -> Result<CallToolResult, McpError> {
        self.mutation(
            "Meal logged",
            diary::log_meal(&self.database, &p.date, p.meal_id, p.name.as_deref()),
        )
    }

    #[tool(description = "List logged days between two dates (inclusive) with daily totals and the average")]
    fn list_days(&self, Parameters(p): Parameters<ListDaysParams>) -> Result<CallToolResult, McpError> {
        respond(diary::list_days(&self.database, &p.start_date, &p.end_date))
    }

    // --- Measurements ---

    #[tool(description = "Create a custom measurement type")]
    fn create_measurement_type(&self, Parameters(p): Parameters<CreateMeasurementTypeParams>) -> Result<CallToolResult, McpError> {
        let data = MeasurementTypeCreate {
            name: p.name,
            category: p.category,
            metric_unit: p.metric_unit,
            imperial_unit: p.imperial_unit,
            display_order: p.display_order,
        };
        self.mutation(
            "Measurement type created",
            measurements::create_measurement_type(&self.database, data),
        )
    }

    #[tool(description = "List measurement types in display order")]
    fn list_measurement_types(&self) -> Result<CallToolResult, McpError> {
        respond(measurements::list_measurement_types(&self.database))
    }

    #[tool(description = "Record a body measurement in the type's metric unit")]
    fn add_measurement(&self, Parameters(p): Parameters<AddMeasurementParams>) -> Result<CallToolResult, McpError> {
        let data = MeasurementCreate {
            measurement_type_id: p.measurement_type_id,
            value: p.value,
            measured_at: p.measured_at,
            notes: p.notes,
        };
        self.mutation("Measurement recorded", measurements::add_measurement(&self.database, data))
    }

    #[tool(description = "Browse measurements. Group filter is a category; sort by measured_at (default), value or name. Pass back the returned query string.")]
    fn browse_measurements(&self, Parameters(p): Parameters<BrowseParams>) -> Result<CallToolResult, McpError> {
        respond(measurements::browse_measurements(&self.database, &p.into()))
    }

    #[tool(description = "Get the most recent measurement of each type")]
    fn latest_measurements(&self) -> Result<CallToolResult, McpError> {
        respond(measurements::latest_measurements(&self.database))
    }

    #[tool(description = "Delete a measurement")]
    fn delete_measurement(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        self.mutation("Measurement deleted", measurements::delete_measurement(&self.database, p.id))
    }

    // --- Goals ---

    #[tool(description = "Get the daily nutrition goals (null until set)")]
    fn get_goals(&self) -> Result<CallToolResult, McpError> {
        respond(goals::get_goals(&self.database))
    }

    #[tool(description = "Set the daily nutrition goals")]
    fn set_goals(&self, Parameters(p): Parameters<SetGoalsParams>) -> Result<CallToolResult, McpError> {
        let targets = NutritionValue::new(p.calories, p.protein, p.carbs, p.fat);
        self.mutation("Goals saved", goals::set_goals(&self.database, targets))
    }

    // --- Assistant ---

    #[tool(description = "Ask the nutrition assistant a question. It can read the diary, ingredient library and goals. Requires ANTHROPIC_API_KEY.")]
    async fn ask_assistant(&self, Parameters(p): Parameters<AskAssistantParams>) -> Result<CallToolResult, McpError> {
        let Some(backend) = self.assistant.as_deref() else {
            return respond::<()>(Err(AssistantError::MissingApiKey.into()));
        };
        let result = assistant::ask_assistant(
            backend,
            &self.database,
            &self.config,
            &p.question,
            p.date.as_deref(),
        )
        .await;
        if let Err(ref e) = result {
            tracing::warn!(kind = e.kind.code(), error = %e, "assistant request failed");
        }
        respond(result)
    }
}

#[tool_handler]
impl ServerHandler for NutrackService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutrack".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Nutrack".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Nutrack - ingredients, meals, food diary, body measurements and nutrition goals. \
                 IMPORTANT: Call usage_instructions first. \
                 Groups: create/list/update/delete_ingredient_group. \
                 Ingredients: add/get/update/delete_ingredient, search_ingredients, browse_ingredients. \
                 Tags: create/list/update/delete_meal_tag. \
                 Meals: create/get/update/delete_meal, set_meal_ingredients, set_meal_tags, browse_meals. \
                 Diary: get_day, set_day_notes, add/update/delete_diary_meal, add/update/remove_diary_item, log_meal, list_days. \
                 Measurements: create/list_measurement_type(s), add_measurement, browse_measurements, latest_measurements, delete_measurement. \
                 Goals: get_goals, set_goals. Assistant: ask_assistant. \
                 Mutations queue notifications; read them with get_notifications."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::test_db;

    fn service() -> (tempfile::TempDir, NutrackService) {
        let (dir, db) = test_db();
        let config = AppConfig {
            database_path: dir.path().join("nutrack.db"),
            anthropic_api_key: None,
            ai_model: "test-model".into(),
            page_size: 20,
        };
        (dir, NutrackService::new(db, config))
    }

    #[test]
    fn test_error_mapping_keeps_field() {
        let err = to_mcp_error(AppError::validation("name cannot be empty").with_field("name"));
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        let data = err.data.unwrap();
        assert_eq!(data["kind"], "validation_error");
        assert_eq!(data["field"], "name");

        let err = to_mcp_error(AppError::not_found("Meal", 3));
        assert_eq!(err.code, rmcp::model::ErrorCode::RESOURCE_NOT_FOUND);
        assert_eq!(err.message, "Meal not found with id: 3");
    }

    #[test]
    fn test_mutations_queue_notifications() {
        let (_dir, svc) = service();
        svc.create_ingredient_group(Parameters(CreateIngredientGroupParams {
            name: "Grains".into(),
            color: None,
        }))
        .unwrap();
        assert!(svc
            .create_ingredient_group(Parameters(CreateIngredientGroupParams {
                name: "Grains".into(),
                color: None,
            }))
            .is_err());
        svc.list_ingredient_groups().unwrap();

        let queued = svc.notifications.drain();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].message, "Ingredient group created");
        assert_eq!(queued[1].title, "unique_violation");
        assert_eq!(queued[1].field.as_deref(), Some("name"));
    }

    #[test]
    fn test_unknown_unit_type_rejected() {
        let (_dir, svc) = service();
        let err = svc
            .add_ingredient(Parameters(AddIngredientParams {
                group_id: 1,
                name: "Milk".into(),
                unit_type: Some("per_litre".into()),
                calories: 64.0,
                protein: 3.4,
                carbs: 4.8,
                fat: 3.6,
                price: None,
                notes: None,
            }))
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_assistant_without_key() {
        let (_dir, svc) = service();
        let err = svc
            .ask_assistant(Parameters(AskAssistantParams {
                question: "What should I eat?".into(),
                date: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.data.unwrap()["kind"], "unauthorized");
    }
}
