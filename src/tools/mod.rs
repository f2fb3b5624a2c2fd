//! Nutrack tools module
//!
//! Tool implementations behind the MCP surface. Each function validates its
//! input, does one unit of work against the database and returns a
//! serializable response.

pub mod assistant;
pub mod diary;
pub mod goals;
pub mod ingredient_groups;
pub mod ingredients;
pub mod meal_tags;
pub mod meals;
pub mod measurements;
pub mod status;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::filter::{FilterChange, FilterState, SortColumn};
use crate::notify::Notifier;

/// List request shared by the browse tools.
///
/// `query` is the list's current query string. The remaining fields are UI
/// events applied on top of it in a fixed order: search, group, sort, limit,
/// then page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowseRequest {
    pub query: Option<String>,
    pub search: Option<String>,
    pub group: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u64>,
}

impl BrowseRequest {
    pub fn from_query(query: &str) -> Self {
        Self {
            query: Some(query.to_string()),
            ..Self::default()
        }
    }

    pub fn resolve<C: SortColumn>(&self) -> AppResult<FilterState<C>> {
        let mut state = FilterState::<C>::parse(self.query.as_deref().unwrap_or(""));

        let changes = [
            self.search.clone().map(FilterChange::Search),
            self.group.clone().map(FilterChange::Group),
            self.sort.clone().map(FilterChange::Sort),
            self.limit.map(FilterChange::Limit),
            self.page.map(FilterChange::Page),
        ];
        for change in changes.into_iter().flatten() {
            state = state
                .apply(change)
                .map_err(|e| AppError::validation(e.to_string()).with_field("sort"))?;
        }
        Ok(state)
    }
}

/// One page of a list, tagged with the query string it was fetched for
#[derive(Debug, Serialize)]
pub struct BrowseResponse<T> {
    pub query: String,
    pub page_index: u64,
    pub limit: u32,
    pub offset: u64,
    pub total: i64,
    pub items: Vec<T>,
}

impl<T> BrowseResponse<T> {
    pub fn new<C: SortColumn>(state: &FilterState<C>, total: i64, items: Vec<T>) -> Self {
        Self {
            query: state.to_query_string(),
            page_index: state.page_index(),
            limit: state.limit,
            offset: state.offset,
            total,
            items,
        }
    }
}

/// Standard delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Push a toast for the outcome of a mutation and hand the result back
pub fn report<T>(notifier: &dyn Notifier, success_message: &str, result: AppResult<T>) -> AppResult<T> {
    match &result {
        Ok(_) => notifier.success(success_message),
        Err(err) => notifier.error(err),
    }
    result
}

pub(crate) fn require_name(name: &str, what: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation(format!("{} name cannot be empty", what)).with_field("name"));
    }
    Ok(())
}

pub(crate) fn require_non_negative(value: f64, field: &str) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!("{} cannot be negative", field)).with_field(field));
    }
    Ok(())
}

pub(crate) fn require_positive(value: f64, field: &str) -> AppResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::validation(format!("{} must be greater than 0", field)).with_field(field));
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD` only
pub(crate) fn require_date(date: &str) -> AppResult<String> {
    chrono::NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| AppError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", date)).with_field("date"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::migrations::run_migrations;
    use crate::db::Database;

    /// Pooled database in a temp dir with the schema applied
    pub fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("nutrack.db")).unwrap();
        db.with_conn(|conn| run_migrations(conn)).unwrap();
        (dir, db)
    }
}
