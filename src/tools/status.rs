//! Nutrack status tool
//!
//! Runtime status and the usage guide served to MCP clients.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::migrations::get_schema_version;
use crate::db::Database;

/// Usage guide for assistants driving the tools
pub const USAGE_INSTRUCTIONS: &str = r#"
# Nutrack Usage

## Ingredients

Every ingredient belongs to a group and declares its macros per unit:

| unit_type | amount is | macros are per |
|-----------|-----------|----------------|
| per_100g  | grams     | 100 g          |
| per_kg    | grams     | 1 kg           |
| per_piece | pieces    | 1 piece        |

1. `list_ingredient_groups`, or `create_ingredient_group` if none fits
2. `add_ingredient` with `group_id`, `name`, `unit_type`, calories, protein, carbs, fat
3. Names are unique; a duplicate comes back as `unique_violation` on field `name`

## Lists

`browse_ingredients`, `browse_meals` and `browse_measurements` take the list's
current `query` string plus optional events: `search`, `group`, `sort`,
`limit`, `page`. Events are applied in that order. The response echoes the
`query` the page was fetched for; pass it back as `query` on the next call.

- `group` is a group name for ingredients, a tag name for meals and a
  category for measurements. `All` clears it.
- Sorting by the current column flips asc/desc; a new column starts asc.
- Changing search or group returns to the first page. Changing `limit` keeps
  the offset.

## Meals

1. `create_meal` with a name and optional `tag_ids`
2. `set_meal_ingredients` with the full ordered list of `{ingredient_id, amount}`
3. `get_meal` shows each line's totals and the meal total

## Diary

Dates are `YYYY-MM-DD`.

- `log_meal` copies a library meal into a date
- `add_diary_meal` + `add_diary_item` log ingredients directly
- `get_day` returns per-meal totals, the daily total and progress against goals
- `list_days` summarizes a date range

## Measurements

`list_measurement_types` first; values are stored in the type's metric unit.

## Notifications

Mutating tools queue a success or error notification. Drain them with
`get_notifications`.
"#;

/// Status information
#[derive(Debug, Clone, Serialize)]
pub struct NutrackStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,
    /// Whether the assistant has an API key
    pub assistant_configured: bool,
    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    assistant_configured: bool,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, assistant_configured: bool) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            assistant_configured,
        }
    }

    pub fn get_status(&self, db: &Database) -> NutrackStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());
        let schema_version = match db.with_conn(get_schema_version) {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::warn!(error = %e, "could not read schema version");
                None
            }
        };

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));
        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        NutrackStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version,
            assistant_configured: self.assistant_configured,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::test_db;

    #[test]
    fn test_status_reports_database() {
        let (dir, db) = test_db();
        let tracker = StatusTracker::new(dir.path().join("nutrack.db"), false);
        let status = tracker.get_status(&db);
        assert_eq!(status.schema_version, Some(2));
        assert!(status.database_size_bytes.is_some());
        assert!(!status.assistant_configured);
        assert_eq!(status.process_id, std::process::id());
    }
}
