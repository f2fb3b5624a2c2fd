//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("applied schema migration v1");
    }

    if current_version < 2 {
        migrate_v2(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (2)", [])?;
        tracing::info!("applied schema migration v2");
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- INGREDIENT GROUPS
        -- ============================================
        CREATE TABLE ingredient_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            color TEXT NOT NULL DEFAULT '#9ca3af',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- INGREDIENTS
        -- Macros are stored per declared unit
        -- ============================================
        CREATE TABLE ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL REFERENCES ingredient_groups(id) ON DELETE RESTRICT,
            name TEXT NOT NULL UNIQUE,
            unit_type TEXT NOT NULL CHECK(unit_type IN ('per_100g', 'per_kg', 'per_piece')),
            calories REAL NOT NULL DEFAULT 0 CHECK(calories >= 0),
            protein REAL NOT NULL DEFAULT 0 CHECK(protein >= 0),
            carbs REAL NOT NULL DEFAULT 0 CHECK(carbs >= 0),
            fat REAL NOT NULL DEFAULT 0 CHECK(fat >= 0),
            price REAL CHECK(price IS NULL OR price >= 0),
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_ingredients_group ON ingredients(group_id);

        -- ============================================
        -- MEAL LIBRARY
        -- ============================================
        CREATE TABLE meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE meal_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE RESTRICT,
            amount REAL NOT NULL CHECK(amount > 0),
            position INTEGER NOT NULL
        );

        CREATE INDEX idx_meal_ingredients_meal ON meal_ingredients(meal_id, position);
        CREATE INDEX idx_meal_ingredients_ingredient ON meal_ingredients(ingredient_id);

        CREATE TABLE meal_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            color TEXT NOT NULL DEFAULT '#9ca3af',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE meal_tag_links (
            meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES meal_tags(id) ON DELETE CASCADE,
            PRIMARY KEY (meal_id, tag_id)
        );

        -- ============================================
        -- FOOD DIARY
        -- One entry per date, ordered meals, pre-multiplied line items
        -- ============================================
        CREATE TABLE diary_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_date TEXT NOT NULL UNIQUE,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE diary_meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            diary_entry_id INTEGER NOT NULL REFERENCES diary_entries(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            meal_order INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_diary_meals_entry ON diary_meals(diary_entry_id, meal_order);

        CREATE TABLE diary_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            diary_meal_id INTEGER NOT NULL REFERENCES diary_meals(id) ON DELETE CASCADE,
            ingredient_id INTEGER REFERENCES ingredients(id) ON DELETE SET NULL,
            ingredient_name TEXT NOT NULL,
            amount REAL NOT NULL CHECK(amount > 0),
            total_calories REAL,
            total_protein REAL,
            total_carbs REAL,
            total_fat REAL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_diary_items_meal ON diary_items(diary_meal_id);

        -- ============================================
        -- NUTRITION GOALS (single row)
        -- ============================================
        CREATE TABLE nutrition_goals (
            id INTEGER PRIMARY KEY CHECK(id = 1),
            calories REAL NOT NULL CHECK(calories >= 0),
            protein REAL NOT NULL CHECK(protein >= 0),
            carbs REAL NOT NULL CHECK(carbs >= 0),
            fat REAL NOT NULL CHECK(fat >= 0),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- BODY MEASUREMENTS
        -- ============================================
        CREATE TABLE measurement_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            category TEXT NOT NULL,
            metric_unit TEXT NOT NULL,
            imperial_unit TEXT NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE measurements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            measurement_type_id INTEGER NOT NULL REFERENCES measurement_types(id) ON DELETE RESTRICT,
            value REAL NOT NULL,
            measured_at TEXT NOT NULL DEFAULT (datetime('now')),
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_measurements_type ON measurements(measurement_type_id);
        CREATE INDEX idx_measurements_measured_at ON measurements(measured_at);
        "#,
    )?;

    Ok(())
}

/// Migration v2: Default measurement types
fn migrate_v2(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        INSERT OR IGNORE INTO measurement_types (name, category, metric_unit, imperial_unit, display_order) VALUES
            ('Weight', 'body', 'kg', 'lbs', 1),
            ('Body Fat', 'body', '%', '%', 2),
            ('Waist', 'circumference', 'cm', 'in', 3),
            ('Chest', 'circumference', 'cm', 'in', 4),
            ('Hips', 'circumference', 'cm', 'in', 5),
            ('Biceps', 'circumference', 'cm', 'in', 6),
            ('Thigh', 'circumference', 'cm', 'in', 7);
        "#,
    )?;
    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
