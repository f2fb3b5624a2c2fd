//! Body measurement model
//!
//! Measurement types (weight, body fat, circumferences) are seeded by the
//! migrations and can be extended. Readings are stored in the type's metric
//! unit.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::connection::optional;
use crate::db::{DbError, DbResult};
use crate::filter::{FilterState, MeasurementSort};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementType {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub metric_unit: String,
    pub imperial_unit: String,
    pub display_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementTypeCreate {
    pub name: String,
    pub category: String,
    pub metric_unit: String,
    pub imperial_unit: String,
    /// Appended after the last type when absent
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: i64,
    pub measurement_type_id: i64,
    pub value: f64,
    pub measured_at: String,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementCreate {
    pub measurement_type_id: i64,
    pub value: f64,
    /// Defaults to now
    pub measured_at: Option<String>,
    pub notes: Option<String>,
}

/// Reading joined with its type's display fields
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementWithType {
    #[serde(flatten)]
    pub measurement: Measurement,
    pub type_name: String,
    pub category: String,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeasurementPage {
    pub items: Vec<MeasurementWithType>,
    pub total: i64,
}

impl MeasurementType {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            category: row.get("category")?,
            metric_unit: row.get("metric_unit")?,
            imperial_unit: row.get("imperial_unit")?,
            display_order: row.get("display_order")?,
        })
    }

    pub fn create(conn: &Connection, data: &MeasurementTypeCreate) -> DbResult<Self> {
        let display_order = match data.display_order {
            Some(order) => order,
            None => conn.query_row(
                "SELECT COALESCE(MAX(display_order), 0) + 1 FROM measurement_types",
                [],
                |row| row.get(0),
            )?,
        };
        conn.execute(
            r#"
            INSERT INTO measurement_types (name, category, metric_unit, imperial_unit, display_order)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                data.name.trim(),
                data.category.trim().to_lowercase(),
                data.metric_unit,
                data.imperial_unit,
                display_order,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT * FROM measurement_types WHERE id = ?1",
            [id],
            Self::from_row,
        ))
    }

    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT * FROM measurement_types WHERE name = ?1 COLLATE NOCASE",
            [name],
            Self::from_row,
        ))
    }

    /// All types in display order
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM measurement_types ORDER BY display_order ASC, id ASC")?;
        let types = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(types)
    }
}

impl Measurement {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            measurement_type_id: row.get("measurement_type_id")?,
            value: row.get("value")?,
            measured_at: row.get("measured_at")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }

    fn with_type_from_row(row: &Row) -> rusqlite::Result<MeasurementWithType> {
        Ok(MeasurementWithType {
            measurement: Self::from_row(row)?,
            type_name: row.get("type_name")?,
            category: row.get("category")?,
            unit: row.get("metric_unit")?,
        })
    }

    pub fn create(conn: &Connection, data: &MeasurementCreate) -> DbResult<Self> {
        let measured_at = data
            .measured_at
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
        conn.execute(
            r#"
            INSERT INTO measurements (measurement_type_id, value, measured_at, notes)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![data.measurement_type_id, data.value, measured_at, data.notes],
        )?;
        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        optional(conn.query_row(
            "SELECT * FROM measurements WHERE id = ?1",
            [id],
            Self::from_row,
        ))
    }

    /// One page of readings.
    ///
    /// Search matches the type name or notes, the group filter matches the
    /// type's category.
    pub fn list(conn: &Connection, filter: &FilterState<MeasurementSort>) -> DbResult<MeasurementPage> {
        let mut conditions = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(pattern) = filter.search_pattern() {
            let n = params_vec.len() + 1;
            conditions.push(format!(
                "(t.name LIKE ?{n} ESCAPE '\\' OR m.notes LIKE ?{n} ESCAPE '\\')"
            ));
            params_vec.push(Box::new(pattern));
        }
        if let Some(category) = filter.group_filter() {
            conditions.push(format!("t.category = ?{} COLLATE NOCASE", params_vec.len() + 1));
            params_vec.push(Box::new(category.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let total: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM measurements m JOIN measurement_types t ON t.id = m.measurement_type_id {}",
                where_clause
            ),
            params_refs.as_slice(),
            |row| row.get(0),
        )?;

        let sql = format!(
            r#"
            SELECT m.*, t.name AS type_name, t.category, t.metric_unit
            FROM measurements m
            JOIN measurement_types t ON t.id = m.measurement_type_id
            {}
            ORDER BY {}, m.id ASC
            LIMIT ?{} OFFSET ?{}
            "#,
            where_clause,
            filter.order_clause(),
            params_vec.len() + 1,
            params_vec.len() + 2
        );
        params_vec.push(Box::new(i64::from(filter.limit)));
        let offset = i64::try_from(filter.offset)
            .map_err(|_| DbError::Invalid(format!("offset {} is out of range", filter.offset)))?;
        params_vec.push(Box::new(offset));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_refs.as_slice(), Self::with_type_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MeasurementPage { items, total })
    }

    /// Most recent reading of every type that has one, in display order
    pub fn latest_by_type(conn: &Connection) -> DbResult<Vec<MeasurementWithType>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT m.*, t.name AS type_name, t.category, t.metric_unit
            FROM measurements m
            JOIN measurement_types t ON t.id = m.measurement_type_id
            WHERE m.id = (
                SELECT m2.id FROM measurements m2
                WHERE m2.measurement_type_id = m.measurement_type_id
                ORDER BY m2.measured_at DESC, m2.id DESC
                LIMIT 1
            )
            ORDER BY t.display_order ASC, t.id ASC
            "#,
        )?;
        let items = stmt
            .query_map([], Self::with_type_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM measurements WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
