//! Body measurement tools

use serde::Serialize;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::filter::MeasurementSort;
use crate::models::{
    Measurement, MeasurementCreate, MeasurementType, MeasurementTypeCreate, MeasurementWithType,
};

use super::{require_name, BrowseRequest, BrowseResponse, DeleteResponse};

const TYPE_FIELDS: &[(&str, &str)] = &[("measurement_types.name", "name")];

#[derive(Debug, Serialize)]
pub struct ListMeasurementTypesResponse {
    pub types: Vec<MeasurementType>,
    pub count: usize,
}

pub fn create_measurement_type(db: &Database, data: MeasurementTypeCreate) -> AppResult<MeasurementType> {
    require_name(&data.name, "Measurement type")?;
    if data.category.trim().is_empty() {
        return Err(AppError::validation("category cannot be empty").with_field("category"));
    }
    if data.metric_unit.trim().is_empty() || data.imperial_unit.trim().is_empty() {
        return Err(AppError::validation("units cannot be empty").with_field("metric_unit"));
    }
    db.with_conn(|conn| MeasurementType::create(conn, &data))
        .map_err(|e| AppError::from_store(e, TYPE_FIELDS))
}

pub fn list_measurement_types(db: &Database) -> AppResult<ListMeasurementTypesResponse> {
    let types = db.with_conn(MeasurementType::list)?;
    Ok(ListMeasurementTypesResponse {
        count: types.len(),
        types,
    })
}

fn normalize_timestamp(value: &str) -> AppResult<String> {
    let value = value.trim();
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&chrono::Utc).format("%Y-%m-%dT%H:%M:%SZ").to_string());
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(format!("{}T00:00:00Z", date.format("%Y-%m-%d")));
    }
    Err(AppError::validation(format!("Invalid timestamp '{}'", value)).with_field("measured_at"))
}

pub fn add_measurement(db: &Database, mut data: MeasurementCreate) -> AppResult<Measurement> {
    if !data.value.is_finite() || data.value < 0.0 {
        return Err(AppError::validation("value cannot be negative").with_field("value"));
    }
    if let Some(ref at) = data.measured_at {
        data.measured_at = Some(normalize_timestamp(at)?);
    }
    if db
        .with_conn(|conn| MeasurementType::get_by_id(conn, data.measurement_type_id))?
        .is_none()
    {
        return Err(AppError::not_found("Measurement type", data.measurement_type_id)
            .with_field("measurement_type_id"));
    }
    let measurement = db.with_conn(|conn| Measurement::create(conn, &data))?;
    tracing::info!(id = measurement.id, type_id = measurement.measurement_type_id, "recorded measurement");
    Ok(measurement)
}

/// Browse readings; group filter is a type category
pub fn browse_measurements(db: &Database, request: &BrowseRequest) -> AppResult<BrowseResponse<MeasurementWithType>> {
    let state = request.resolve::<MeasurementSort>()?;
    let page = db.with_conn(|conn| Measurement::list(conn, &state))?;
    Ok(BrowseResponse::new(&state, page.total, page.items))
}

pub fn latest_measurements(db: &Database) -> AppResult<Vec<MeasurementWithType>> {
    Ok(db.with_conn(Measurement::latest_by_type)?)
}

pub fn delete_measurement(db: &Database, id: i64) -> AppResult<DeleteResponse> {
    if !db.with_conn(|conn| Measurement::delete(conn, id))? {
        return Err(AppError::not_found("Measurement", id));
    }
    Ok(DeleteResponse { success: true, deleted_id: id })
}
