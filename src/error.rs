//! Application errors
//!
//! Store failures are mapped onto a closed set of kinds through a static
//! table keyed by SQLite result codes. Unique violations can be pinned to the
//! form field that caused them.

use rusqlite::ffi;
use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    PermissionDenied,
    ForeignKeyViolation,
    UniqueViolation,
    Unauthorized,
    Server,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::ForeignKeyViolation => "foreign_key_violation",
            ErrorKind::UniqueViolation => "unique_violation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Server => "server_error",
        }
    }

    /// Message shown when the store gives nothing better
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Invalid input",
            ErrorKind::NotFound => "Record not found",
            ErrorKind::PermissionDenied => "You do not have permission to do that",
            ErrorKind::ForeignKeyViolation => "Record is still referenced by other records",
            ErrorKind::UniqueViolation => "Name already exists",
            ErrorKind::Unauthorized => "Not authorized",
            ErrorKind::Server => "Something went wrong",
        }
    }
}

/// Extended result codes are matched before primary ones
pub const STORE_ERROR_TABLE: &[(i32, ErrorKind)] = &[
    (ffi::SQLITE_CONSTRAINT_UNIQUE, ErrorKind::UniqueViolation),
    (ffi::SQLITE_CONSTRAINT_PRIMARYKEY, ErrorKind::UniqueViolation),
    (ffi::SQLITE_CONSTRAINT_FOREIGNKEY, ErrorKind::ForeignKeyViolation),
    (ffi::SQLITE_CONSTRAINT_CHECK, ErrorKind::Validation),
    (ffi::SQLITE_CONSTRAINT_NOTNULL, ErrorKind::Validation),
    (ffi::SQLITE_MISMATCH, ErrorKind::Validation),
    (ffi::SQLITE_TOOBIG, ErrorKind::Validation),
    (ffi::SQLITE_NOTFOUND, ErrorKind::NotFound),
    (ffi::SQLITE_PERM, ErrorKind::PermissionDenied),
    (ffi::SQLITE_READONLY, ErrorKind::PermissionDenied),
    (ffi::SQLITE_AUTH, ErrorKind::Unauthorized),
];

/// Kind for a raw SQLite result code; unknown codes are server errors
pub fn kind_for_store_code(extended_code: i32) -> ErrorKind {
    let primary = extended_code & 0xff;
    STORE_ERROR_TABLE
        .iter()
        .find(|(code, _)| *code == extended_code)
        .or_else(|| STORE_ERROR_TABLE.iter().find(|(code, _)| *code == primary))
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Server)
}

#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("{} not found with id: {}", what, id))
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Map a store error, attaching a field to unique violations whose
    /// constraint message contains one of the `(keyword, field)` keywords
    pub fn from_store(err: DbError, fields: &[(&str, &str)]) -> Self {
        let mapped = Self::from(err);
        if mapped.kind != ErrorKind::UniqueViolation {
            return mapped;
        }
        match fields.iter().find(|(keyword, _)| mapped.message.contains(keyword)) {
            Some((_, field)) => AppError {
                message: format!("{} already exists", capitalize(field)),
                ..mapped
            }
            .with_field(*field),
            None => mapped,
        }
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows) => {
                Self::new(ErrorKind::NotFound, ErrorKind::NotFound.default_message())
            }
            DbError::Sqlite(rusqlite::Error::SqliteFailure(code, message)) => {
                let kind = kind_for_store_code(code.extended_code);
                let message = match (kind, message) {
                    // Keep the raw text for unique violations; field mapping matches on it
                    (ErrorKind::UniqueViolation, Some(m)) => m,
                    (ErrorKind::Server, Some(m)) => m,
                    (kind, _) => kind.default_message().to_string(),
                };
                Self::new(kind, message)
            }
            DbError::Invalid(message) => Self::validation(message),
            other => Self::server(other.to_string()),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_conn;

    fn store_error(sql: &str) -> DbError {
        let conn = test_conn();
        conn.execute_batch(
            "INSERT INTO ingredient_groups (id, name) VALUES (1, 'Proteins');
             INSERT INTO ingredients (group_id, name, unit_type) VALUES (1, 'Egg', 'per_piece');",
        )
        .unwrap();
        conn.execute_batch(sql).unwrap_err().into()
    }

    #[test]
    fn test_table_lookup_prefers_extended_code() {
        assert_eq!(
            kind_for_store_code(ffi::SQLITE_CONSTRAINT_UNIQUE),
            ErrorKind::UniqueViolation
        );
        assert_eq!(
            kind_for_store_code(ffi::SQLITE_CONSTRAINT_FOREIGNKEY),
            ErrorKind::ForeignKeyViolation
        );
        // Read-only variants fall back to the primary code
        assert_eq!(
            kind_for_store_code(ffi::SQLITE_READONLY_DBMOVED),
            ErrorKind::PermissionDenied
        );
        assert_eq!(kind_for_store_code(ffi::SQLITE_IOERR), ErrorKind::Server);
    }

    #[test]
    fn test_unique_violation_maps_to_field() {
        let err = store_error("INSERT INTO ingredient_groups (name) VALUES ('Proteins')");
        let app = AppError::from_store(err, &[("ingredient_groups.name", "name")]);
        assert_eq!(app.kind, ErrorKind::UniqueViolation);
        assert_eq!(app.field.as_deref(), Some("name"));
        assert_eq!(app.message, "Name already exists");
    }

    #[test]
    fn test_unique_violation_without_mapping_keeps_message() {
        let err = store_error("INSERT INTO ingredients (group_id, name, unit_type) VALUES (1, 'Egg', 'per_piece')");
        let app = AppError::from_store(err, &[("meals.name", "name")]);
        assert_eq!(app.kind, ErrorKind::UniqueViolation);
        assert!(app.field.is_none());
        assert!(app.message.contains("ingredients.name"));
    }

    #[test]
    fn test_foreign_key_violation() {
        let err = store_error("DELETE FROM ingredient_groups WHERE id = 1");
        let app = AppError::from(err);
        assert_eq!(app.kind, ErrorKind::ForeignKeyViolation);
    }

    #[test]
    fn test_check_constraint_is_validation() {
        let err = store_error("INSERT INTO ingredients (group_id, name, unit_type, calories) VALUES (1, 'Bad', 'per_piece', -5)");
        assert_eq!(AppError::from(err).kind, ErrorKind::Validation);
    }

    #[test]
    fn test_no_rows_is_not_found() {
        let app = AppError::from(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
        assert_eq!(app.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_serialized_shape() {
        let app = AppError::validation("name cannot be empty").with_field("name");
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["field"], "name");
    }
}
