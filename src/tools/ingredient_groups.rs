//! Ingredient group tools

use serde::Serialize;

use crate::db::Database;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::models::{IngredientGroup, IngredientGroupCreate, IngredientGroupUpdate, IngredientGroupWithCount};

use super::{require_name, DeleteResponse};

const FIELDS: &[(&str, &str)] = &[("ingredient_groups.name", "name")];

#[derive(Debug, Serialize)]
pub struct ListIngredientGroupsResponse {
    pub groups: Vec<IngredientGroupWithCount>,
    pub count: usize,
}

fn validate_color(color: Option<&str>) -> AppResult<()> {
    match color {
        Some(c) if !(c.starts_with('#') && (c.len() == 4 || c.len() == 7) && c[1..].chars().all(|ch| ch.is_ascii_hexdigit())) => {
            Err(AppError::validation(format!("Invalid color '{}', expected #rgb or #rrggbb", c)).with_field("color"))
        }
        _ => Ok(()),
    }
}

pub fn create_ingredient_group(db: &Database, data: IngredientGroupCreate) -> AppResult<IngredientGroup> {
    require_name(&data.name, "Group")?;
    validate_color(data.color.as_deref())?;

    db.with_conn(|conn| IngredientGroup::create(conn, &data))
        .map_err(|e| AppError::from_store(e, FIELDS))
}

pub fn list_ingredient_groups(db: &Database) -> AppResult<ListIngredientGroupsResponse> {
    let groups = db.with_conn(IngredientGroup::list)?;
    Ok(ListIngredientGroupsResponse {
        count: groups.len(),
        groups,
    })
}

pub fn update_ingredient_group(db: &Database, id: i64, data: IngredientGroupUpdate) -> AppResult<IngredientGroup> {
    if let Some(ref name) = data.name {
        require_name(name, "Group")?;
    }
    validate_color(data.color.as_deref())?;

    db.with_conn(|conn| IngredientGroup::update(conn, id, &data))
        .map_err(|e| AppError::from_store(e, FIELDS))?
        .ok_or_else(|| AppError::not_found("Ingredient group", id))
}

pub fn delete_ingredient_group(db: &Database, id: i64) -> AppResult<DeleteResponse> {
    let deleted = db.with_conn(|conn| IngredientGroup::delete(conn, id)).map_err(|e| {
        let err = AppError::from(e);
        if err.kind == ErrorKind::ForeignKeyViolation {
            AppError::new(ErrorKind::ForeignKeyViolation, "Group still has ingredients; move or delete them first")
        } else {
            err
        }
    })?;
    if !deleted {
        return Err(AppError::not_found("Ingredient group", id));
    }
    tracing::info!(id, "deleted ingredient group");
    Ok(DeleteResponse { success: true, deleted_id: id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::test_db;

    fn create(db: &Database, name: &str) -> AppResult<IngredientGroup> {
        create_ingredient_group(
            db,
            IngredientGroupCreate {
                name: name.into(),
                color: None,
            },
        )
    }

    #[test]
    fn test_duplicate_name_reports_field() {
        let (_dir, db) = test_db();
        create(&db, "Proteins").unwrap();
        let err = create(&db, "Proteins").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UniqueViolation);
        assert_eq!(err.field.as_deref(), Some("name"));
    }

    #[test]
    fn test_invalid_color_rejected() {
        let (_dir, db) = test_db();
        let err = create_ingredient_group(
            &db,
            IngredientGroupCreate {
                name: "Fats".into(),
                color: Some("orange".into()),
            },
        )
        .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("color"));
    }

    #[test]
    fn test_delete_with_ingredients_is_fk_violation() {
        let (_dir, db) = test_db();
        let group = create(&db, "Dairy").unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO ingredients (group_id, name, unit_type) VALUES (?1, 'Milk', 'per_100g')",
                [group.id],
            )?;
            Ok(())
        })
        .unwrap();

        let err = delete_ingredient_group(&db, group.id).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ForeignKeyViolation);
        assert_eq!(delete_ingredient_group(&db, 999).unwrap_err().kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_list_and_update() {
        let (_dir, db) = test_db();
        let group = create(&db, "Grains").unwrap();
        let updated = update_ingredient_group(
            &db,
            group.id,
            IngredientGroupUpdate {
                name: None,
                color: Some("#abc".into()),
            },
        )
        .unwrap();
        assert_eq!(updated.color, "#abc");
        assert_eq!(list_ingredient_groups(&db).unwrap().count, 1);
    }
}
