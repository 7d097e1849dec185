use crate::api::response::Pagination;
use crate::database::{MongoDB, POSITIONS, USERS};
use crate::models::{CreatePositionRequest, Position, UpdatePositionRequest};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::{now_ms, Validator};
use mongodb::bson::{doc, Document};

#[derive(Debug, Default)]
pub struct PositionFilter {
    pub company_id: Option<String>,
    pub level: Option<i32>,
    pub grade: Option<String>,
    pub is_active: Option<bool>,
}

impl PositionFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        crud::insert_if_present(&mut filter, "companyId", self.company_id.as_deref());
        crud::insert_if_present(&mut filter, "grade", self.grade.as_deref());
        if let Some(level) = self.level {
            filter.insert("level", level);
        }
        if let Some(active) = self.is_active {
            filter.insert("isActive", active);
        }
        filter
    }
}

pub async fn list_positions(db: &MongoDB, filter: &PositionFilter, pagination: &Pagination) -> ApiResult<(Vec<Position>, u64)> {
    // Cargos mais altos primeiro
    crud::find_page(
        &db.collection::<Position>(POSITIONS),
        filter.to_document(),
        doc! { "level": -1, "positionName": 1 },
        pagination,
    )
    .await
}

pub async fn get_position(db: &MongoDB, id: &str) -> ApiResult<Position> {
    let oid = crud::parse_object_id(id, "position")?;
    crud::find_by_id(&db.collection::<Position>(POSITIONS), oid, "Position not found").await
}

pub async fn create_position(db: &MongoDB, req: CreatePositionRequest, created_by: &str) -> ApiResult<Position> {
    Validator::new()
        .require_str("positionId", &req.position_id)
        .require_str("positionName", &req.position_name)
        .require_str("companyId", &req.company_id)
        .finish()?;

    let position_id = req.position_id.unwrap_or_default().trim().to_string();
    let positions = db.collection::<Position>(POSITIONS);

    if positions.find_one(doc! { "positionId": &position_id }).await?.is_some() {
        return Err(ApiError::validation("Position with this ID already exists"));
    }

    let now = now_ms();
    let mut position = Position {
        id: None,
        code: req.code.filter(|c| !c.is_empty()).unwrap_or_else(|| position_id.clone()),
        position_id,
        position_name: req.position_name.unwrap_or_default(),
        level: req.level.unwrap_or(1),
        grade: req.grade,
        company_id: req.company_id.unwrap_or_default(),
        sso_position_id: req.sso_position_id,
        is_active: req.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
        created_by: Some(created_by.to_string()),
        updated_by: None,
    };

    let result = positions.insert_one(&position).await?;
    position.id = result.inserted_id.as_object_id();
    log::info!("✅ Position created: {}", position.position_id);
    Ok(position)
}

pub async fn update_position(db: &MongoDB, id: &str, req: UpdatePositionRequest, updated_by: &str) -> ApiResult<Position> {
    let oid = crud::parse_object_id(id, "position")?;
    let positions = db.collection::<Position>(POSITIONS);
    let existing = crud::find_by_id(&positions, oid, "Position not found").await?;

    if let Some(new_id) = req.position_id.as_deref().filter(|n| *n != existing.position_id) {
        if positions.find_one(doc! { "positionId": new_id }).await?.is_some() {
            return Err(ApiError::validation("Position with this ID already exists"));
        }
    }

    let set = crud::set_document(&req, Some(updated_by), now_ms())?;
    positions.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    crud::find_by_id(&positions, oid, "Position not found").await
}

pub async fn delete_position(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "position")?;
    let positions = db.collection::<Position>(POSITIONS);
    let existing = crud::find_by_id(&positions, oid, "Position not found").await?;

    let users = db
        .collection::<Document>(USERS)
        .count_documents(doc! { "positionId": &existing.position_id })
        .await?;
    if users > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete position. {} user(s) are associated with it.",
            users
        )));
    }

    positions.delete_one(doc! { "_id": oid }).await?;
    log::info!("🗑️ Position deleted: {}", existing.position_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_document() {
        let filter = PositionFilter {
            company_id: None,
            level: Some(3),
            grade: Some("G7".into()),
            is_active: Some(true),
        };
        assert_eq!(filter.to_document(), doc! { "grade": "G7", "level": 3, "isActive": true });
    }
}
