use crate::api::response::Pagination;
use crate::database::{MongoDB, TRANSPORTATION_REQUESTS, TRIP_PURPOSES};
use crate::models::{CreateTripPurposeRequest, TripPurpose, UpdateTripPurposeRequest};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::now_ms;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

const ID_PREFIX: &str = "TP";
const NOT_FOUND: &str = "Trip purpose not found";

/// Todas as operações ficam no escopo da empresa do usuário
fn scoped(id: ObjectId, company_id: &str) -> Document {
    doc! { "_id": id, "companyId": company_id }
}

pub async fn list_trip_purposes(
    db: &MongoDB,
    company_id: &str,
    is_active: Option<bool>,
    pagination: &Pagination,
) -> ApiResult<(Vec<TripPurpose>, u64)> {
    let mut filter = doc! { "companyId": company_id };
    if let Some(active) = is_active {
        filter.insert("isActive", active);
    }
    crud::find_page(
        &db.collection::<TripPurpose>(TRIP_PURPOSES),
        filter,
        doc! { "sortOrder": 1, "name": 1 },
        pagination,
    )
    .await
}

pub async fn get_trip_purpose(db: &MongoDB, company_id: &str, id: &str) -> ApiResult<TripPurpose> {
    let oid = crud::parse_object_id(id, "trip purpose")?;
    db.collection::<TripPurpose>(TRIP_PURPOSES)
        .find_one(scoped(oid, company_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

pub fn build_trip_purpose(
    req: CreateTripPurposeRequest,
    purpose_id: String,
    company_id: &str,
    created_by: &str,
    now: i64,
) -> ApiResult<TripPurpose> {
    let name = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let (Some(name), Some(category)) = (name, req.category) else {
        return Err(ApiError::BadRequest("Name and category are required".to_string()));
    };

    Ok(TripPurpose {
        id: None,
        purpose_id,
        name,
        category,
        description: req.description.filter(|d| !d.is_empty()),
        requires_approval: req.requires_approval.unwrap_or(false),
        is_active: true,
        sort_order: req.sort_order.filter(|s| *s > 0).unwrap_or(999),
        company_id: company_id.to_string(),
        created_at: now,
        updated_at: now,
        created_by: Some(created_by.to_string()),
        updated_by: Some(created_by.to_string()),
    })
}

pub async fn create_trip_purpose(
    db: &MongoDB,
    req: CreateTripPurposeRequest,
    company_id: &str,
    created_by: &str,
) -> ApiResult<TripPurpose> {
    let existing: Vec<Document> = db
        .collection::<Document>(TRIP_PURPOSES)
        .find(doc! { "companyId": company_id })
        .projection(doc! { "purposeId": 1, "_id": 0 })
        .await?
        .try_collect()
        .await?;
    let purpose_id = crud::next_sequence_id(
        ID_PREFIX,
        crud::highest_sequence_id(ID_PREFIX, existing.iter().filter_map(|d| d.get_str("purposeId").ok())),
    );

    let mut purpose = build_trip_purpose(req, purpose_id, company_id, created_by, now_ms())?;
    let result = db.collection::<TripPurpose>(TRIP_PURPOSES).insert_one(&purpose).await?;
    purpose.id = result.inserted_id.as_object_id();
    log::info!("✅ Trip purpose created: {} ({})", purpose.purpose_id, purpose.name);
    Ok(purpose)
}

pub async fn update_trip_purpose(
    db: &MongoDB,
    company_id: &str,
    id: &str,
    req: UpdateTripPurposeRequest,
    updated_by: &str,
) -> ApiResult<TripPurpose> {
    let oid = crud::parse_object_id(id, "trip purpose")?;
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::BadRequest("Name cannot be empty".to_string()));
    }

    let purposes = db.collection::<TripPurpose>(TRIP_PURPOSES);
    let set = crud::set_document(&req, Some(updated_by), now_ms())?;
    let result = purposes.update_one(scoped(oid, company_id), doc! { "$set": set }).await?;
    if result.matched_count == 0 {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }
    get_trip_purpose(db, company_id, id).await
}

/// Recusado quando algum pedido de transporte usa o motivo
pub async fn delete_trip_purpose(db: &MongoDB, company_id: &str, id: &str) -> ApiResult<()> {
    let existing = get_trip_purpose(db, company_id, id).await?;

    let used = db
        .collection::<Document>(TRANSPORTATION_REQUESTS)
        .count_documents(doc! { "purposeId": &existing.purpose_id })
        .await?;
    if used > 0 {
        return Err(ApiError::BadRequest(format!(
            "Cannot delete. This purpose is used by {} transportation request(s). Please set it as inactive instead.",
            used
        )));
    }

    if let Some(oid) = existing.id {
        db.collection::<TripPurpose>(TRIP_PURPOSES).delete_one(scoped(oid, company_id)).await?;
    }
    log::info!("🗑️ Trip purpose deleted: {}", existing.purpose_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PurposeCategory;

    #[test]
    fn test_build_trip_purpose_defaults() {
        let req = CreateTripPurposeRequest {
            name: Some(" Site Visit ".into()),
            category: Some(PurposeCategory::Business),
            sort_order: Some(0),
            ..Default::default()
        };
        let purpose = build_trip_purpose(req, "TP-011".into(), "IAS", "ADM1", 1).unwrap();
        assert_eq!(purpose.name, "Site Visit");
        assert_eq!(purpose.sort_order, 999);
        assert!(purpose.is_active);
        assert!(!purpose.requires_approval);
        assert_eq!(purpose.company_id, "IAS");
    }

    #[test]
    fn test_build_requires_name_and_category() {
        let req = CreateTripPurposeRequest { name: Some("Lunch".into()), ..Default::default() };
        let err = build_trip_purpose(req, "TP-001".into(), "IAS", "ADM1", 0).unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
        assert_eq!(err.to_string(), "Name and category are required");
    }

    #[test]
    fn test_scoped_filter() {
        let id = ObjectId::new();
        assert_eq!(scoped(id, "IAS"), doc! { "_id": id, "companyId": "IAS" });
    }
}
