use crate::api::response::Pagination;
use crate::database::{MongoDB, LOCATIONS, MEETING_ROOMS, VEHICLES};
use crate::models::{CreateLocationRequest, OfficeLocation, UpdateLocationRequest};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::{now_ms, Validator};
use mongodb::bson::{doc, Document};

#[derive(Debug, Default)]
pub struct LocationFilter {
    pub company_id: Option<String>,
    pub is_active: Option<bool>,
}

impl LocationFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        crud::insert_if_present(&mut filter, "companyId", self.company_id.as_deref());
        if let Some(active) = self.is_active {
            filter.insert("isActive", active);
        }
        filter
    }
}

pub async fn list_locations(
    db: &MongoDB,
    filter: &LocationFilter,
    pagination: &Pagination,
) -> ApiResult<(Vec<OfficeLocation>, u64)> {
    crud::find_page(
        &db.collection::<OfficeLocation>(LOCATIONS),
        filter.to_document(),
        doc! { "locationName": 1 },
        pagination,
    )
    .await
}

pub async fn get_location(db: &MongoDB, id: &str) -> ApiResult<OfficeLocation> {
    let oid = crud::parse_object_id(id, "location")?;
    crud::find_by_id(&db.collection::<OfficeLocation>(LOCATIONS), oid, "Location not found").await
}

pub fn build_location(req: CreateLocationRequest, created_by: &str, now: i64) -> ApiResult<OfficeLocation> {
    Validator::new()
        .require_str("locationName", &req.location_name)
        .require_str("address", &req.address)
        .require_str("city", &req.city)
        .check(
            req.latitude.map_or(true, |lat| (-90.0..=90.0).contains(&lat)),
            "latitude",
            "latitude must be between -90 and 90",
        )
        .check(
            req.longitude.map_or(true, |lng| (-180.0..=180.0).contains(&lng)),
            "longitude",
            "longitude must be between -180 and 180",
        )
        .finish()?;

    Ok(OfficeLocation {
        id: None,
        location_id: req
            .location_id
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| crud::timestamp_id("LOC", now)),
        company_id: req.company_id.filter(|c| !c.is_empty()),
        location_name: req.location_name.unwrap_or_default(),
        address: req.address.unwrap_or_default(),
        city: req.city.unwrap_or_default(),
        province: req.province.filter(|p| !p.is_empty()),
        country: req.country.filter(|c| !c.is_empty()).unwrap_or_else(|| "Indonesia".to_string()),
        postal_code: req.postal_code.filter(|p| !p.is_empty()),
        latitude: req.latitude,
        longitude: req.longitude,
        is_active: req.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
        created_by: Some(created_by.to_string()),
        updated_by: None,
    })
}

pub async fn create_location(db: &MongoDB, req: CreateLocationRequest, created_by: &str) -> ApiResult<OfficeLocation> {
    let mut location = build_location(req, created_by, now_ms())?;
    let locations = db.collection::<OfficeLocation>(LOCATIONS);

    if locations.find_one(doc! { "locationId": &location.location_id }).await?.is_some() {
        return Err(ApiError::validation("Location with this ID already exists"));
    }

    let result = locations.insert_one(&location).await?;
    location.id = result.inserted_id.as_object_id();
    log::info!("✅ Location created: {} ({})", location.location_id, location.city);
    Ok(location)
}

pub async fn update_location(
    db: &MongoDB,
    id: &str,
    req: UpdateLocationRequest,
    updated_by: &str,
) -> ApiResult<OfficeLocation> {
    let oid = crud::parse_object_id(id, "location")?;
    let locations = db.collection::<OfficeLocation>(LOCATIONS);
    crud::find_by_id(&locations, oid, "Location not found").await?;

    let set = crud::set_document(&req, Some(updated_by), now_ms())?;
    locations.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    crud::find_by_id(&locations, oid, "Location not found").await
}

/// Recusado com salas ou veículos vinculados
pub async fn delete_location(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "location")?;
    let locations = db.collection::<OfficeLocation>(LOCATIONS);
    let existing = crud::find_by_id(&locations, oid, "Location not found").await?;

    let filter = doc! { "locationId": &existing.location_id };
    let rooms = db.collection::<Document>(MEETING_ROOMS).count_documents(filter.clone()).await?;
    let vehicles = db.collection::<Document>(VEHICLES).count_documents(filter).await?;
    if rooms + vehicles > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete location. {} room(s) and {} vehicle(s) are associated with it.",
            rooms, vehicles
        )));
    }

    locations.delete_one(doc! { "_id": oid }).await?;
    log::info!("🗑️ Location deleted: {}", existing.location_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_location_defaults() {
        let req = CreateLocationRequest {
            location_name: Some("Denpasar HQ".into()),
            address: Some("Jl. Bypass Ngurah Rai".into()),
            city: Some("Denpasar".into()),
            company_id: Some("".into()),
            ..Default::default()
        };
        let location = build_location(req, "ADM1", 42).unwrap();
        assert_eq!(location.location_id, "LOC-42");
        assert!(location.company_id.is_none());
        assert_eq!(location.country, "Indonesia");
        assert!(location.is_active);
    }

    #[test]
    fn test_build_location_rejects_bad_coordinates() {
        let req = CreateLocationRequest {
            location_name: Some("X".into()),
            address: Some("Y".into()),
            city: Some("Z".into()),
            latitude: Some(91.0),
            ..Default::default()
        };
        assert_eq!(build_location(req, "ADM1", 0).unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_filter_document() {
        let filter = LocationFilter { company_id: Some("IAS".into()), is_active: Some(true) };
        assert_eq!(filter.to_document(), doc! { "companyId": "IAS", "isActive": true });
    }
}
