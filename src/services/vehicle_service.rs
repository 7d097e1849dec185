use crate::api::response::Pagination;
use crate::database::{MongoDB, TRANSPORTATION_REQUESTS, VEHICLES};
use crate::models::{CreateVehicleRequest, FuelType, UpdateVehicleRequest, Vehicle, VehicleStatus};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::{now_ms, Validator};
use mongodb::bson::{doc, to_bson, Document};

/// Sem `status` explícito a lista esconde os inativos
#[derive(Debug, Default)]
pub struct VehicleFilter {
    pub company_id: Option<String>,
    pub status: Option<VehicleStatus>,
    pub location_id: Option<String>,
}

impl VehicleFilter {
    pub fn to_document(&self) -> ApiResult<Document> {
        let mut filter = Document::new();
        crud::insert_if_present(&mut filter, "companyId", self.company_id.as_deref());
        crud::insert_if_present(&mut filter, "locationId", self.location_id.as_deref());
        match self.status {
            Some(status) => filter.insert("status", to_bson(&status)?),
            None => filter.insert("status", doc! { "$ne": to_bson(&VehicleStatus::Inactive)? }),
        };
        Ok(filter)
    }
}

pub async fn list_vehicles(
    db: &MongoDB,
    filter: &VehicleFilter,
    pagination: &Pagination,
) -> ApiResult<(Vec<Vehicle>, u64)> {
    crud::find_page(
        &db.collection::<Vehicle>(VEHICLES),
        filter.to_document()?,
        doc! { "brand": 1, "model": 1 },
        pagination,
    )
    .await
}

pub async fn get_vehicle(db: &MongoDB, id: &str) -> ApiResult<Vehicle> {
    let oid = crud::parse_object_id(id, "vehicle")?;
    crud::find_by_id(&db.collection::<Vehicle>(VEHICLES), oid, "Vehicle not found").await
}

pub fn build_vehicle(req: CreateVehicleRequest, created_by: &str, now: i64) -> ApiResult<Vehicle> {
    Validator::new()
        .require_str("companyId", &req.company_id)
        .require_str("licensePlate", &req.license_plate)
        .require_str("brand", &req.brand)
        .require_str("model", &req.model)
        .require("capacity", &req.capacity)
        .check(req.capacity.map_or(true, |c| c > 0), "capacity", "capacity must be greater than 0")
        .finish()?;

    let fuel_type = req.fuel_type.unwrap_or_default();
    Ok(Vehicle {
        id: None,
        vehicle_id: req
            .vehicle_id
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| crud::timestamp_id("VEH", now)),
        company_id: req.company_id.unwrap_or_default(),
        license_plate: req.license_plate.map(|p| p.trim().to_uppercase()).unwrap_or_default(),
        vehicle_type: req.vehicle_type.unwrap_or_default(),
        brand: req.brand.unwrap_or_default(),
        model: req.model.unwrap_or_default(),
        year: req.year,
        capacity: req.capacity.unwrap_or_default(),
        fuel_type,
        is_electric: fuel_type == FuelType::Electric,
        status: req.status.unwrap_or_default(),
        location_id: req.location_id.filter(|l| !l.is_empty()),
        has_gps: req.has_gps.unwrap_or(false),
        has_obd: req.has_obd.unwrap_or(false),
        arduino_device_id: req.arduino_device_id.filter(|a| !a.is_empty()),
        created_at: now,
        updated_at: now,
        created_by: Some(created_by.to_string()),
        updated_by: None,
    })
}

pub async fn create_vehicle(db: &MongoDB, req: CreateVehicleRequest, created_by: &str) -> ApiResult<Vehicle> {
    let mut vehicle = build_vehicle(req, created_by, now_ms())?;
    let vehicles = db.collection::<Vehicle>(VEHICLES);

    if vehicles.find_one(doc! { "vehicleId": &vehicle.vehicle_id }).await?.is_some() {
        return Err(ApiError::validation("Vehicle with this ID already exists"));
    }

    let result = vehicles.insert_one(&vehicle).await?;
    vehicle.id = result.inserted_id.as_object_id();
    log::info!("✅ Vehicle created: {} ({} {})", vehicle.vehicle_id, vehicle.brand, vehicle.model);
    Ok(vehicle)
}

/// Normaliza o patch: placa em maiúsculas, `isElectric` derivado do `fuelType`
pub fn normalize_update(mut req: UpdateVehicleRequest) -> ApiResult<UpdateVehicleRequest> {
    if req.capacity.is_some_and(|c| c <= 0) {
        return Err(ApiError::validation("capacity must be greater than 0"));
    }
    req.license_plate = req.license_plate.map(|p| p.trim().to_uppercase());
    req.is_electric = req.fuel_type.map(|f| f == FuelType::Electric);
    Ok(req)
}

pub async fn update_vehicle(
    db: &MongoDB,
    id: &str,
    req: UpdateVehicleRequest,
    updated_by: &str,
) -> ApiResult<Vehicle> {
    let oid = crud::parse_object_id(id, "vehicle")?;
    let req = normalize_update(req)?;
    let vehicles = db.collection::<Vehicle>(VEHICLES);
    crud::find_by_id(&vehicles, oid, "Vehicle not found").await?;

    let set = crud::set_document(&req, Some(updated_by), now_ms())?;
    vehicles.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    crud::find_by_id(&vehicles, oid, "Vehicle not found").await
}

/// Recusado com viagens abertas usando o veículo
pub async fn delete_vehicle(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "vehicle")?;
    let vehicles = db.collection::<Vehicle>(VEHICLES);
    let existing = crud::find_by_id(&vehicles, oid, "Vehicle not found").await?;

    let open = db
        .collection::<Document>(TRANSPORTATION_REQUESTS)
        .count_documents(doc! {
            "vehicleId": &existing.vehicle_id,
            "status": { "$in": ["pending", "approved", "in_progress"] },
        })
        .await?;
    if open > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete vehicle with {} open trip(s). Set it to inactive instead.",
            open
        )));
    }

    vehicles.delete_one(doc! { "_id": oid }).await?;
    log::info!("🗑️ Vehicle deleted: {}", existing.vehicle_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateVehicleRequest {
        CreateVehicleRequest {
            company_id: Some("IAS".into()),
            license_plate: Some(" dk 1234 ab ".into()),
            brand: Some("Toyota".into()),
            model: Some("Innova".into()),
            capacity: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_vehicle_defaults() {
        let vehicle = build_vehicle(request(), "ADM1", 7).unwrap();
        assert_eq!(vehicle.vehicle_id, "VEH-7");
        assert_eq!(vehicle.license_plate, "DK 1234 AB");
        assert_eq!(vehicle.fuel_type, FuelType::Gasoline);
        assert!(!vehicle.is_electric);
        assert_eq!(vehicle.status, VehicleStatus::Available);

        let json = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(json["hasGPS"], false);
        assert_eq!(json["status"], "available");
    }

    #[test]
    fn test_electric_follows_fuel_type() {
        let ev = CreateVehicleRequest { fuel_type: Some(FuelType::Electric), ..request() };
        assert!(build_vehicle(ev, "ADM1", 0).unwrap().is_electric);

        let patch = normalize_update(UpdateVehicleRequest { fuel_type: Some(FuelType::Diesel), ..Default::default() }).unwrap();
        assert_eq!(patch.is_electric, Some(false));

        let untouched = normalize_update(UpdateVehicleRequest::default()).unwrap();
        assert!(untouched.is_electric.is_none());
    }

    #[test]
    fn test_build_vehicle_rejects_zero_capacity() {
        let req = CreateVehicleRequest { capacity: Some(0), ..request() };
        assert_eq!(build_vehicle(req, "ADM1", 0).unwrap_err().code(), "VALIDATION_ERROR");
        assert!(normalize_update(UpdateVehicleRequest { capacity: Some(-1), ..Default::default() }).is_err());
    }

    #[test]
    fn test_filter_hides_inactive_by_default() {
        let filter = VehicleFilter { company_id: Some("IAS".into()), ..Default::default() };
        assert_eq!(
            filter.to_document().unwrap(),
            doc! { "companyId": "IAS", "status": { "$ne": "inactive" } }
        );

        let in_use = VehicleFilter { status: Some(VehicleStatus::InUse), ..Default::default() };
        assert_eq!(in_use.to_document().unwrap(), doc! { "status": "in-use" });
    }
}
