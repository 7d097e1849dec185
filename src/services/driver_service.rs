use crate::api::response::Pagination;
use crate::database::{MongoDB, DRIVERS, TRANSPORTATION_REQUESTS, TRIP_EVENTS};
use crate::middleware::AuthUser;
use crate::models::{
    AssignedTrip, CreateDriverRequest, Driver, DriverAssignments, DriverStatus, RequestStatus, TransportationRequest,
    TripActionRequest, TripEvent, TripEventType, UpdateDriverRequest,
};
use crate::services::{crud, meeting_service};
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::{now_ms, parse_datetime_ms, Validator};
use chrono::Utc;
use mongodb::bson::{doc, to_bson, Document};

const MINUTE_MS: i64 = 60 * 1000;

#[derive(Debug, Default)]
pub struct DriverFilter {
    pub company_id: Option<String>,
    pub status: Option<DriverStatus>,
    pub location_id: Option<String>,
}

impl DriverFilter {
    pub fn to_document(&self) -> ApiResult<Document> {
        let mut filter = Document::new();
        crud::insert_if_present(&mut filter, "companyId", self.company_id.as_deref());
        crud::insert_if_present(&mut filter, "locationId", self.location_id.as_deref());
        match self.status {
            Some(status) => filter.insert("status", to_bson(&status)?),
            None => filter.insert("status", doc! { "$ne": to_bson(&DriverStatus::Inactive)? }),
        };
        Ok(filter)
    }
}

pub async fn list_drivers(db: &MongoDB, filter: &DriverFilter, pagination: &Pagination) -> ApiResult<(Vec<Driver>, u64)> {
    crud::find_page(&db.collection::<Driver>(DRIVERS), filter.to_document()?, doc! { "name": 1 }, pagination).await
}

pub async fn get_driver(db: &MongoDB, id: &str) -> ApiResult<Driver> {
    let oid = crud::parse_object_id(id, "driver")?;
    crud::find_by_id(&db.collection::<Driver>(DRIVERS), oid, "Driver not found").await
}

fn parse_license_expiry(value: &str) -> ApiResult<i64> {
    parse_datetime_ms(value).ok_or_else(|| ApiError::validation("Invalid licenseExpiry date"))
}

fn valid_rating(rating: f64) -> bool {
    (0.0..=5.0).contains(&rating)
}

pub fn build_driver(req: CreateDriverRequest, created_by: &str, now: i64) -> ApiResult<Driver> {
    Validator::new()
        .require_str("userId", &req.user_id)
        .require_str("companyId", &req.company_id)
        .require_str("name", &req.name)
        .require_str("licenseNumber", &req.license_number)
        .require_str("licenseExpiry", &req.license_expiry)
        .finish()?;
    let license_expiry = parse_license_expiry(req.license_expiry.as_deref().unwrap_or_default())?;

    Ok(Driver {
        id: None,
        driver_id: req
            .driver_id
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| crud::timestamp_id("DRV", now)),
        user_id: req.user_id.unwrap_or_default(),
        company_id: req.company_id.unwrap_or_default(),
        name: req.name.unwrap_or_default(),
        email: req.email.filter(|e| !e.is_empty()),
        phone: req.phone.filter(|p| !p.is_empty()),
        license_number: req.license_number.unwrap_or_default(),
        license_type: req.license_type.filter(|t| !t.is_empty()),
        license_expiry,
        status: req.status.unwrap_or_default(),
        location_id: req.location_id.filter(|l| !l.is_empty()),
        assigned_vehicle_id: req.assigned_vehicle_id.filter(|v| !v.is_empty()),
        rating: 0.0,
        created_at: now,
        updated_at: now,
        created_by: Some(created_by.to_string()),
        updated_by: None,
    })
}

pub async fn create_driver(db: &MongoDB, req: CreateDriverRequest, created_by: &str) -> ApiResult<Driver> {
    let mut driver = build_driver(req, created_by, now_ms())?;
    let drivers = db.collection::<Driver>(DRIVERS);

    if drivers.find_one(doc! { "driverId": &driver.driver_id }).await?.is_some() {
        return Err(ApiError::validation("Driver with this ID already exists"));
    }
    if drivers.find_one(doc! { "userId": &driver.user_id }).await?.is_some() {
        return Err(ApiError::validation("This user already has a driver profile"));
    }

    let result = drivers.insert_one(&driver).await?;
    driver.id = result.inserted_id.as_object_id();
    log::info!("✅ Driver created: {} ({})", driver.driver_id, driver.name);
    Ok(driver)
}

/// `$set` do patch com `licenseExpiry` convertido para epoch ms
pub fn driver_update_set(req: &UpdateDriverRequest, updated_by: &str, now: i64) -> ApiResult<Document> {
    if req.rating.is_some_and(|r| !valid_rating(r)) {
        return Err(ApiError::validation("rating must be between 0 and 5"));
    }
    let mut set = crud::set_document(req, Some(updated_by), now)?;
    if let Some(expiry) = req.license_expiry.as_deref() {
        set.insert("licenseExpiry", parse_license_expiry(expiry)?);
    }
    Ok(set)
}

pub async fn update_driver(db: &MongoDB, id: &str, req: UpdateDriverRequest, updated_by: &str) -> ApiResult<Driver> {
    let oid = crud::parse_object_id(id, "driver")?;
    let set = driver_update_set(&req, updated_by, now_ms())?;
    let drivers = db.collection::<Driver>(DRIVERS);
    crud::find_by_id(&drivers, oid, "Driver not found").await?;

    drivers.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    crud::find_by_id(&drivers, oid, "Driver not found").await
}

pub async fn delete_driver(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "driver")?;
    let drivers = db.collection::<Driver>(DRIVERS);
    let existing = crud::find_by_id(&drivers, oid, "Driver not found").await?;

    let open = db
        .collection::<Document>(TRANSPORTATION_REQUESTS)
        .count_documents(doc! {
            "driverId": &existing.user_id,
            "status": { "$in": ["approved", "in_progress"] },
        })
        .await?;
    if open > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete driver with {} assigned trip(s). Set it to inactive instead.",
            open
        )));
    }

    drivers.delete_one(doc! { "_id": oid }).await?;
    log::info!("🗑️ Driver deleted: {}", existing.driver_id);
    Ok(())
}

// ==================== Viagens do motorista ====================

/// Passageiro exibido = solicitante do pedido
pub fn assigned_trip(request: TransportationRequest) -> AssignedTrip {
    AssignedTrip {
        id: request.id.map(|id| id.to_hex()).unwrap_or_default(),
        request_number: request.request_number,
        transport_type: request.transport_type,
        status: request.status,
        scheduled_time: request.scheduled_time,
        return_time: request.return_time,
        is_round_trip: request.is_round_trip,
        pickup: request.pickup,
        destination: request.destination,
        passenger_name: request.requester.user_name,
        passenger_email: request.requester.user_email,
        passenger_count: request.passenger_count,
        passengers: request.passengers,
        purpose: request.purpose,
        special_requirements: request.special_requirements,
        vehicle_id: request.vehicle_id,
    }
}

async fn driver_profile(db: &MongoDB, user: &AuthUser) -> ApiResult<Driver> {
    db.collection::<Driver>(DRIVERS)
        .find_one(doc! { "userId": &user.user_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Driver profile not found".to_string()))
}

/// Viagens atribuídas ao motorista no dia (`date` ausente = hoje, UTC)
pub async fn driver_assignments(db: &MongoDB, user: &AuthUser, date: Option<&str>) -> ApiResult<DriverAssignments> {
    user.require_driver()?;
    let profile = driver_profile(db, user).await?;

    let date = date
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
    let (start, end) = meeting_service::day_bounds(&date)?;

    let requests = crud::find_all(
        &db.collection::<TransportationRequest>(TRANSPORTATION_REQUESTS),
        doc! {
            "driverId": &user.user_id,
            "status": { "$in": ["approved", "in_progress", "completed"] },
            "scheduledTime": { "$gte": start, "$lt": end },
        },
        doc! { "scheduledTime": 1 },
    )
    .await?;

    let trips: Vec<AssignedTrip> = requests.into_iter().map(assigned_trip).collect();
    Ok(DriverAssignments {
        date,
        driver_id: profile.driver_id,
        driver_name: profile.name,
        assigned_vehicle_id: profile.assigned_vehicle_id,
        total_trips: trips.len(),
        trips,
    })
}

/// Atraso da partida em minutos inteiros; adiantado conta como zero
pub fn delay_minutes(scheduled: i64, now: i64) -> i64 {
    ((now - scheduled).max(0)) / MINUTE_MS
}

pub fn trip_duration_minutes(started_at: i64, now: i64) -> i64 {
    ((now - started_at).max(0)) / MINUTE_MS
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(*err.kind, ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == 11000)
}

async fn assigned_request(
    db: &MongoDB,
    user: &AuthUser,
    id: &str,
) -> ApiResult<(mongodb::bson::oid::ObjectId, TransportationRequest)> {
    user.require_driver()?;
    let oid = crud::parse_object_id(id, "request")?;
    let request = crud::find_by_id(
        &db.collection::<TransportationRequest>(TRANSPORTATION_REQUESTS),
        oid,
        "Request not found",
    )
    .await?;
    if request.driver_id.as_deref() != Some(user.user_id.as_str()) {
        return Err(ApiError::Forbidden("Not assigned to this trip".to_string()));
    }
    Ok((oid, request))
}

fn trip_event(
    id: &str,
    request: &TransportationRequest,
    user: &AuthUser,
    event_type: TripEventType,
    body: TripActionRequest,
    now: i64,
) -> TripEvent {
    TripEvent {
        id: None,
        trip_id: id.to_string(),
        request_id: id.to_string(),
        driver_id: user.user_id.clone(),
        vehicle_id: request.vehicle_id.clone().unwrap_or_default(),
        event_type,
        timestamp: now,
        location: body.location,
        scheduled_time: Some(request.scheduled_time),
        actual_time: now,
        delay_minutes: None,
        notes: body.notes.filter(|n| !n.is_empty()),
        photos: body.photos,
        created_at: now,
        updated_at: now,
        created_by: user.user_id.clone(),
    }
}

async fn insert_event(db: &MongoDB, event: &mut TripEvent, duplicate_message: &str) -> ApiResult<()> {
    match db.collection::<TripEvent>(TRIP_EVENTS).insert_one(&*event).await {
        Ok(result) => {
            event.id = result.inserted_id.as_object_id();
            Ok(())
        }
        Err(e) if is_duplicate_key(&e) => Err(ApiError::Conflict(duplicate_message.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Partida (ATD): só o motorista atribuído, uma vez por viagem
pub async fn start_trip(db: &MongoDB, user: &AuthUser, id: &str, body: TripActionRequest) -> ApiResult<TripEvent> {
    let (oid, request) = assigned_request(db, user, id).await?;
    let events = db.collection::<TripEvent>(TRIP_EVENTS);

    if events.find_one(doc! { "requestId": id, "eventType": TripEventType::Started.as_str() }).await?.is_some() {
        return Err(ApiError::Conflict("Trip already started".to_string()));
    }
    if request.status != RequestStatus::Approved {
        return Err(ApiError::Conflict(format!("Trip is {}, only approved trips can start", request.status.as_str())));
    }

    let now = now_ms();
    let mut event = trip_event(id, &request, user, TripEventType::Started, body, now);
    event.delay_minutes = Some(delay_minutes(request.scheduled_time, now));
    insert_event(db, &mut event, "Trip already started").await?;

    let set = doc! { "status": RequestStatus::InProgress.as_str(), "updatedAt": now, "updatedBy": &user.user_id };
    crud::guarded_status_update(&db.collection::<Document>(TRANSPORTATION_REQUESTS), oid, request.status, set).await?;

    log::info!("🚗 Trip started: {} by {} ({} min late)", request.request_number, user.user_id, event.delay_minutes.unwrap_or(0));
    Ok(event)
}

/// Chegada (ATA); devolve o evento e a duração em minutos desde a partida
pub async fn complete_trip(
    db: &MongoDB,
    user: &AuthUser,
    id: &str,
    body: TripActionRequest,
) -> ApiResult<(TripEvent, i64)> {
    let (oid, request) = assigned_request(db, user, id).await?;
    let events = db.collection::<TripEvent>(TRIP_EVENTS);

    let started = events
        .find_one(doc! { "requestId": id, "eventType": TripEventType::Started.as_str() })
        .await?
        .ok_or_else(|| ApiError::BadRequest("Trip must be started first".to_string()))?;
    if events.find_one(doc! { "requestId": id, "eventType": TripEventType::Completed.as_str() }).await?.is_some() {
        return Err(ApiError::Conflict("Trip already completed".to_string()));
    }

    let now = now_ms();
    let mut event = trip_event(id, &request, user, TripEventType::Completed, body, now);
    insert_event(db, &mut event, "Trip already completed").await?;

    let set = doc! { "status": RequestStatus::Completed.as_str(), "updatedAt": now, "updatedBy": &user.user_id };
    crud::guarded_status_update(&db.collection::<Document>(TRANSPORTATION_REQUESTS), oid, request.status, set).await?;

    let duration = trip_duration_minutes(started.actual_time, now);
    log::info!("🏁 Trip completed: {} in {} min", request.request_number, duration);
    Ok((event, duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, Requester, TransportType};

    fn driver_request() -> CreateDriverRequest {
        CreateDriverRequest {
            user_id: Some("E900".into()),
            company_id: Some("IAS".into()),
            name: Some("Made".into()),
            license_number: Some("SIM-123".into()),
            license_expiry: Some("2027-06-30".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_driver() {
        let driver = build_driver(driver_request(), "ADM1", 5).unwrap();
        assert_eq!(driver.driver_id, "DRV-5");
        assert_eq!(driver.license_expiry, parse_datetime_ms("2027-06-30").unwrap());
        assert_eq!(driver.status, DriverStatus::Available);
        assert_eq!(driver.rating, 0.0);

        let bad = CreateDriverRequest { license_expiry: Some("someday".into()), ..driver_request() };
        assert_eq!(build_driver(bad, "ADM1", 0).unwrap_err().to_string(), "Invalid licenseExpiry date");
    }

    #[test]
    fn test_driver_update_set_converts_expiry() {
        let req = UpdateDriverRequest {
            license_expiry: Some("2028-01-01".into()),
            status: Some(DriverStatus::OnLeave),
            ..Default::default()
        };
        let set = driver_update_set(&req, "ADM1", 9).unwrap();
        assert_eq!(set.get_i64("licenseExpiry").unwrap(), parse_datetime_ms("2028-01-01").unwrap());
        assert_eq!(set.get_str("status").unwrap(), "on-leave");
        assert_eq!(set.get_str("updatedBy").unwrap(), "ADM1");

        let rating = UpdateDriverRequest { rating: Some(6.0), ..Default::default() };
        assert!(driver_update_set(&rating, "ADM1", 9).is_err());
    }

    #[test]
    fn test_delay_and_duration_minutes() {
        let scheduled = 1_700_000_000_000;
        assert_eq!(delay_minutes(scheduled, scheduled - 5 * MINUTE_MS), 0);
        assert_eq!(delay_minutes(scheduled, scheduled + 59_999), 0);
        assert_eq!(delay_minutes(scheduled, scheduled + 12 * MINUTE_MS + 30_000), 12);
        assert_eq!(trip_duration_minutes(scheduled, scheduled + 45 * MINUTE_MS), 45);
    }

    #[test]
    fn test_assigned_trip_uses_requester_as_passenger() {
        let id = mongodb::bson::oid::ObjectId::new();
        let place = |a: &str| Location { address: a.into(), latitude: None, longitude: None, notes: None };
        let request = TransportationRequest {
            id: Some(id),
            request_number: "TR-20260101-0001".into(),
            transport_type: TransportType::CompanyCar,
            requester: Requester {
                user_id: "E001".into(),
                user_name: "Ayu".into(),
                user_email: "ayu@ias.id".into(),
                company_id: "IAS".into(),
                department_id: None,
            },
            pickup: place("Office"),
            destination: place("Airport"),
            scheduled_time: 10,
            return_time: None,
            is_round_trip: false,
            passenger_count: 2,
            passengers: vec!["Ayu".into(), "Komang".into()],
            purpose_id: None,
            purpose: "Airport Transfer".into(),
            priority: Default::default(),
            special_requirements: None,
            needs_driver: Some(true),
            driver_should_wait: None,
            status: RequestStatus::Approved,
            approval: Default::default(),
            vehicle_id: Some("VEH-1".into()),
            driver_id: Some("E900".into()),
            assigned_at: None,
            voucher_code: None,
            voucher_amount: None,
            voucher_provider: None,
            transport_company_id: None,
            created_at: 0,
            updated_at: 0,
            created_by: None,
            updated_by: None,
        };

        let trip = assigned_trip(request);
        assert_eq!(trip.id, id.to_hex());
        assert_eq!(trip.passenger_name, "Ayu");
        assert_eq!(trip.passenger_email, "ayu@ias.id");

        let json = serde_json::to_value(&trip).unwrap();
        assert_eq!(json["type"], "company_car");
        assert_eq!(json["vehicleId"], "VEH-1");
    }

    #[tokio::test]
    #[ignore]
    async fn test_second_start_conflicts() {
        let db = MongoDB::new("mongodb://localhost:27017", "ofm_test").await.unwrap();
        let user = AuthUser {
            user_id: format!("DRV-T-{}", now_ms()),
            email: "driver@ias.id".into(),
            name: Some("Driver".into()),
            roles: vec!["driver".into()],
            company_id: Some("IAS".into()),
            company_access: vec![],
        };
        let id = mongodb::bson::oid::ObjectId::new();
        db.collection::<Document>(TRANSPORTATION_REQUESTS)
            .insert_one(doc! {
                "_id": id,
                "requestNumber": format!("TR-T-{}", id.to_hex()),
                "type": "company_car",
                "userId": "E001",
                "userName": "Ayu",
                "userEmail": "ayu@ias.id",
                "companyId": "IAS",
                "pickup": { "address": "Office" },
                "destination": { "address": "Airport" },
                "scheduledTime": now_ms(),
                "passengerCount": 1,
                "purpose": "Airport Transfer",
                "status": "approved",
                "driverId": &user.user_id,
                "createdAt": now_ms(),
                "updatedAt": now_ms(),
            })
            .await
            .unwrap();

        let hex = id.to_hex();
        start_trip(&db, &user, &hex, TripActionRequest::default()).await.unwrap();
        let again = start_trip(&db, &user, &hex, TripActionRequest::default()).await.unwrap_err();
        assert_eq!(again.code(), "CONFLICT");

        let other = AuthUser { user_id: "someone-else".into(), ..user.clone() };
        let err = complete_trip(&db, &other, &hex, TripActionRequest::default()).await.unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        let (_, duration) = complete_trip(&db, &user, &hex, TripActionRequest::default()).await.unwrap();
        assert!(duration >= 0);
    }
}
