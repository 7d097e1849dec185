use crate::api::response::Pagination;
use crate::database::{MongoDB, TRANSPORTATION_REQUESTS};
use crate::middleware::AuthUser;
use crate::models::{
    check_transition, Approval, CreateTransportRequest, RequestStatus, TransportType, TransportationRequest,
    UpdateTransportRequest,
};
use crate::services::{crud, voucher_service};
use crate::utils::error::{ApiError, ApiResult, FieldError};
use crate::utils::validation::{now_ms, parse_datetime_ms, Validator};
use chrono::Utc;
use mongodb::bson::{doc, to_bson, Document};

#[derive(Debug, Default)]
pub struct TransportFilter {
    pub status: Option<RequestStatus>,
    pub transport_type: Option<TransportType>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub user_id: Option<String>,
}

impl TransportFilter {
    /// Não-admin só enxerga os próprios pedidos, qualquer que seja o `userId` pedido
    pub fn to_document(&self, user: &AuthUser) -> ApiResult<Document> {
        let mut filter = Document::new();
        if user.is_admin() {
            crud::insert_if_present(&mut filter, "userId", self.user_id.as_deref());
        } else {
            filter.insert("userId", &user.user_id);
        }
        if let Some(status) = self.status {
            filter.insert("status", to_bson(&status)?);
        }
        if let Some(t) = self.transport_type {
            filter.insert("type", to_bson(&t)?);
        }
        if let Some(range) = crud::date_range(self.start_date, self.end_date) {
            filter.insert("scheduledTime", range);
        }
        Ok(filter)
    }
}

fn parse_schedule(req: &CreateTransportRequest) -> ApiResult<(i64, Option<i64>)> {
    let scheduled = req
        .scheduled_time
        .as_deref()
        .and_then(parse_datetime_ms)
        .ok_or_else(|| ApiError::validation_failed(vec![FieldError::new("scheduledTime", "Invalid date format")]))?;

    let returning = match req.return_time.as_deref().filter(|r| !r.is_empty()) {
        None => None,
        Some(raw) => {
            let ms = parse_datetime_ms(raw).ok_or_else(|| {
                ApiError::validation_failed(vec![FieldError::new("returnTime", "Invalid date format")])
            })?;
            if ms < scheduled {
                return Err(ApiError::validation_failed(vec![FieldError::new(
                    "returnTime",
                    "Return time must be after scheduled time",
                )]));
            }
            Some(ms)
        }
    };
    Ok((scheduled, returning))
}

pub fn build_transport_request(
    user: &AuthUser,
    req: CreateTransportRequest,
    default_company_id: &str,
    request_number: String,
    now: i64,
) -> ApiResult<TransportationRequest> {
    let pickup_ok = req.pickup.as_ref().map_or(true, |p| !p.address.trim().is_empty());
    let destination_ok = req.destination.as_ref().map_or(true, |d| !d.address.trim().is_empty());
    Validator::new()
        .require("type", &req.transport_type)
        .require("pickup", &req.pickup)
        .require("destination", &req.destination)
        .require_str("scheduledTime", &req.scheduled_time)
        .require_str("purpose", &req.purpose)
        .check(pickup_ok, "pickup", "pickup.address is required")
        .check(destination_ok, "destination", "destination.address is required")
        .finish()?;

    let (scheduled_time, return_time) = parse_schedule(&req)?;
    let (Some(transport_type), Some(pickup), Some(destination)) = (req.transport_type, req.pickup, req.destination)
    else {
        return Err(ApiError::validation("Validation failed"));
    };

    Ok(TransportationRequest {
        id: None,
        request_number,
        transport_type,
        requester: crud::requester_for(user, req.department_id, default_company_id),
        pickup,
        destination,
        scheduled_time,
        return_time,
        is_round_trip: req.is_round_trip.unwrap_or(false),
        passenger_count: req.passenger_count.filter(|c| *c > 0).unwrap_or(1),
        passengers: req.passengers.unwrap_or_default(),
        purpose_id: req.purpose_id,
        purpose: req.purpose.unwrap_or_default(),
        priority: req.priority.unwrap_or_default(),
        special_requirements: req.special_requirements,
        needs_driver: req.needs_driver,
        driver_should_wait: req.driver_should_wait,
        status: RequestStatus::Pending,
        approval: Approval::default(),
        vehicle_id: None,
        driver_id: None,
        assigned_at: None,
        voucher_code: None,
        voucher_amount: None,
        voucher_provider: None,
        transport_company_id: None,
        created_at: now,
        updated_at: now,
        created_by: Some(user.user_id.clone()),
        updated_by: None,
    })
}

pub async fn create_transport_request(
    db: &MongoDB,
    user: &AuthUser,
    req: CreateTransportRequest,
    default_company_id: &str,
) -> ApiResult<TransportationRequest> {
    let number = crud::request_number("TR", Utc::now())?;
    let mut request = build_transport_request(user, req, default_company_id, number, now_ms())?;

    let result = db
        .collection::<TransportationRequest>(TRANSPORTATION_REQUESTS)
        .insert_one(&request)
        .await?;
    request.id = result.inserted_id.as_object_id();
    log::info!("✅ Transport request {} created by {}", request.request_number, user.user_id);
    Ok(request)
}

pub async fn list_transport_requests(
    db: &MongoDB,
    user: &AuthUser,
    filter: &TransportFilter,
    pagination: &Pagination,
) -> ApiResult<(Vec<TransportationRequest>, u64)> {
    let query = filter.to_document(user)?;
    log::debug!("🔍 Transport requests query for {} (admin: {}): {}", user.email, user.is_admin(), query);
    crud::find_page(
        &db.collection::<TransportationRequest>(TRANSPORTATION_REQUESTS),
        query,
        doc! { "createdAt": -1 },
        pagination,
    )
    .await
}

pub async fn get_transport_request(db: &MongoDB, user: &AuthUser, id: &str) -> ApiResult<TransportationRequest> {
    let oid = crud::parse_object_id(id, "request")?;
    let request = crud::find_by_id(
        &db.collection::<TransportationRequest>(TRANSPORTATION_REQUESTS),
        oid,
        "Request not found",
    )
    .await?;

    if request.requester.user_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(request)
}

/// `$set` do PATCH. Atribuição de carro/voucher só entra na aprovação.
pub fn transport_update_set(target: RequestStatus, actor: &AuthUser, req: &UpdateTransportRequest, now: i64) -> Document {
    let mut set = crud::status_set(target, actor, req.rejection_reason.as_deref(), now);
    if target == RequestStatus::Approved {
        crud::insert_if_present(&mut set, "vehicleId", req.vehicle_id.as_deref());
        crud::insert_if_present(&mut set, "driverId", req.driver_id.as_deref());
        if set.contains_key("vehicleId") || set.contains_key("driverId") {
            set.insert("assignedAt", now);
        }
        crud::insert_if_present(&mut set, "voucherCode", req.voucher_code.as_deref());
        if let Some(amount) = req.voucher_amount {
            set.insert("voucherAmount", amount);
        }
        let provider = req.voucher_provider.as_deref().map(str::to_lowercase);
        crud::insert_if_present(&mut set, "voucherProvider", provider.as_deref());
        crud::insert_if_present(&mut set, "transportCompanyId", req.transport_company_id.as_deref());
    }
    set
}

pub async fn update_transport_request(
    db: &MongoDB,
    user: &AuthUser,
    id: &str,
    req: UpdateTransportRequest,
) -> ApiResult<TransportationRequest> {
    let oid = crud::parse_object_id(id, "request")?;
    let Some(target) = req.status else {
        return Err(ApiError::validation_failed(vec![FieldError::new("status", "status is required")]));
    };

    let requests = db.collection::<TransportationRequest>(TRANSPORTATION_REQUESTS);
    let existing = crud::find_by_id(&requests, oid, "Request not found").await?;
    let is_owner = existing.requester.user_id == user.user_id;
    check_transition(existing.status, target, user.is_admin(), is_owner)?;

    // O voucher é consumido antes de gravar a aprovação: código inválido não aprova
    let mut consumed_voucher = None;
    if target == RequestStatus::Approved && existing.transport_type == TransportType::Voucher {
        if let Some(code) = req.voucher_code.as_deref().filter(|c| !c.is_empty()) {
            voucher_service::mark_voucher_used(db, code, &existing.requester.user_id, &oid.to_hex()).await?;
            consumed_voucher = Some(code.to_string());
        }
    }

    let set = transport_update_set(target, user, &req, now_ms());
    if let Err(e) = crud::guarded_status_update(&requests, oid, existing.status, set).await {
        if let Some(code) = consumed_voucher.as_deref() {
            voucher_service::release_voucher(db, code, &oid.to_hex()).await?;
        }
        return Err(e);
    }
    log::info!("✅ Transport request {} -> {} by {}", existing.request_number, target.as_str(), user.user_id);

    crud::find_by_id(&requests, oid, "Request not found").await
}

/// DELETE = cancelamento lógico
pub async fn cancel_transport_request(db: &MongoDB, user: &AuthUser, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "request")?;
    let requests = db.collection::<TransportationRequest>(TRANSPORTATION_REQUESTS);
    let existing = crud::find_by_id(&requests, oid, "Request not found").await?;

    if existing.requester.user_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    check_transition(existing.status, RequestStatus::Cancelled, user.is_admin(), true)?;

    let set = crud::status_set(RequestStatus::Cancelled, user, None, now_ms());
    crud::guarded_status_update(&requests, oid, existing.status, set).await?;
    log::info!("🗑️ Transport request {} cancelled by {}", existing.request_number, user.user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, Priority};

    fn user(id: &str, roles: &[&str]) -> AuthUser {
        AuthUser {
            user_id: id.into(),
            email: format!("{}@ias.co.id", id.to_lowercase()),
            name: Some("Budi".into()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            company_id: Some("IAS".into()),
            company_access: vec![],
        }
    }

    fn location(address: &str) -> Location {
        Location { address: address.into(), latitude: None, longitude: None, notes: None }
    }

    fn create_body() -> CreateTransportRequest {
        CreateTransportRequest {
            transport_type: Some(TransportType::CompanyCar),
            pickup: Some(location("Terminal 1")),
            destination: Some(location("Kantor Pusat")),
            scheduled_time: Some("2025-10-16T08:00:00Z".into()),
            purpose: Some("Client visit".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_applies_defaults() {
        let req = build_transport_request(&user("E001", &[]), create_body(), "IAS", "TR-20251016-0001".into(), 9).unwrap();
        assert_eq!(req.status, RequestStatus::Pending);
        assert_eq!(req.passenger_count, 1);
        assert_eq!(req.priority, Priority::Medium);
        assert_eq!(req.requester.user_name, "Budi");
        assert_eq!(req.scheduled_time, 1_760_601_600_000);
        assert_eq!(req.created_by.as_deref(), Some("E001"));
    }

    #[test]
    fn test_build_reports_missing_fields() {
        let err = build_transport_request(&user("E001", &[]), CreateTransportRequest::default(), "IAS", "x".into(), 0)
            .unwrap_err();
        match err {
            ApiError::Validation { details, .. } => {
                let fields: Vec<&str> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["type", "pickup", "destination", "scheduledTime", "purpose"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_invalid_date() {
        let mut body = create_body();
        body.scheduled_time = Some("tomorrow".into());
        let err = build_transport_request(&user("E001", &[]), body, "IAS", "x".into(), 0).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_build_rejects_return_before_departure() {
        let mut body = create_body();
        body.return_time = Some("2025-10-16T07:00:00Z".into());
        let err = build_transport_request(&user("E001", &[]), body, "IAS", "x".into(), 0).unwrap_err();
        match err {
            ApiError::Validation { details, .. } => assert_eq!(details[0].field, "returnTime"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_admin_filter_is_forced_to_own_user() {
        let filter = TransportFilter { user_id: Some("OTHER".into()), ..Default::default() };
        let doc = filter.to_document(&user("E001", &["employee"])).unwrap();
        assert_eq!(doc.get_str("userId").unwrap(), "E001");

        let doc = filter.to_document(&user("ADM", &["admin"])).unwrap();
        assert_eq!(doc.get_str("userId").unwrap(), "OTHER");
    }

    #[test]
    fn test_filter_with_status_type_and_range() {
        let filter = TransportFilter {
            status: Some(RequestStatus::Approved),
            transport_type: Some(TransportType::Voucher),
            start_date: Some(10),
            end_date: Some(20),
            user_id: None,
        };
        let doc = filter.to_document(&user("ADM", &["super_admin"])).unwrap();
        assert_eq!(
            doc,
            doc! { "status": "approved", "type": "voucher", "scheduledTime": { "$gte": 10_i64, "$lte": 20_i64 } }
        );
    }

    #[test]
    fn test_approval_set_with_assignment_and_voucher() {
        let req = UpdateTransportRequest {
            status: Some(RequestStatus::Approved),
            driver_id: Some("DRV1".into()),
            voucher_code: Some("ABC123".into()),
            voucher_amount: Some(50000.0),
            ..Default::default()
        };
        let set = transport_update_set(RequestStatus::Approved, &user("ADM", &["admin"]), &req, 77);
        assert_eq!(set.get_str("driverId").unwrap(), "DRV1");
        assert_eq!(set.get_i64("assignedAt").unwrap(), 77);
        assert_eq!(set.get_str("voucherCode").unwrap(), "ABC123");
        assert_eq!(set.get_f64("voucherAmount").unwrap(), 50000.0);
        assert_eq!(set.get_str("approvedBy").unwrap(), "ADM");
    }

    #[test]
    fn test_cancel_set_ignores_assignment_fields() {
        let req = UpdateTransportRequest { vehicle_id: Some("B 1234 XY".into()), ..Default::default() };
        let set = transport_update_set(RequestStatus::Cancelled, &user("E001", &[]), &req, 1);
        assert!(set.get("vehicleId").is_none());
        assert!(set.get("assignedAt").is_none());
    }
}
