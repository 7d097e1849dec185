use crate::api::response::Pagination;
use crate::database::{MongoDB, FACILITY_REQUESTS};
use crate::middleware::AuthUser;
use crate::models::{
    check_transition, Approval, CreateFacilityRequest, FacilityItem, FacilityItemInput, FacilityRequest, FacilityType,
    Priority, RequestStatus, UpdateFacilityRequest,
};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult, FieldError};
use crate::utils::validation::{now_ms, parse_datetime_ms, Validator};
use chrono::Utc;
use mongodb::bson::{doc, to_bson, Document};

pub const FULFILL_ACTION: &str = "fulfill";

#[derive(Debug, Default)]
pub struct FacilityFilter {
    pub status: Option<RequestStatus>,
    pub facility_type: Option<FacilityType>,
    pub category: Option<String>,
    pub urgency: Option<Priority>,
}

impl FacilityFilter {
    pub fn to_document(&self, user: &AuthUser) -> ApiResult<Document> {
        let mut filter = Document::new();
        if !user.is_admin() {
            filter.insert("userId", &user.user_id);
        }
        if let Some(status) = self.status {
            filter.insert("status", to_bson(&status)?);
        }
        if let Some(t) = self.facility_type {
            filter.insert("type", to_bson(&t)?);
        }
        crud::insert_if_present(&mut filter, "category", self.category.as_deref());
        if let Some(urgency) = self.urgency {
            filter.insert("urgency", to_bson(&urgency)?);
        }
        Ok(filter)
    }
}

/// Valida item a item; erros apontam `items[i].campo`
pub fn validate_items(items: &[FacilityItemInput]) -> ApiResult<Vec<FacilityItem>> {
    if items.is_empty() {
        return Err(ApiError::validation_failed(vec![FieldError::new(
            "items",
            "At least one item is required",
        )]));
    }

    let mut errors = Vec::new();
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let name = item.item_name.as_deref().map(str::trim).unwrap_or("");
        let unit = item.unit.as_deref().map(str::trim).unwrap_or("");
        let quantity = item.quantity.unwrap_or(0.0);

        if name.is_empty() {
            errors.push(FieldError::new(format!("items[{}].itemName", i), "Item name is required"));
        }
        if quantity <= 0.0 {
            errors.push(FieldError::new(format!("items[{}].quantity", i), "Quantity must be greater than 0"));
        }
        if unit.is_empty() {
            errors.push(FieldError::new(format!("items[{}].unit", i), "Unit is required"));
        }

        out.push(FacilityItem {
            item_name: name.to_string(),
            item_code: item.item_code.clone(),
            quantity,
            unit: unit.to_string(),
            description: item.description.clone(),
            estimated_price: item.estimated_price,
        });
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(ApiError::validation_failed(errors))
    }
}

/// Soma preço estimado × quantidade; `None` quando nada tem preço
pub fn estimated_cost(items: &[FacilityItem]) -> Option<f64> {
    let total: f64 = items.iter().filter_map(|i| i.estimated_price.map(|p| p * i.quantity)).sum();
    (total > 0.0).then_some(total)
}

pub fn build_facility_request(
    user: &AuthUser,
    req: CreateFacilityRequest,
    default_company_id: &str,
    request_number: String,
    now: i64,
) -> ApiResult<FacilityRequest> {
    Validator::new()
        .require("type", &req.facility_type)
        .require_str("category", &req.category)
        .require("items", &req.items)
        .require_str("deliveryLocation", &req.delivery_location)
        .require_str("purpose", &req.purpose)
        .finish()?;

    let items = validate_items(req.items.as_deref().unwrap_or_default())?;
    let delivery_date = match req.delivery_date.as_deref().filter(|d| !d.is_empty()) {
        None => None,
        Some(raw) => Some(parse_datetime_ms(raw).ok_or_else(|| {
            ApiError::validation_failed(vec![FieldError::new("deliveryDate", "Invalid date format")])
        })?),
    };
    let Some(facility_type) = req.facility_type else {
        return Err(ApiError::validation("Validation failed"));
    };

    Ok(FacilityRequest {
        id: None,
        request_number,
        requester: crud::requester_for(user, req.department_id, default_company_id),
        facility_type,
        category: req.category.unwrap_or_default(),
        estimated_cost: estimated_cost(&items),
        items,
        delivery_location: req.delivery_location.unwrap_or_default(),
        delivery_date,
        urgency: req.urgency.unwrap_or_default(),
        purpose: req.purpose.unwrap_or_default(),
        notes: req.notes,
        status: RequestStatus::Pending,
        approval: Approval::default(),
        fulfilled_by: None,
        fulfilled_at: None,
        actual_cost: None,
        purchase_order_number: None,
        created_at: now,
        updated_at: now,
        created_by: Some(user.user_id.clone()),
        updated_by: None,
    })
}

pub async fn create_facility_request(
    db: &MongoDB,
    user: &AuthUser,
    req: CreateFacilityRequest,
    default_company_id: &str,
) -> ApiResult<FacilityRequest> {
    let number = crud::request_number("FR", Utc::now())?;
    let mut request = build_facility_request(user, req, default_company_id, number, now_ms())?;
    let result = db.collection::<FacilityRequest>(FACILITY_REQUESTS).insert_one(&request).await?;
    request.id = result.inserted_id.as_object_id();
    log::info!(
        "✅ Facility request {} created by {} ({} items)",
        request.request_number,
        user.user_id,
        request.items.len()
    );
    Ok(request)
}

pub async fn list_facility_requests(
    db: &MongoDB,
    user: &AuthUser,
    filter: &FacilityFilter,
    pagination: &Pagination,
) -> ApiResult<(Vec<FacilityRequest>, u64)> {
    crud::find_page(
        &db.collection::<FacilityRequest>(FACILITY_REQUESTS),
        filter.to_document(user)?,
        doc! { "createdAt": -1 },
        pagination,
    )
    .await
}

pub async fn get_facility_request(db: &MongoDB, user: &AuthUser, id: &str) -> ApiResult<FacilityRequest> {
    let oid = crud::parse_object_id(id, "request")?;
    let request = crud::find_by_id(&db.collection::<FacilityRequest>(FACILITY_REQUESTS), oid, "Request not found").await?;
    if request.requester.user_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(request)
}

/// `status` alvo do PATCH; `action: "fulfill"` equivale a concluir
pub fn target_status(req: &UpdateFacilityRequest) -> ApiResult<RequestStatus> {
    match (req.action.as_deref(), req.status) {
        (Some(FULFILL_ACTION), _) => Ok(RequestStatus::Completed),
        (Some(other), _) => Err(ApiError::validation(format!("Unknown action: {}", other))),
        (None, Some(status)) => Ok(status),
        (None, None) => Err(ApiError::validation_failed(vec![FieldError::new("status", "status is required")])),
    }
}

pub async fn update_facility_request(
    db: &MongoDB,
    user: &AuthUser,
    id: &str,
    req: UpdateFacilityRequest,
) -> ApiResult<FacilityRequest> {
    let oid = crud::parse_object_id(id, "request")?;
    let target = target_status(&req)?;
    let requests = db.collection::<FacilityRequest>(FACILITY_REQUESTS);
    let existing = crud::find_by_id(&requests, oid, "Request not found").await?;
    check_transition(existing.status, target, user.is_admin(), existing.requester.user_id == user.user_id)?;

    let now = now_ms();
    let mut set = crud::status_set(target, user, req.rejection_reason.as_deref(), now);
    if target == RequestStatus::Completed {
        set.insert("fulfilledBy", &user.user_id);
        set.insert("fulfilledAt", now);
        if let Some(cost) = req.actual_cost {
            set.insert("actualCost", cost);
        }
        crud::insert_if_present(&mut set, "purchaseOrderNumber", req.purchase_order_number.as_deref());
    }

    crud::guarded_status_update(&requests, oid, existing.status, set).await?;
    log::info!("✅ Facility request {} -> {} by {}", existing.request_number, target.as_str(), user.user_id);
    crud::find_by_id(&requests, oid, "Request not found").await
}

pub async fn cancel_facility_request(db: &MongoDB, user: &AuthUser, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "request")?;
    let requests = db.collection::<FacilityRequest>(FACILITY_REQUESTS);
    let existing = crud::find_by_id(&requests, oid, "Request not found").await?;

    if existing.requester.user_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    check_transition(existing.status, RequestStatus::Cancelled, user.is_admin(), true)?;

    let set = crud::status_set(RequestStatus::Cancelled, user, None, now_ms());
    crud::guarded_status_update(&requests, oid, existing.status, set).await?;
    log::info!("🗑️ Facility request {} cancelled by {}", existing.request_number, user.user_id);
    Ok(())
}
