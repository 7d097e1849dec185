use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateFacilityRequest, FacilityType, Priority, RequestStatus, UpdateFacilityRequest};
use crate::services::facility_service::{self, FacilityFilter};
use crate::utils::error::ApiError;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FacilityQuery {
    pub status: Option<RequestStatus>,
    #[serde(rename = "type")]
    pub facility_type: Option<FacilityType>,
    pub category: Option<String>,
    pub urgency: Option<Priority>,
}

#[post("")]
pub async fn create_request(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateFacilityRequest>,
) -> Result<HttpResponse, ApiError> {
    let request =
        facility_service::create_facility_request(&db, &user, body.into_inner(), &config.default_company_id).await?;
    Ok(created(document_json(&request)))
}

#[get("")]
pub async fn list_requests(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    query: web::Query<FacilityQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = FacilityFilter {
        status: query.status,
        facility_type: query.facility_type,
        category: query.category.clone(),
        urgency: query.urgency,
    };
    let pagination = page.pagination();
    let (requests, total) = facility_service::list_facility_requests(&db, &user, &filter, &pagination).await?;
    Ok(paginated(documents_json(&requests), &pagination, total))
}

#[get("/{id}")]
pub async fn get_request(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let request = facility_service::get_facility_request(&db, &user, &path).await?;
    Ok(ok(document_json(&request)))
}

/// PATCH - status ou `{"action": "fulfill"}`
#[patch("/{id}")]
pub async fn update_request(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateFacilityRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = facility_service::update_facility_request(&db, &user, &path, body.into_inner()).await?;
    Ok(ok(document_json(&request)))
}

#[delete("/{id}")]
pub async fn cancel_request(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    facility_service::cancel_facility_request(&db, &user, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Request cancelled" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_request)
        .service(list_requests)
        .service(get_request)
        .service(update_request)
        .service(cancel_request);
}
