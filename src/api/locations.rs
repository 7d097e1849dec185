use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateLocationRequest, UpdateLocationRequest};
use crate::services::location_service::{self, LocationFilter};
use crate::utils::error::ApiError;
use crate::utils::validation::parse_bool;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationQuery {
    pub company_id: Option<String>,
    pub is_active: Option<String>,
}

#[get("")]
pub async fn list_locations(
    db: web::Data<MongoDB>,
    query: web::Query<LocationQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = LocationFilter {
        company_id: query.company_id.clone(),
        is_active: parse_bool(query.is_active.as_deref()),
    };
    let pagination = page.pagination();
    let (locations, total) = location_service::list_locations(&db, &filter, &pagination).await?;
    Ok(paginated(documents_json(&locations), &pagination, total))
}

#[get("/{id}")]
pub async fn get_location(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let location = location_service::get_location(&db, &path).await?;
    Ok(ok(document_json(&location)))
}

#[post("")]
pub async fn create_location(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateLocationRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let location = location_service::create_location(&db, body.into_inner(), &user.user_id).await?;
    Ok(created(document_json(&location)))
}

#[put("/{id}")]
pub async fn update_location(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateLocationRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let location = location_service::update_location(&db, &path, body.into_inner(), &user.user_id).await?;
    Ok(ok(document_json(&location)))
}

#[delete("/{id}")]
pub async fn delete_location(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    location_service::delete_location(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Location deleted" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_locations)
        .service(get_location)
        .service(create_location)
        .service(update_location)
        .service(delete_location);
}
