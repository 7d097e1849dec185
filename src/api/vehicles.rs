use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateVehicleRequest, UpdateVehicleRequest, VehicleStatus};
use crate::services::vehicle_service::{self, VehicleFilter};
use crate::utils::error::ApiError;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

/// Sem `status`, os inativos ficam de fora
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleQuery {
    pub company_id: Option<String>,
    pub status: Option<VehicleStatus>,
    pub location_id: Option<String>,
}

#[get("")]
pub async fn list_vehicles(
    db: web::Data<MongoDB>,
    query: web::Query<VehicleQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = VehicleFilter {
        company_id: query.company_id.clone(),
        status: query.status,
        location_id: query.location_id.clone(),
    };
    let pagination = page.pagination();
    let (vehicles, total) = vehicle_service::list_vehicles(&db, &filter, &pagination).await?;
    Ok(paginated(documents_json(&vehicles), &pagination, total))
}

#[get("/{id}")]
pub async fn get_vehicle(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let vehicle = vehicle_service::get_vehicle(&db, &path).await?;
    Ok(ok(document_json(&vehicle)))
}

#[post("")]
pub async fn create_vehicle(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateVehicleRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let vehicle = vehicle_service::create_vehicle(&db, body.into_inner(), &user.user_id).await?;
    Ok(created(document_json(&vehicle)))
}

#[put("/{id}")]
pub async fn update_vehicle(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateVehicleRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let vehicle = vehicle_service::update_vehicle(&db, &path, body.into_inner(), &user.user_id).await?;
    Ok(ok(document_json(&vehicle)))
}

#[delete("/{id}")]
pub async fn delete_vehicle(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    vehicle_service::delete_vehicle(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Vehicle deleted" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_vehicles)
        .service(get_vehicle)
        .service(create_vehicle)
        .service(update_vehicle)
        .service(delete_vehicle);
}
