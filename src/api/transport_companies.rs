use crate::api::response::{created, document_json, documents_json, ok};
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateTransportCompanyRequest, UpdateTransportCompanyRequest};
use crate::services::transport_company_service;
use crate::utils::error::ApiError;
use crate::utils::validation::parse_bool;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCompanyQuery {
    pub active_only: Option<String>,
}

#[get("")]
pub async fn list_transport_companies(
    db: web::Data<MongoDB>,
    query: web::Query<TransportCompanyQuery>,
) -> Result<HttpResponse, ApiError> {
    let active_only = parse_bool(query.active_only.as_deref()).unwrap_or(false);
    let companies = transport_company_service::list_transport_companies(&db, active_only).await?;
    Ok(ok(documents_json(&companies)))
}

#[get("/{id}")]
pub async fn get_transport_company(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let company = transport_company_service::get_transport_company(&db, &path).await?;
    Ok(ok(document_json(&company)))
}

#[post("")]
pub async fn create_transport_company(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateTransportCompanyRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let org = user.company_id.as_deref().unwrap_or(&config.default_company_id);
    let company = transport_company_service::create_transport_company(&db, body.into_inner(), org, &user.user_id).await?;
    Ok(created(document_json(&company)))
}

#[put("/{id}")]
pub async fn update_transport_company(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateTransportCompanyRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let company =
        transport_company_service::update_transport_company(&db, &path, body.into_inner(), &user.user_id).await?;
    Ok(ok(document_json(&company)))
}

#[delete("/{id}")]
pub async fn delete_transport_company(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    transport_company_service::delete_transport_company(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Transport company deleted" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_transport_companies)
        .service(get_transport_company)
        .service(create_transport_company)
        .service(update_transport_company)
        .service(delete_transport_company);
}
