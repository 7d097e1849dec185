use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateRoleRequest, UpdateRoleRequest};
use crate::services::role_service;
use crate::utils::error::ApiError;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleQuery {
    pub search: Option<String>,
    pub company_id: Option<String>,
}

#[get("")]
pub async fn list_roles(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    query: web::Query<RoleQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let pagination = page.pagination();
    let (roles, total) = role_service::list_roles(
        &db,
        query.search.as_deref(),
        query.company_id.as_deref(),
        user.is_global_admin(),
        &pagination,
    )
    .await?;
    Ok(paginated(documents_json(&roles), &pagination, total))
}

#[get("/{id}")]
pub async fn get_role(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let role = role_service::get_role(&db, &path).await?;
    Ok(ok(document_json(&role)))
}

#[post("")]
pub async fn create_role(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateRoleRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let role = role_service::create_role(&db, body.into_inner()).await?;
    Ok(created(document_json(&role)))
}

#[put("/{id}")]
pub async fn update_role(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateRoleRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let role = role_service::update_role(&db, &path, body.into_inner()).await?;
    Ok(ok(document_json(&role)))
}

#[delete("/{id}")]
pub async fn delete_role(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    role_service::delete_role(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Role deleted" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_roles)
        .service(get_role)
        .service(create_role)
        .service(update_role)
        .service(delete_role);
}
