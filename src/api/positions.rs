use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreatePositionRequest, UpdatePositionRequest};
use crate::services::position_service::{self, PositionFilter};
use crate::utils::error::ApiError;
use crate::utils::validation::parse_bool;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionQuery {
    pub company_id: Option<String>,
    pub level: Option<String>,
    pub grade: Option<String>,
    pub is_active: Option<String>,
}

#[get("")]
pub async fn list_positions(
    db: web::Data<MongoDB>,
    query: web::Query<PositionQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = PositionFilter {
        company_id: query.company_id.clone(),
        level: query.level.as_deref().and_then(|l| l.trim().parse().ok()),
        grade: query.grade.clone(),
        is_active: parse_bool(query.is_active.as_deref()),
    };
    let pagination = page.pagination();
    let (positions, total) = position_service::list_positions(&db, &filter, &pagination).await?;
    Ok(paginated(documents_json(&positions), &pagination, total))
}

#[get("/{id}")]
pub async fn get_position(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let position = position_service::get_position(&db, &path).await?;
    Ok(ok(document_json(&position)))
}

#[post("")]
pub async fn create_position(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreatePositionRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let position = position_service::create_position(&db, body.into_inner(), &user.user_id).await?;
    Ok(created(document_json(&position)))
}

#[put("/{id}")]
pub async fn update_position(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdatePositionRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let position = position_service::update_position(&db, &path, body.into_inner(), &user.user_id).await?;
    Ok(ok(document_json(&position)))
}

#[delete("/{id}")]
pub async fn delete_position(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    position_service::delete_position(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Position deleted" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_positions)
        .service(get_position)
        .service(create_position)
        .service(update_position)
        .service(delete_position);
}
