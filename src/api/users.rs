use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateUserRequest, UpdateUserRequest};
use crate::services::user_service::{self, UserFilter};
use crate::utils::error::ApiError;
use crate::utils::validation::parse_bool;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub company_id: Option<String>,
    pub is_active: Option<String>,
    pub search: Option<String>,
}

#[get("")]
pub async fn list_users(
    db: web::Data<MongoDB>,
    query: web::Query<UserQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = UserFilter {
        company_id: query.company_id.clone(),
        is_active: parse_bool(query.is_active.as_deref()),
        search: query.search.clone(),
    };
    let pagination = page.pagination();
    let (users, total) = user_service::list_users(&db, &filter, &pagination).await?;
    Ok(paginated(documents_json(&users), &pagination, total))
}

#[get("/{id}")]
pub async fn get_user(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let user = user_service::get_user(&db, &path).await?;
    Ok(ok(document_json(&user)))
}

#[post("")]
pub async fn create_user(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let created_user = user_service::create_user(&db, body.into_inner()).await?;
    Ok(created(document_json(&created_user)))
}

#[put("/{id}")]
pub async fn update_user(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let updated = user_service::update_user(&db, &path, body.into_inner()).await?;
    Ok(ok(document_json(&updated)))
}

#[delete("/{id}")]
pub async fn delete_user(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    user_service::delete_user(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "User deleted" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users)
        .service(get_user)
        .service(create_user)
        .service(update_user)
        .service(delete_user);
}
