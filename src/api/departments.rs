use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateDepartmentRequest, DepartmentType, UpdateDepartmentRequest};
use crate::services::department_service::{self, DepartmentFilter};
use crate::utils::error::ApiError;
use crate::utils::validation::parse_bool;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentQuery {
    pub company_id: Option<String>,
    #[serde(rename = "type")]
    pub department_type: Option<DepartmentType>,
    pub is_active: Option<String>,
}

#[get("")]
pub async fn list_departments(
    db: web::Data<MongoDB>,
    query: web::Query<DepartmentQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = DepartmentFilter {
        company_id: query.company_id.clone(),
        department_type: query.department_type,
        is_active: parse_bool(query.is_active.as_deref()),
    };
    let pagination = page.pagination();
    let (departments, total) = department_service::list_departments(&db, &filter, &pagination).await?;
    Ok(paginated(documents_json(&departments), &pagination, total))
}

#[get("/{id}")]
pub async fn get_department(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let department = department_service::get_department(&db, &path).await?;
    Ok(ok(document_json(&department)))
}

#[post("")]
pub async fn create_department(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateDepartmentRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let department = department_service::create_department(&db, body.into_inner(), &user.user_id).await?;
    Ok(created(document_json(&department)))
}

#[put("/{id}")]
pub async fn update_department(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateDepartmentRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let department = department_service::update_department(&db, &path, body.into_inner(), &user.user_id).await?;
    Ok(ok(document_json(&department)))
}

#[delete("/{id}")]
pub async fn delete_department(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    department_service::delete_department(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Department deleted" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_departments)
        .service(get_department)
        .service(create_department)
        .service(update_department)
        .service(delete_department);
}
