use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateCompanyRequest, UpdateCompanyRequest};
use crate::services::company_service::{self, CompanyFilter};
use crate::utils::error::ApiError;
use crate::utils::validation::parse_bool;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct CompanyQuery {
    pub company_id: Option<String>,
    pub is_active: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectQuery {
    pub include_descendants: Option<String>,
}

/// GET /api/v1/companies
#[utoipa::path(
    get,
    path = "/api/v1/companies",
    tag = "Organization",
    responses((status = 200, description = "Paginated companies")),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn list_companies(
    db: web::Data<MongoDB>,
    query: web::Query<CompanyQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = CompanyFilter {
        company_id: query.company_id.clone(),
        is_active: parse_bool(query.is_active.as_deref()),
    };
    let pagination = page.pagination();
    let (companies, total) = company_service::list_companies(&db, &filter, &pagination).await?;
    Ok(paginated(documents_json(&companies), &pagination, total))
}

/// GET /api/v1/companies/select - árvore para dropdowns
#[get("/select")]
pub async fn select_companies(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    query: web::Query<SelectQuery>,
) -> Result<HttpResponse, ApiError> {
    let include_descendants = parse_bool(query.include_descendants.as_deref()).unwrap_or(false);
    let options = company_service::select_options(&db, &user, include_descendants).await?;
    Ok(ok(options))
}

#[get("/{id}")]
pub async fn get_company(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let company = company_service::get_company(&db, &path).await?;
    Ok(ok(document_json(&company)))
}

#[post("")]
pub async fn create_company(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateCompanyRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let company = company_service::create_company(&db, body.into_inner(), &user.user_id).await?;
    Ok(created(document_json(&company)))
}

#[put("/{id}")]
pub async fn update_company(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateCompanyRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let company = company_service::update_company(&db, &path, body.into_inner(), &user.user_id).await?;
    Ok(ok(document_json(&company)))
}

#[delete("/{id}")]
pub async fn delete_company(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    company_service::delete_company(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Company deleted" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_companies)
        .service(select_companies)
        .service(get_company)
        .service(create_company)
        .service(update_company)
        .service(delete_company);
}
