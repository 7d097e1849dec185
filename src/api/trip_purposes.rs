use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateTripPurposeRequest, UpdateTripPurposeRequest};
use crate::seeds::trip_purposes_seed;
use crate::services::trip_purpose_service;
use crate::utils::error::ApiError;
use crate::utils::validation::parse_bool;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPurposeQuery {
    pub is_active: Option<String>,
}

/// Empresa do usuário, ou a padrão da instalação
fn company_of<'a>(user: &'a AuthUser, config: &'a AppConfig) -> &'a str {
    user.company_id.as_deref().filter(|c| !c.is_empty()).unwrap_or(&config.default_company_id)
}

#[get("")]
pub async fn list_trip_purposes(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    query: web::Query<TripPurposeQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let pagination = page.pagination();
    let (purposes, total) = trip_purpose_service::list_trip_purposes(
        &db,
        company_of(&user, &config),
        parse_bool(query.is_active.as_deref()),
        &pagination,
    )
    .await?;
    Ok(paginated(documents_json(&purposes), &pagination, total))
}

#[post("/seed")]
pub async fn seed_trip_purposes(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let result = trip_purposes_seed::seed_trip_purposes(&db, company_of(&user, &config)).await?;
    Ok(created(result))
}

#[get("/{id}")]
pub async fn get_trip_purpose(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let purpose = trip_purpose_service::get_trip_purpose(&db, company_of(&user, &config), &path).await?;
    Ok(ok(document_json(&purpose)))
}

#[post("")]
pub async fn create_trip_purpose(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateTripPurposeRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let purpose =
        trip_purpose_service::create_trip_purpose(&db, body.into_inner(), company_of(&user, &config), &user.user_id)
            .await?;
    Ok(created(document_json(&purpose)))
}

#[put("/{id}")]
pub async fn update_trip_purpose(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateTripPurposeRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let purpose = trip_purpose_service::update_trip_purpose(
        &db,
        company_of(&user, &config),
        &path,
        body.into_inner(),
        &user.user_id,
    )
    .await?;
    Ok(ok(document_json(&purpose)))
}

#[delete("/{id}")]
pub async fn delete_trip_purpose(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    trip_purpose_service::delete_trip_purpose(&db, company_of(&user, &config), &path).await?;
    Ok(ok(serde_json::json!({ "message": "Trip purpose deleted" })))
}

/// `/seed` antes de `/{id}`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_trip_purposes)
        .service(seed_trip_purposes)
        .service(get_trip_purpose)
        .service(create_trip_purpose)
        .service(update_trip_purpose)
        .service(delete_trip_purpose);
}
