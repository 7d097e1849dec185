use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateTransportRequest, RequestStatus, TransportType, UpdateTransportRequest};
use crate::services::transport_service::{self, TransportFilter};
use crate::utils::error::ApiError;
use crate::utils::validation::parse_date_param;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct TransportQuery {
    pub status: Option<RequestStatus>,
    #[serde(rename = "type")]
    pub transport_type: Option<TransportType>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub user_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/transport/requests",
    tag = "Transport",
    responses(
        (status = 201, description = "Request created"),
        (status = 400, description = "Validation error")
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn create_request(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateTransportRequest>,
) -> Result<HttpResponse, ApiError> {
    let request =
        transport_service::create_transport_request(&db, &user, body.into_inner(), &config.default_company_id).await?;
    Ok(created(document_json(&request)))
}

#[utoipa::path(
    get,
    path = "/api/v1/transport/requests",
    tag = "Transport",
    responses((status = 200, description = "Paginated requests, newest first")),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn list_requests(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    query: web::Query<TransportQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = TransportFilter {
        status: query.status,
        transport_type: query.transport_type,
        start_date: parse_date_param(query.start_date.as_deref(), "startDate")?,
        end_date: parse_date_param(query.end_date.as_deref(), "endDate")?,
        user_id: query.user_id.clone(),
    };
    let pagination = page.pagination();
    let (requests, total) = transport_service::list_transport_requests(&db, &user, &filter, &pagination).await?;
    Ok(paginated(documents_json(&requests), &pagination, total))
}

#[get("/{id}")]
pub async fn get_request(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let request = transport_service::get_transport_request(&db, &user, &path).await?;
    Ok(ok(document_json(&request)))
}

/// PATCH - aprovar, rejeitar, cancelar ou concluir
#[patch("/{id}")]
pub async fn update_request(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateTransportRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = transport_service::update_transport_request(&db, &user, &path, body.into_inner()).await?;
    Ok(ok(document_json(&request)))
}

#[delete("/{id}")]
pub async fn cancel_request(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    transport_service::cancel_transport_request(&db, &user, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Request cancelled" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_request)
        .service(list_requests)
        .service(get_request)
        .service(update_request)
        .service(cancel_request);
}
