use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CheckinRequest, CreateMeetingRequest, MeetingType, RequestStatus, UpdateMeetingRequest};
use crate::services::meeting_service::{self, MeetingFilter};
use crate::utils::error::ApiError;
use crate::utils::validation::parse_date_param;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingQuery {
    pub status: Option<RequestStatus>,
    #[serde(rename = "type")]
    pub meeting_type: Option<MeetingType>,
    pub room_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleQuery {
    pub date: Option<String>,
    pub device_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/meetings",
    tag = "Meetings",
    responses(
        (status = 201, description = "Meeting booked"),
        (status = 409, description = "Room already booked for this time")
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn create_meeting(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateMeetingRequest>,
) -> Result<HttpResponse, ApiError> {
    let meeting =
        meeting_service::create_meeting_request(&db, &user, body.into_inner(), &config.default_company_id).await?;
    Ok(created(document_json(&meeting)))
}

#[get("")]
pub async fn list_meetings(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    query: web::Query<MeetingQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = MeetingFilter {
        status: query.status,
        meeting_type: query.meeting_type,
        room_id: query.room_id.clone(),
        start_date: parse_date_param(query.start_date.as_deref(), "startDate")?,
        end_date: parse_date_param(query.end_date.as_deref(), "endDate")?,
    };
    let pagination = page.pagination();
    let (meetings, total) = meeting_service::list_meeting_requests(&db, &user, &filter, &pagination).await?;
    Ok(paginated(documents_json(&meetings), &pagination, total))
}

#[get("/{id}")]
pub async fn get_meeting(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let meeting = meeting_service::get_meeting_request(&db, &user, &path).await?;
    Ok(ok(document_json(&meeting)))
}

#[patch("/{id}")]
pub async fn update_meeting(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateMeetingRequest>,
) -> Result<HttpResponse, ApiError> {
    let meeting = meeting_service::update_meeting_request(&db, &user, &path, body.into_inner()).await?;
    Ok(ok(document_json(&meeting)))
}

#[delete("/{id}")]
pub async fn cancel_meeting(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    meeting_service::cancel_meeting_request(&db, &user, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Meeting cancelled" })))
}

/// POST /api/v1/meetings/{id}/checkin - público, chamado pelo tablet da sala
pub async fn checkin(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<CheckinRequest>,
) -> Result<HttpResponse, ApiError> {
    let attendee = meeting_service::checkin(&db, &path, body.into_inner()).await?;
    Ok(ok(attendee))
}

pub async fn attendance(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    Ok(ok(meeting_service::attendance(&db, &path).await?))
}

/// GET /api/v1/rooms/{roomId}/schedule
pub async fn room_schedule(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    query: web::Query<ScheduleQuery>,
) -> Result<HttpResponse, ApiError> {
    let meetings =
        meeting_service::room_schedule(&db, &path, query.date.as_deref(), query.device_id.as_deref()).await?;
    Ok(ok(documents_json(&meetings)))
}

/// Rotas sem sessão; registradas antes do scope protegido
pub fn configure_public(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/v1/meetings/{id}/checkin")
            .route(web::post().to(checkin))
            .route(web::get().to(attendance)),
    )
    .service(web::resource("/api/v1/rooms/{room_id}/schedule").route(web::get().to(room_schedule)));
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_meeting)
        .service(list_meetings)
        .service(get_meeting)
        .service(update_meeting)
        .service(cancel_meeting);
}
