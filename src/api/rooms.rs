use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateRoomRequest, RoomStatus, RoomType, UpdateRoomRequest};
use crate::services::room_service::{self, RoomFilter};
use crate::utils::error::ApiError;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomQuery {
    pub company_id: Option<String>,
    pub location_id: Option<String>,
    pub status: Option<RoomStatus>,
    pub room_type: Option<RoomType>,
}

#[get("")]
pub async fn list_rooms(
    db: web::Data<MongoDB>,
    query: web::Query<RoomQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = RoomFilter {
        company_id: query.company_id.clone(),
        status: query.status,
        location_id: query.location_id.clone(),
        room_type: query.room_type,
    };
    let pagination = page.pagination();
    let (rooms, total) = room_service::list_rooms(&db, &filter, &pagination).await?;
    Ok(paginated(documents_json(&rooms), &pagination, total))
}

#[get("/{id}")]
pub async fn get_room(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let room = room_service::get_room(&db, &path).await?;
    Ok(ok(document_json(&room)))
}

#[post("")]
pub async fn create_room(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateRoomRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let room = room_service::create_room(&db, body.into_inner(), &user.user_id).await?;
    Ok(created(document_json(&room)))
}

#[put("/{id}")]
pub async fn update_room(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateRoomRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let room = room_service::update_room(&db, &path, body.into_inner(), &user.user_id).await?;
    Ok(ok(document_json(&room)))
}

#[delete("/{id}")]
pub async fn delete_room(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    room_service::delete_room(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Room deleted" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_rooms)
        .service(get_room)
        .service(create_room)
        .service(update_room)
        .service(delete_room);
}
