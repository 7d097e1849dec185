use crate::api::response::{document_json, documents_json, ok};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::AssignDeviceRequest;
use crate::services::device_service;
use crate::utils::error::ApiError;
use actix_web::{get, web, HttpResponse};

/// POST /api/v1/devices/{deviceId}/heartbeat - público (tablet)
pub async fn heartbeat(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let device = device_service::heartbeat(&db, &path).await?;
    Ok(ok(document_json(&device)))
}

/// GET - o tablet pergunta a que sala está vinculado
pub async fn get_assignment(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    Ok(ok(device_service::get_assignment(&db, &path).await?))
}

pub async fn assign_device(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<AssignDeviceRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let room_id = body.room_id.as_deref().unwrap_or("");
    let device = device_service::assign_device(&db, &path, room_id, &user.user_id).await?;
    Ok(ok(document_json(&device)))
}

pub async fn unassign_device(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    device_service::unassign_device(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Device unassigned" })))
}

#[get("")]
pub async fn list_devices(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let devices = device_service::list_devices(&db).await?;
    Ok(ok(documents_json(&devices)))
}

/// Heartbeat e leitura do vínculo são abertos; alterar o vínculo exige admin
pub fn configure_public(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/v1/devices/{device_id}/heartbeat").route(web::post().to(heartbeat)))
        .service(
            web::resource("/api/v1/devices/{device_id}/assignment")
                .route(web::get().to(get_assignment))
                .route(web::post().to(assign_device))
                .route(web::delete().to(unassign_device)),
        );
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_devices);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::config::AppConfig;
    use actix_web::{test as actix_test, App};

    #[actix_web::test]
    async fn test_assignment_change_requires_authentication() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(MongoDB::unconnected().await))
                .app_data(web::Data::new(AuthContext::from_config(&AppConfig::for_tests())))
                .configure(configure_public),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/devices/TAB-01/assignment")
            .set_json(serde_json::json!({ "roomId": "ROOM-A" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }
}
