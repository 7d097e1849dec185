use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateDriverRequest, DriverStatus, TripActionRequest, UpdateDriverRequest};
use crate::services::driver_service::{self, DriverFilter};
use crate::utils::error::ApiError;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverQuery {
    pub company_id: Option<String>,
    pub status: Option<DriverStatus>,
    pub location_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentsQuery {
    /// `YYYY-MM-DD`, padrão hoje
    pub date: Option<String>,
}

// ==================== Cadastro (admin) ====================

#[get("")]
pub async fn list_drivers(
    db: web::Data<MongoDB>,
    query: web::Query<DriverQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = DriverFilter {
        company_id: query.company_id.clone(),
        status: query.status,
        location_id: query.location_id.clone(),
    };
    let pagination = page.pagination();
    let (drivers, total) = driver_service::list_drivers(&db, &filter, &pagination).await?;
    Ok(paginated(documents_json(&drivers), &pagination, total))
}

#[get("/{id}")]
pub async fn get_driver(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let driver = driver_service::get_driver(&db, &path).await?;
    Ok(ok(document_json(&driver)))
}

#[post("")]
pub async fn create_driver(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateDriverRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let driver = driver_service::create_driver(&db, body.into_inner(), &user.user_id).await?;
    Ok(created(document_json(&driver)))
}

#[put("/{id}")]
pub async fn update_driver(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateDriverRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let driver = driver_service::update_driver(&db, &path, body.into_inner(), &user.user_id).await?;
    Ok(ok(document_json(&driver)))
}

#[delete("/{id}")]
pub async fn delete_driver(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    driver_service::delete_driver(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Driver deleted" })))
}

// ==================== App do motorista ====================

#[get("/assignments")]
pub async fn assignments(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    query: web::Query<AssignmentsQuery>,
) -> Result<HttpResponse, ApiError> {
    let assignments = driver_service::driver_assignments(&db, &user, query.date.as_deref()).await?;
    Ok(ok(assignments))
}

#[post("/trip/{id}/start")]
pub async fn start_trip(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: Option<web::Json<TripActionRequest>>,
) -> Result<HttpResponse, ApiError> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let event = driver_service::start_trip(&db, &user, &path, body).await?;
    Ok(ok(serde_json::json!({
        "message": "Trip started successfully",
        "delayMinutes": event.delay_minutes.unwrap_or(0),
        "tripEvent": document_json(&event),
    })))
}

#[post("/trip/{id}/complete")]
pub async fn complete_trip(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: Option<web::Json<TripActionRequest>>,
) -> Result<HttpResponse, ApiError> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let (event, duration) = driver_service::complete_trip(&db, &user, &path, body).await?;
    Ok(ok(serde_json::json!({
        "message": "Trip completed successfully",
        "duration": duration,
        "tripEvent": document_json(&event),
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_drivers)
        .service(get_driver)
        .service(create_driver)
        .service(update_driver)
        .service(delete_driver);
}

/// Montado em `/api/v1/driver`
pub fn configure_trips(cfg: &mut web::ServiceConfig) {
    cfg.service(assignments).service(start_trip).service(complete_trip);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::api_token::TokenSubject;
    use crate::auth::AuthContext;
    use crate::config::AppConfig;
    use crate::middleware::AuthMiddleware;
    use actix_web::{test as actix_test, App};

    fn bearer(ctx: &AuthContext, role: &str) -> String {
        let roles = vec![role.to_string()];
        let token = ctx
            .tokens
            .issue(&TokenSubject {
                user_id: "E010",
                email: "wayan@ias.co.id",
                name: Some("Wayan"),
                roles: &roles,
                company_id: Some("IAS"),
                company_access: &[],
            })
            .unwrap();
        format!("Bearer {}", token.access_token)
    }

    #[actix_web::test]
    async fn test_trip_routes_require_driver_role() {
        let ctx = AuthContext::from_config(&AppConfig::for_tests());
        let authorization = bearer(&ctx, "employee");
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(MongoDB::unconnected().await))
                .app_data(web::Data::new(ctx))
                .service(web::scope("/api/v1/driver").wrap(AuthMiddleware).configure(configure_trips)),
        )
        .await;

        for (method, uri) in [
            ("GET", "/api/v1/driver/assignments"),
            ("POST", "/api/v1/driver/trip/65f000000000000000000001/start"),
            ("POST", "/api/v1/driver/trip/65f000000000000000000001/complete"),
        ] {
            let req = if method == "GET" { actix_test::TestRequest::get() } else { actix_test::TestRequest::post() }
                .uri(uri)
                .insert_header(("Authorization", authorization.clone()))
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), 403, "{}", uri);
            let body: serde_json::Value = actix_test::read_body_json(resp).await;
            assert_eq!(body["error"]["code"], "FORBIDDEN");
            assert_eq!(body["error"]["message"], "Driver role required");
        }
    }

    #[actix_web::test]
    async fn test_driver_with_bad_trip_id_gets_validation_error() {
        let ctx = AuthContext::from_config(&AppConfig::for_tests());
        let authorization = bearer(&ctx, "driver");
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(MongoDB::unconnected().await))
                .app_data(web::Data::new(ctx))
                .service(web::scope("/api/v1/driver").wrap(AuthMiddleware).configure(configure_trips)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/driver/trip/not-an-id/start")
            .insert_header(("Authorization", authorization))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"]["message"], "Invalid request ID");
    }
}
