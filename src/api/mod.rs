pub mod approval_workflows;
pub mod auth;
pub mod companies;
pub mod departments;
pub mod devices;
pub mod drivers;
pub mod facility;
pub mod health;
pub mod locations;
pub mod meetings;
pub mod positions;
pub mod response;
pub mod roles;
pub mod rooms;
pub mod settings;
pub mod swagger;
pub mod sync;
pub mod transport;
pub mod transport_companies;
pub mod trip_purposes;
pub mod users;
pub mod vehicles;
pub mod vouchers;

use crate::utils::error::ApiError;
use actix_web::web;

/// Corpo JSON inválido sai no envelope padrão
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::validation(format!("Invalid JSON body: {}", err)).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("Invalid query string: {}", err)).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("Invalid path: {}", err)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{post, test as actix_test, App, HttpResponse};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    #[post("/echo")]
    async fn echo(_body: web::Json<Payload>) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_malformed_json_uses_error_envelope() {
        let app = actix_test::init_service(App::new().app_data(json_config()).service(echo)).await;
        let req = actix_test::TestRequest::post()
            .uri("/echo")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
