use crate::api::response::ok;
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::SyncStatus;
use crate::scim::types::WebhookPayload;
use crate::scim::webhook::{self, SignatureCheck, SIGNATURE_HEADER};
use crate::scim::{self, ScimClient, SyncOptions};
use crate::utils::error::ApiError;
use crate::utils::validation::now_ms;
use actix_web::{get, post, web, HttpRequest, HttpResponse};

/// POST /api/v1/sync - sincronização completa sob demanda
#[utoipa::path(
    post,
    path = "/api/v1/sync",
    tag = "SCIM",
    responses(
        (status = 200, description = "Sync finished; history record returned"),
        (status = 400, description = "SCIM not configured")
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn trigger_sync(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    client: web::Data<ScimClient>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    if !client.is_configured().await {
        return Err(ApiError::BadRequest(scim::client::NOT_CONFIGURED.to_string()));
    }

    log::info!("🔄 Manual SCIM sync triggered by {}", user.user_id);
    let options = SyncOptions {
        triggered_by: Some(&user.user_id),
        super_admin_email: &config.super_admin_email,
        default_company_id: &config.default_company_id,
    };
    let history = scim::perform_full_sync(&db, client.get_ref(), options).await?;
    let body = serde_json::json!({
        "success": history.status == SyncStatus::Success,
        "stats": history.stats,
        "errors": history.errors,
        "startedAt": history.started_at,
        "completedAt": history.completed_at,
    });
    Ok(ok(body))
}

#[get("/status")]
pub async fn sync_status(db: web::Data<MongoDB>) -> Result<HttpResponse, ApiError> {
    Ok(ok(scim::last_sync_status(&db).await?))
}

/// POST /api/v1/scim/test
#[post("/test")]
pub async fn test_connection(
    client: web::Data<ScimClient>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    Ok(ok(client.check_connection().await))
}

/// POST /api/v1/scim/webhook - chamado pelo SSO, autenticado pela assinatura
pub async fn scim_webhook(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    client: web::Data<ScimClient>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let secret = client.webhook_secret().await?;
    let header = req.headers().get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok());
    match webhook::verify_signature(secret.as_deref(), &body, header) {
        SignatureCheck::Valid => {}
        SignatureCheck::Unverified => log::warn!("⚠️ SCIM webhook secret not configured, accepting unsigned event"),
        SignatureCheck::Invalid => {
            log::warn!("⚠️ SCIM webhook rejected: invalid signature");
            return Err(ApiError::Unauthorized("Invalid signature".to_string()));
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook payload: {}", e)))?;
    log::info!("📨 SCIM webhook: {} {:?} {}", payload.event, payload.action, payload.resource_type);

    let outcome = webhook::handle_event(&db, &payload, &config.super_admin_email, &config.default_company_id).await;
    let processed_at = now_ms();
    webhook::log_event(&db, &webhook::event_record(&payload, &outcome, processed_at)).await;
    outcome?;

    Ok(ok(serde_json::json!({
        "received": true,
        "event": payload.event,
        "resourceId": payload.resource_id,
        "processedAt": processed_at,
    })))
}

pub fn configure_public(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/v1/scim/webhook").route(web::post().to(scim_webhook)));
}

pub fn configure_sync(cfg: &mut web::ServiceConfig) {
    cfg.service(trigger_sync).service(sync_status);
}

pub fn configure_scim(cfg: &mut web::ServiceConfig) {
    cfg.service(test_connection);
}
