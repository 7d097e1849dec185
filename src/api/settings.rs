use crate::api::response::{documents_json, ok};
use crate::middleware::AuthUser;
use crate::models::{SettingCategory, UpdateSettingsRequest};
use crate::scim::ScimClient;
use crate::services::SettingsStore;
use crate::utils::error::ApiError;
use actix_web::{get, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SettingsQuery {
    pub category: Option<String>,
}

/// GET /api/v1/settings?category=scim - segredos mascarados
#[get("")]
pub async fn get_settings(
    store: web::Data<SettingsStore>,
    user: web::ReqData<AuthUser>,
    query: web::Query<SettingsQuery>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let raw = query
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Category parameter required".to_string()))?;
    let category =
        SettingCategory::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("Invalid category: {}", raw)))?;

    let settings = store.list_by_category(category).await?;
    Ok(ok(documents_json(&settings)))
}

#[put("")]
pub async fn update_settings(
    store: web::Data<SettingsStore>,
    scim: web::Data<ScimClient>,
    user: web::ReqData<AuthUser>,
    body: web::Json<UpdateSettingsRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    if body.settings.is_empty() {
        return Err(ApiError::BadRequest("Settings array required".to_string()));
    }
    let updated = store.update_settings(&body.settings, &user.user_id).await?;
    // Credenciais SCIM podem ter mudado
    scim.invalidate();
    Ok(ok(serde_json::json!({ "updated": updated })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_settings).service(update_settings);
}
