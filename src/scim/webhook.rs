use super::mapping::map_user;
use super::sync::{upsert_group, DefaultRoles};
use super::types::{ScimGroup, ScimUser, WebhookAction, WebhookPayload};
use crate::database::{MongoDB, ORGANIZATIONAL_UNITS, USERS, WEBHOOK_EVENTS};
use crate::models::WebhookEvent;
use crate::utils::crypto::verify_hmac_sha256_hex;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::now_ms;
use mongodb::bson::{doc, Document};
use serde::de::DeserializeOwned;

pub const SIGNATURE_HEADER: &str = "x-scim-signature";
const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Invalid,
    /// Sem segredo configurado: aceito com aviso
    Unverified,
}

pub fn verify_signature(secret: Option<&str>, body: &[u8], header: Option<&str>) -> SignatureCheck {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return SignatureCheck::Unverified;
    };
    let Some(signature) = header.and_then(|h| h.trim().strip_prefix(SIGNATURE_PREFIX)) else {
        return SignatureCheck::Invalid;
    };
    if verify_hmac_sha256_hex(secret, body, signature) {
        SignatureCheck::Valid
    } else {
        SignatureCheck::Invalid
    }
}

fn resource_data<T: DeserializeOwned>(payload: &WebhookPayload) -> ApiResult<T> {
    serde_json::from_value(payload.data.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid {} data: {}", payload.resource_type, e)))
}

fn resource_id(payload: &WebhookPayload) -> ApiResult<&str> {
    payload
        .resource_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("resourceId is required".to_string()))
}

async fn handle_user(
    db: &MongoDB,
    payload: &WebhookPayload,
    super_admin_email: &str,
    default_company_id: &str,
) -> ApiResult<()> {
    let users = db.collection::<Document>(USERS);
    if payload.action == WebhookAction::Delete {
        let id = resource_id(payload)?;
        users
            .update_one(doc! { "ssoUserId": id }, doc! { "$set": { "isActive": false, "updatedAt": now_ms() } })
            .await?;
        log::info!("🚫 SCIM user deactivated: {}", id);
        return Ok(());
    }

    let user: ScimUser = resource_data(payload)?;
    let mapped = map_user(&user, default_company_id);
    let roles = DefaultRoles::load(db).await?;
    let now = now_ms();
    users
        .update_one(
            doc! { "ssoUserId": &mapped.sso_user_id },
            doc! {
                "$set": mapped.to_set(now),
                "$setOnInsert": {
                    "roleIds": roles.for_email(&mapped.email, super_admin_email),
                    "companyAccess": Vec::<String>::new(),
                    "createdAt": now,
                },
            },
        )
        .upsert(true)
        .await?;
    log::info!("✅ SCIM user {:?}: {}", payload.action, mapped.user_id);
    Ok(())
}

async fn handle_group(db: &MongoDB, payload: &WebhookPayload) -> ApiResult<()> {
    if payload.action == WebhookAction::Delete {
        let id = resource_id(payload)?;
        db.collection::<Document>(ORGANIZATIONAL_UNITS)
            .update_one(doc! { "scimId": id }, doc! { "$set": { "isActive": false, "updatedAt": now_ms() } })
            .await?;
        log::info!("🚫 SCIM group deactivated: {}", id);
        return Ok(());
    }

    let group: ScimGroup = resource_data(payload)?;
    upsert_group(db, &group).await?;
    log::info!("✅ SCIM group {:?}: {}", payload.action, group.display_name);
    Ok(())
}

/// Aplica o evento; `resourceType` desconhecido vira 400
pub async fn handle_event(
    db: &MongoDB,
    payload: &WebhookPayload,
    super_admin_email: &str,
    default_company_id: &str,
) -> ApiResult<()> {
    match payload.resource_type.as_str() {
        "User" => handle_user(db, payload, super_admin_email, default_company_id).await,
        "Group" => handle_group(db, payload).await,
        other => Err(ApiError::BadRequest(format!("Unknown resource type: {}", other))),
    }
}

pub fn event_record(payload: &WebhookPayload, outcome: &ApiResult<()>, now: i64) -> WebhookEvent {
    WebhookEvent {
        id: None,
        event_type: payload.event.clone(),
        resource_type: payload.resource_type.clone(),
        resource_id: payload.resource_id.clone(),
        processed: outcome.is_ok(),
        error: outcome.as_ref().err().map(|e| e.to_string()),
        received_at: now,
    }
}

/// Falha ao registrar não derruba o webhook
pub async fn log_event(db: &MongoDB, event: &WebhookEvent) {
    if let Err(e) = db.collection::<WebhookEvent>(WEBHOOK_EVENTS).insert_one(event).await {
        log::error!("❌ Failed to log webhook event {}: {}", event.event_type, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::hmac_sha256_hex;

    fn payload(resource_type: &str) -> WebhookPayload {
        serde_json::from_value(serde_json::json!({
            "event": "user.updated",
            "resourceType": resource_type,
            "resourceId": "sso-1",
            "action": "update",
        }))
        .unwrap()
    }

    #[test]
    fn test_signature_checks() {
        let body = br#"{"event":"user.created"}"#;
        let header = format!("sha256={}", hmac_sha256_hex("hook-secret", body));

        assert_eq!(verify_signature(Some("hook-secret"), body, Some(&header)), SignatureCheck::Valid);
        assert_eq!(verify_signature(Some("other"), body, Some(&header)), SignatureCheck::Invalid);
        assert_eq!(verify_signature(Some("hook-secret"), body, None), SignatureCheck::Invalid);
        assert_eq!(
            verify_signature(Some("hook-secret"), body, Some(header.trim_start_matches("sha256="))),
            SignatureCheck::Invalid
        );
        assert_eq!(verify_signature(None, body, None), SignatureCheck::Unverified);
        assert_eq!(verify_signature(Some(""), body, None), SignatureCheck::Unverified);
    }

    #[test]
    fn test_event_record_keeps_error() {
        let p = payload("Device");
        let failed: ApiResult<()> = Err(ApiError::BadRequest("Unknown resource type: Device".into()));
        let record = event_record(&p, &failed, 10);
        assert!(!record.processed);
        assert_eq!(record.error.as_deref(), Some("Unknown resource type: Device"));
        assert!(event_record(&p, &Ok(()), 10).processed);
    }

    #[test]
    fn test_missing_resource_id() {
        let mut p = payload("User");
        p.resource_id = None;
        assert!(resource_id(&p).is_err());
    }

    #[test]
    fn test_invalid_user_data_is_bad_request() {
        let err = resource_data::<ScimUser>(&payload("User")).unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }
}
