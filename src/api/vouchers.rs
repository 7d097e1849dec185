use crate::api::response::{created, document_json, documents_json, ok, paginated, PageQuery};
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{ReconcileVoucherRequest, VoucherStatus};
use crate::services::voucher_service::{self, ImportContext, VoucherFilter};
use crate::utils::error::ApiError;
use actix_web::{get, patch, post, web, HttpResponse};
use serde::Deserialize;

/// Limite do corpo CSV do import
pub const IMPORT_PAYLOAD_LIMIT: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ImportQuery {
    pub filename: Option<String>,
    pub transport_company_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherQuery {
    pub status: Option<VoucherStatus>,
    pub provider: Option<String>,
    pub billing_month: Option<String>,
}

/// Vouchers são sempre da empresa do usuário
fn company_scope<'a>(user: &'a AuthUser, config: &'a AppConfig) -> &'a str {
    user.company_id.as_deref().unwrap_or(config.default_company_id.as_str())
}

#[utoipa::path(
    post,
    path = "/api/v1/vouchers/import",
    tag = "Vouchers",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 201, description = "Import result"),
        (status = 400, description = "No valid voucher codes found")
    ),
    security(("bearer_auth" = []))
)]
#[post("/import")]
pub async fn import_vouchers(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    query: web::Query<ImportQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let csv = std::str::from_utf8(&body).map_err(|_| ApiError::BadRequest("CSV must be UTF-8".to_string()))?;

    let ctx = ImportContext {
        filename: query.filename.as_deref().unwrap_or(""),
        transport_company_id: query.transport_company_id.as_deref().unwrap_or(""),
        imported_by: &user.user_id,
        company_id: company_scope(&user, &config),
    };
    let result = voucher_service::import_vouchers(&db, csv, ctx).await?;
    if !result.success {
        let message = result.errors.first().cloned().unwrap_or_else(|| "Import failed".to_string());
        return Err(ApiError::BadRequest(message));
    }
    Ok(created(result))
}

#[get("")]
pub async fn list_vouchers(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    query: web::Query<VoucherQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let filter = VoucherFilter {
        status: query.status,
        provider: query.provider.clone(),
        billing_month: query.billing_month.clone(),
    };
    let pagination = page.pagination();
    let (vouchers, total) =
        voucher_service::list_vouchers(&db, company_scope(&user, &config), &filter, &pagination).await?;
    Ok(paginated(documents_json(&vouchers), &pagination, total))
}

#[get("/stats")]
pub async fn voucher_stats(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    Ok(ok(voucher_service::voucher_stats(&db, company_scope(&user, &config)).await?))
}

/// GET /api/v1/vouchers/export - `{csv, filename, count}` dos vouchers usados
#[get("/export")]
pub async fn export_vouchers(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    query: web::Query<VoucherQuery>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let export = voucher_service::export_used_vouchers(
        &db,
        company_scope(&user, &config),
        query.provider.as_deref(),
        query.billing_month.as_deref(),
    )
    .await?;
    Ok(ok(export))
}

/// PATCH /api/v1/vouchers/{id} - conciliação com a fatura
#[patch("/{id}")]
pub async fn reconcile_voucher(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<ReconcileVoucherRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let voucher =
        voucher_service::reconcile_voucher(&db, &path, company_scope(&user, &config), body.into_inner()).await?;
    Ok(ok(document_json(&voucher)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(IMPORT_PAYLOAD_LIMIT))
        .service(import_vouchers)
        .service(voucher_stats)
        .service(export_vouchers)
        .service(list_vouchers)
        .service(reconcile_voucher);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_scope_defaults() {
        let config = AppConfig::for_tests();
        let mut user = AuthUser {
            user_id: "ADM1".into(),
            email: "admin@ias.co.id".into(),
            name: None,
            roles: vec!["admin".into()],
            company_id: None,
            company_access: vec![],
        };
        assert_eq!(company_scope(&user, &config), config.default_company_id);
        user.company_id = Some("IAS-BALI".into());
        assert_eq!(company_scope(&user, &config), "IAS-BALI");
    }
}
