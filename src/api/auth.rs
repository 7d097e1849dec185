use crate::api::response::ok;
use crate::auth::api_token::{ApiTokenResponse, TokenSubject};
use crate::auth::oauth::split_state;
use crate::auth::oauth_state::STATE_STORE;
use crate::auth::session::{SessionData, SESSION_COOKIE};
use crate::auth::user_sync::sync_user_from_sso;
use crate::auth::AuthContext;
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::utils::error::ApiError;
use crate::utils::validation::now_ms;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Path to return to after login
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Só caminhos relativos do próprio app (evita open redirect)
pub fn safe_redirect_path(redirect: Option<&str>) -> String {
    match redirect.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ => "/".to_string(),
    }
}

fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::Found().append_header(("Location", location)).finish()
}

#[utoipa::path(
    get,
    path = "/auth/login",
    tag = "Auth",
    responses((status = 302, description = "Redirect to the SSO authorization page"))
)]
#[get("/login")]
pub async fn login(auth: web::Data<AuthContext>, query: web::Query<LoginQuery>) -> Result<HttpResponse, ApiError> {
    let redirect_path = safe_redirect_path(query.redirect.as_deref());
    let request = auth.sso.build_authorization_url(&redirect_path)?;
    STATE_STORE.save(&request.state, &request.code_verifier, &redirect_path);
    log::info!("🔐 SSO login started (redirect {})", redirect_path);
    Ok(redirect_to(&request.url))
}

#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "Auth",
    responses(
        (status = 302, description = "Session created, redirect to the stored path"),
        (status = 400, description = "Unknown or expired state")
    )
)]
#[get("/callback")]
pub async fn callback(
    auth: web::Data<AuthContext>,
    config: web::Data<AppConfig>,
    db: web::Data<MongoDB>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, ApiError> {
    if let Some(error) = query.error.as_deref() {
        if error == "access_denied" {
            log::info!("🔐 SSO login cancelled by user");
            return Ok(redirect_to("/?cancelled=true"));
        }
        log::warn!("⚠️ SSO callback error: {}", error);
        return Ok(redirect_to(&format!("/?error={}", urlencoding::encode(error))));
    }

    let (Some(code), Some(raw_state)) = (query.code.as_deref(), query.state.as_deref()) else {
        return Ok(redirect_to("/?error=invalid_request"));
    };

    let (state, _) = split_state(raw_state);
    let pending = STATE_STORE
        .take(state)
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired state".to_string()))?;

    let tokens = match auth.sso.exchange_code(code, &pending.code_verifier).await {
        Ok(tokens) => tokens,
        Err(e) => {
            log::error!("❌ SSO code exchange failed: {}", e);
            return Ok(redirect_to("/?error=token_exchange_failed"));
        }
    };
    let info = match auth.sso.user_info(&tokens.access_token).await {
        Ok(info) => info,
        Err(e) => {
            log::error!("❌ SSO user info failed: {}", e);
            return Ok(redirect_to("/?error=userinfo_failed"));
        }
    };

    let (user, roles) = sync_user_from_sso(&db, &config, &info).await?;
    let session = SessionData::new(&info, tokens, &user, roles, now_ms());
    let sealed = auth.sessions.seal(&session)?;

    log::info!("✅ SSO login: {} ({})", user.user_id, user.email);
    Ok(HttpResponse::Found()
        .append_header(("Location", pending.redirect_path))
        .cookie(auth.sessions.cookie(sealed))
        .finish())
}

async fn do_logout(auth: &AuthContext, req: &HttpRequest) -> HttpResponse {
    let session = req.cookie(SESSION_COOKIE).and_then(|c| auth.sessions.unseal(c.value()));
    if let Some(refresh_token) = session.as_ref().and_then(|s| s.tokens.refresh_token.as_deref()) {
        if let Err(e) = auth.sso.revoke(refresh_token, "refresh_token").await {
            log::warn!("⚠️ Token revoke failed (ignored): {}", e);
        }
    }
    if let Some(session) = session {
        log::info!("👋 Logout: {}", session.user_id);
    }

    HttpResponse::Found()
        .append_header(("Location", "/"))
        .cookie(auth.sessions.removal_cookie())
        .finish()
}

#[get("/logout")]
pub async fn logout_get(auth: web::Data<AuthContext>, req: HttpRequest) -> HttpResponse {
    do_logout(&auth, &req).await
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 302, description = "Session cleared"))
)]
#[post("/logout")]
pub async fn logout(auth: web::Data<AuthContext>, req: HttpRequest) -> HttpResponse {
    do_logout(&auth, &req).await
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub company_id: Option<String>,
    pub company_access: Vec<String>,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub is_driver: bool,
}

impl From<&AuthUser> for MeResponse {
    fn from(user: &AuthUser) -> Self {
        MeResponse {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            roles: user.roles.clone(),
            company_id: user.company_id.clone(),
            company_access: user.company_access.clone(),
            is_admin: user.is_admin(),
            is_super_admin: user.is_super_admin(),
            is_driver: user.is_driver(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
#[get("/me")]
pub async fn me(user: web::ReqData<AuthUser>) -> HttpResponse {
    ok(MeResponse::from(&*user))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "Session renewed"),
        (status = 401, description = "No session or refresh failed")
    )
)]
#[post("/refresh")]
pub async fn refresh(auth: web::Data<AuthContext>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let session = req
        .cookie(SESSION_COOKIE)
        .and_then(|c| auth.sessions.unseal(c.value()))
        .ok_or_else(|| ApiError::Unauthorized("No session to refresh".to_string()))?;

    let (session, sealed) = auth.sessions.refresh(&auth.sso, session, now_ms()).await.map_err(|e| {
        log::warn!("⚠️ Session refresh failed: {}", e);
        ApiError::Unauthorized("Session refresh failed".to_string())
    })?;

    log::info!("🔄 Session refreshed: {}", session.user_id);
    let mut response = ok(serde_json::json!({ "expiresAt": session.expires_at }));
    response
        .add_cookie(&auth.sessions.cookie(sealed))
        .map_err(|e| ApiError::Internal(format!("Failed to set cookie: {}", e)))?;
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    tag = "Auth",
    responses(
        (status = 200, description = "Bearer token for mobile and tablet clients", body = ApiTokenResponse),
        (status = 401, description = "Not authenticated")
    )
)]
#[post("/token")]
pub async fn issue_token(auth: web::Data<AuthContext>, user: web::ReqData<AuthUser>) -> Result<HttpResponse, ApiError> {
    let subject = TokenSubject {
        user_id: &user.user_id,
        email: &user.email,
        name: user.name.as_deref(),
        roles: &user.roles,
        company_id: user.company_id.as_deref(),
        company_access: &user.company_access,
    };
    let token = auth.tokens.issue(&subject)?;
    log::info!("🎟️ API token issued for {}", user.user_id);
    Ok(ok(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, App};

    #[test]
    fn test_safe_redirect_path() {
        assert_eq!(safe_redirect_path(Some("/transport?tab=mine")), "/transport?tab=mine");
        assert_eq!(safe_redirect_path(Some("//evil.example.com")), "/");
        assert_eq!(safe_redirect_path(Some("https://evil.example.com")), "/");
        assert_eq!(safe_redirect_path(Some("/\\evil")), "/");
        assert_eq!(safe_redirect_path(None), "/");
    }

    #[actix_web::test]
    async fn test_login_redirects_to_sso_and_stores_state() {
        let config = AppConfig::for_tests();
        let auth = AuthContext::from_config(&config);
        let app = actix_test::init_service(
            App::new().app_data(web::Data::new(auth)).service(web::scope("/auth").service(login)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/auth/login?redirect=/meetings").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 302);
        let location = resp.headers().get("Location").unwrap().to_str().unwrap();
        assert!(location.starts_with(&config.sso.authorization_url));
        assert!(location.contains("code_challenge_method=S256"));
        assert!(location.contains("%3A%2Fmeetings"));
    }

    #[actix_web::test]
    async fn test_callback_cancelled_and_missing_params() {
        let config = AppConfig::for_tests();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(AuthContext::from_config(&config)))
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(MongoDB::unconnected().await))
                .service(web::scope("/auth").service(callback)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/auth/callback?error=access_denied").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.headers().get("Location").unwrap(), "/?cancelled=true");

        let req = actix_test::TestRequest::get().uri("/auth/callback?code=abc").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.headers().get("Location").unwrap(), "/?error=invalid_request");
    }

    #[actix_web::test]
    async fn test_logout_clears_cookie() {
        let config = AppConfig::for_tests();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(AuthContext::from_config(&config)))
                .service(web::scope("/auth").service(logout).service(logout_get)),
        )
        .await;

        let req = actix_test::TestRequest::post().uri("/auth/logout").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 302);
        let cookie = resp.response().cookies().find(|c| c.name() == SESSION_COOKIE).unwrap();
        assert_eq!(cookie.value(), "");
    }
}
