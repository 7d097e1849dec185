use crate::auth::session::SESSION_COOKIE;
use crate::auth::AuthContext;
use crate::utils::error::ApiError;
use crate::utils::validation::now_ms;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::LocalBoxFuture;
use serde::Serialize;
use std::future::{ready, Ready};

pub const SUPER_ADMIN: &str = "super_admin";
pub const GLOBAL_ADMIN: &str = "global_admin";
pub const REGIONAL_ADMIN: &str = "regional_admin";
pub const ADMIN: &str = "admin";
pub const DRIVER: &str = "driver";

/// Usuário autenticado, inserido nas extensions do request
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub company_id: Option<String>,
    pub company_access: Vec<String>,
}

impl AuthUser {
    fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(SUPER_ADMIN)
    }

    pub fn is_global_admin(&self) -> bool {
        self.has_role(GLOBAL_ADMIN) || self.is_super_admin()
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN) || self.has_role(REGIONAL_ADMIN) || self.is_global_admin()
    }

    pub fn is_driver(&self) -> bool {
        self.has_role(DRIVER)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }

    pub fn require_driver(&self) -> Result<(), ApiError> {
        if self.is_driver() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Driver role required".to_string()))
        }
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.email.clone())
    }
}

/// Resolve o usuário: `Authorization: Bearer <jwt>` primeiro, depois o cookie de sessão
pub fn authenticate(req: &HttpRequest, ctx: &AuthContext) -> Result<AuthUser, ApiError> {
    if let Some(header) = req.headers().get(actix_web::http::header::AUTHORIZATION) {
        let value = header
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Invalid token format".to_string()))?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Invalid token format".to_string()))?;

        let claims = ctx.tokens.verify(token)?;
        return Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
            name: claims.name,
            roles: claims.roles,
            company_id: claims.company_id,
            company_access: claims.company_access,
        });
    }

    let cookie = req
        .cookie(SESSION_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
    let session = ctx
        .sessions
        .open(cookie.value(), now_ms())
        .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".to_string()))?;

    Ok(AuthUser {
        user_id: session.user_id,
        email: session.email,
        name: session.name,
        roles: session.roles,
        company_id: session.company_id,
        company_access: session.company_access,
    })
}

/// Extractor para rotas fora do `AuthMiddleware` (rotas mistas dos tablets)
impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        let result = match req.app_data::<web::Data<AuthContext>>() {
            Some(ctx) => authenticate(req, ctx),
            None => Err(ApiError::Internal("Auth context not configured".to_string())),
        };
        ready(result)
    }
}

pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let result = match req.app_data::<web::Data<AuthContext>>() {
            Some(ctx) => authenticate(req.request(), ctx),
            None => Err(ApiError::Internal("Auth context not configured".to_string())),
        };

        match result {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(e) => {
                log::debug!("🔒 Rejected {} {}: {}", req.method(), req.path(), e);
                let response = req.into_response(e.error_response()).map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::api_token::TokenSubject;
    use crate::auth::oauth::OAuthTokens;
    use crate::auth::session::SessionData;
    use crate::config::AppConfig;
    use actix_web::{cookie::Cookie, test as actix_test, App, HttpResponse};

    fn user(roles: &[&str]) -> AuthUser {
        AuthUser {
            user_id: "E001".into(),
            email: "budi@ias.co.id".into(),
            name: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            company_id: Some("IAS".into()),
            company_access: vec![],
        }
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(user(&["super_admin"]).is_global_admin());
        assert!(user(&["super_admin"]).is_admin());
        assert!(user(&["global_admin"]).is_admin());
        assert!(!user(&["global_admin"]).is_super_admin());
        assert!(user(&["regional_admin"]).is_admin());
        assert!(!user(&["regional_admin"]).is_global_admin());
        assert!(!user(&["employee"]).is_admin());
        assert!(user(&["employee", "driver"]).is_driver());
    }

    #[test]
    fn test_require_admin() {
        assert!(user(&["admin"]).require_admin().is_ok());
        assert_eq!(user(&["employee"]).require_admin().unwrap_err().code(), "FORBIDDEN");
    }

    #[test]
    fn test_require_driver() {
        assert!(user(&["driver"]).require_driver().is_ok());
        let err = user(&["admin"]).require_driver().unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
        assert_eq!(err.to_string(), "Driver role required");
    }

    async fn whoami(user: web::ReqData<AuthUser>) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id.clone())
    }

    fn context() -> AuthContext {
        AuthContext::from_config(&AppConfig::for_tests())
    }

    #[actix_web::test]
    async fn test_missing_credentials_returns_envelope() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(context()))
                .service(web::scope("/api").wrap(AuthMiddleware).route("/me", web::get().to(whoami))),
        )
        .await;

        let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/api/me").to_request()).await;
        assert_eq!(resp.status(), 401);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[actix_web::test]
    async fn test_bearer_token_is_accepted() {
        let ctx = context();
        let roles = vec!["employee".to_string()];
        let token = ctx
            .tokens
            .issue(&TokenSubject {
                user_id: "E042",
                email: "siti@ias.co.id",
                name: None,
                roles: &roles,
                company_id: Some("IAS"),
                company_access: &[],
            })
            .unwrap();

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .service(web::scope("/api").wrap(AuthMiddleware).route("/me", web::get().to(whoami))),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", token.access_token)))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(actix_test::read_body(resp).await, "E042");
    }

    fn sealed_session(ctx: &AuthContext, expires_at: i64) -> String {
        let session = SessionData {
            user_id: "E007".into(),
            email: "ani@ias.co.id".into(),
            name: Some("Ani".into()),
            sso_user_id: "sso-7".into(),
            company_id: Some("IAS".into()),
            company_access: vec![],
            roles: vec!["admin".into()],
            tokens: OAuthTokens {
                access_token: "at".into(),
                token_type: "Bearer".into(),
                expires_in: 3600,
                refresh_token: None,
                scope: None,
                id_token: None,
            },
            expires_at,
        };
        ctx.sessions.seal(&session).unwrap()
    }

    #[actix_web::test]
    async fn test_session_cookie_is_accepted_until_expiry() {
        let ctx = context();
        let valid = sealed_session(&ctx, now_ms() + 60_000);
        let expired = sealed_session(&ctx, now_ms() - 1);

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .service(web::scope("/api").wrap(AuthMiddleware).route("/me", web::get().to(whoami))),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/me").cookie(Cookie::new(SESSION_COOKIE, valid)).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(actix_test::read_body(resp).await, "E007");

        let req = actix_test::TestRequest::get().uri("/api/me").cookie(Cookie::new(SESSION_COOKIE, expired)).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_malformed_authorization_header() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(context()))
                .service(web::scope("/api").wrap(AuthMiddleware).route("/me", web::get().to(whoami))),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/me").insert_header(("Authorization", "Token abc")).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    async fn whoami_extracted(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id)
    }

    #[actix_web::test]
    async fn test_extractor_outside_middleware() {
        let ctx = context();
        let cookie = sealed_session(&ctx, now_ms() + 60_000);
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .route("/open", web::get().to(whoami_extracted)),
        )
        .await;

        let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/open").to_request()).await;
        assert_eq!(resp.status(), 401);

        let req = actix_test::TestRequest::get().uri("/open").cookie(Cookie::new(SESSION_COOKIE, cookie)).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(actix_test::read_body(resp).await, "E007");
    }
}
