pub mod api_token;
pub mod oauth;
pub mod oauth_state;
pub mod pkce;
pub mod session;
pub mod user_sync;

use crate::config::AppConfig;
use api_token::ApiTokenIssuer;
use oauth::SsoClient;
use session::SessionManager;

/// Tudo que as rotas e o middleware precisam para autenticar, compartilhado via `web::Data`
#[derive(Clone)]
pub struct AuthContext {
    pub sso: SsoClient,
    pub sessions: SessionManager,
    pub tokens: ApiTokenIssuer,
}

impl AuthContext {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            sso: SsoClient::new(config.sso.clone()),
            sessions: SessionManager::new(&config.session_secret, config.cookie_secure),
            tokens: ApiTokenIssuer::new(&config.jwt_secret, &config.jwt_issuer, &config.jwt_audience),
        }
    }
}
