use std::env;

/// Runtime configuration loaded from the environment (`.env` is read first in `main`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub session_secret: String,
    pub settings_encryption_key: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub sso: SsoConfig,
    pub scim_sync_interval_hours: u64,
    pub super_admin_email: String,
    pub default_company_id: String,
    pub cors_origins: Vec<String>,
    pub cookie_secure: bool,
}

/// OAuth2 endpoints and client credentials of the SSO provider
#[derive(Debug, Clone, Default)]
pub struct SsoConfig {
    pub authorization_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let session_secret = env::var("SESSION_SECRET")
            .map_err(|_| "SESSION_SECRET must be set".to_string())?;

        let port = var_or("PORT", "3002")
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let scim_sync_interval_hours = var_or("SCIM_SYNC_INTERVAL_HOURS", "0")
            .parse::<u64>()
            .map_err(|e| format!("Invalid SCIM_SYNC_INTERVAL_HOURS: {}", e))?;

        let cors_origins = var_or("CORS_ORIGINS", "http://localhost:5173,http://127.0.0.1:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port,
            mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_db: var_or("MONGODB_DB", "ofm"),
            session_secret,
            settings_encryption_key: var_or(
                "SETTINGS_ENCRYPTION_KEY",
                "default-key-change-in-production-32c",
            ),
            jwt_secret: var_or("JWT_SECRET", "default-secret-change-me"),
            jwt_issuer: var_or("JWT_ISSUER", "ofm-service"),
            jwt_audience: var_or("JWT_AUDIENCE", "ofm-api"),
            sso: SsoConfig {
                authorization_url: var_or("SSO_AUTHORIZATION_URL", ""),
                token_url: var_or("SSO_TOKEN_URL", ""),
                userinfo_url: var_or("SSO_USERINFO_URL", ""),
                client_id: var_or("SSO_CLIENT_ID", ""),
                client_secret: var_or("SSO_CLIENT_SECRET", ""),
                redirect_uri: var_or("SSO_REDIRECT_URI", ""),
                scopes: var_or("SSO_SCOPES", "openid email profile"),
            },
            scim_sync_interval_hours,
            super_admin_email: var_or("SUPER_ADMIN_EMAIL", "admin@ias.co.id"),
            default_company_id: var_or("DEFAULT_COMPANY_ID", "IAS"),
            cors_origins,
            cookie_secure: var_or("COOKIE_SECURE", "false") == "true",
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            mongodb_uri: "mongodb://localhost:27017".into(),
            mongodb_db: "ofm_test".into(),
            session_secret: "test-session-secret".into(),
            settings_encryption_key: "test-settings-key".into(),
            jwt_secret: "test-jwt-secret".into(),
            jwt_issuer: "ofm-service".into(),
            jwt_audience: "ofm-api".into(),
            sso: SsoConfig {
                authorization_url: "https://sso.example.com/oauth/authorize".into(),
                token_url: "https://sso.example.com/oauth/token".into(),
                userinfo_url: "https://sso.example.com/oauth/userinfo".into(),
                client_id: "ofm-client".into(),
                client_secret: "ofm-secret".into(),
                redirect_uri: "http://localhost:3002/auth/callback".into(),
                scopes: "openid email profile".into(),
            },
            scim_sync_interval_hours: 0,
            super_admin_email: "admin@ias.co.id".into(),
            default_company_id: "IAS".into(),
            cors_origins: vec![],
            cookie_secure: false,
        }
    }
}
