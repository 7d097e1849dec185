use super::oauth::{OAuthTokens, SsoClient, UserInfo};
use crate::models::User;
use crate::utils::crypto::SecretBox;
use crate::utils::error::ApiError;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "ofm_session";
const SESSION_SALT: &[u8] = b"ofm-session-salt";
const PBKDF2_ITERATIONS: u32 = 100_000;
const COOKIE_MAX_AGE_DAYS: i64 = 30;

/// Conteúdo da sessão, cifrado no cookie `ofm_session`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub sso_user_id: String,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub company_access: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub tokens: OAuthTokens,
    /// epoch ms
    pub expires_at: i64,
}

impl SessionData {
    pub fn new(info: &UserInfo, tokens: OAuthTokens, user: &User, roles: Vec<String>, now_ms: i64) -> Self {
        let expires_at = now_ms + tokens.expires_in * 1000;
        SessionData {
            user_id: user.user_id.clone(),
            email: info.email.clone(),
            name: info.name.clone().or_else(|| user.display_name()),
            sso_user_id: info.sub.clone(),
            company_id: user.company_id.clone(),
            company_access: user.company_access.clone(),
            roles,
            tokens,
            expires_at,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }
}

/// Sela/abre sessões com AES-256-GCM (chave PBKDF2 de `SESSION_SECRET`)
#[derive(Clone)]
pub struct SessionManager {
    secret: SecretBox,
    cookie_secure: bool,
}

impl SessionManager {
    pub fn new(session_secret: &str, cookie_secure: bool) -> Self {
        Self {
            secret: SecretBox::from_password(session_secret, SESSION_SALT, PBKDF2_ITERATIONS),
            cookie_secure,
        }
    }

    pub fn seal(&self, session: &SessionData) -> Result<String, ApiError> {
        let json = serde_json::to_vec(session)
            .map_err(|e| ApiError::Internal(format!("Failed to encode session: {}", e)))?;
        self.secret.seal(&json).map_err(ApiError::Internal)
    }

    /// Decifra sem checar expiração (usado pelo refresh)
    pub fn unseal(&self, token: &str) -> Option<SessionData> {
        let bytes = match self.secret.open(token) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("Session decode error: {}", e);
                return None;
            }
        };
        serde_json::from_slice(&bytes).ok()
    }

    /// `None` para token adulterado, ilegível ou expirado
    pub fn open(&self, token: &str, now_ms: i64) -> Option<SessionData> {
        self.unseal(token).filter(|s| !s.is_expired(now_ms))
    }

    /// Renova os tokens no SSO e sela novamente a sessão
    pub async fn refresh(&self, sso: &SsoClient, mut session: SessionData, now_ms: i64) -> Result<(SessionData, String), ApiError> {
        let refresh_token = session
            .tokens
            .refresh_token
            .clone()
            .ok_or_else(|| ApiError::Unauthorized("Session cannot be refreshed".to_string()))?;

        let mut tokens = sso.refresh_tokens(&refresh_token).await?;
        // Alguns provedores não rotacionam o refresh token
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token);
        }

        let info = sso.user_info(&tokens.access_token).await?;
        session.expires_at = now_ms + tokens.expires_in * 1000;
        session.tokens = tokens;
        if info.name.is_some() {
            session.name = info.name;
        }

        let sealed = self.seal(&session)?;
        Ok((session, sealed))
    }

    pub fn cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, token)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(CookieDuration::days(COOKIE_MAX_AGE_DAYS))
            .finish()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
        cookie.make_removal();
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: i64) -> SessionData {
        SessionData {
            user_id: "E001".into(),
            email: "budi@ias.co.id".into(),
            name: Some("Budi".into()),
            sso_user_id: "sso-1".into(),
            company_id: Some("IAS".into()),
            company_access: vec![],
            roles: vec!["employee".into()],
            tokens: OAuthTokens {
                access_token: "at".into(),
                token_type: "Bearer".into(),
                expires_in: 3600,
                refresh_token: Some("rt".into()),
                scope: None,
                id_token: None,
            },
            expires_at,
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new("test-session-secret", false)
    }

    #[test]
    fn test_seal_and_open() {
        let m = manager();
        let token = m.seal(&session(10_000)).unwrap();
        assert_eq!(m.open(&token, 5_000), Some(session(10_000)));
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let m = manager();
        let token = m.seal(&session(10_000)).unwrap();
        assert!(m.open(&token, 10_001).is_none());
        assert!(m.unseal(&token).is_some());
    }

    #[test]
    fn test_tampered_or_foreign_token_is_rejected() {
        let m = manager();
        let token = m.seal(&session(10_000)).unwrap();
        let mut chars: Vec<char> = token.chars().collect();
        let mid = chars.len() / 2;
        chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        assert!(m.open(&tampered, 0).is_none());
        assert!(m.open("garbage", 0).is_none());
        assert!(SessionManager::new("other-secret", false).open(&token, 0).is_none());
    }

    #[test]
    fn test_session_expiry_from_tokens() {
        let user: User = serde_json::from_value(serde_json::json!({
            "userId": "E001", "email": "budi@ias.co.id", "username": "budi",
            "companyId": "IAS", "createdAt": 0, "updatedAt": 0
        }))
        .unwrap();
        let info = UserInfo { sub: "sso-1".into(), email: "budi@ias.co.id".into(), ..Default::default() };
        let data = SessionData::new(&info, session(0).tokens, &user, vec!["employee".into()], 1_000);
        assert_eq!(data.expires_at, 1_000 + 3_600_000);
        assert_eq!(data.user_id, "E001");
        assert_eq!(data.company_id.as_deref(), Some("IAS"));
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = manager().cookie("token".into());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(CookieDuration::days(30)));
    }
}
