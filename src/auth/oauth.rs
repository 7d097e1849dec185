use super::pkce;
use crate::config::SsoConfig;
use crate::utils::error::ApiError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthTokens {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> i64 {
    3600
}

/// Resposta do userinfo do SSO; campos do diretório são opcionais
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "email_verified")]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub org_unit_id: Option<String>,
    #[serde(default)]
    pub position_id: Option<String>,
    #[serde(default)]
    pub manager_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

/// Cliente OAuth2 (Authorization Code + PKCE) do SSO
#[derive(Clone)]
pub struct SsoClient {
    config: SsoConfig,
    http: reqwest::Client,
}

impl SsoClient {
    pub fn new(config: SsoConfig) -> Self {
        Self { config, http: reqwest::Client::new() }
    }

    pub fn build_authorization_url(&self, redirect_path: &str) -> Result<AuthorizationRequest, ApiError> {
        let pair = pkce::generate_pair().map_err(ApiError::Internal)?;
        let state = pkce::random_hex(32).map_err(ApiError::Internal)?;
        let state_param = format!("{}:{}", state, redirect_path);

        let params = [
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", self.config.scopes.as_str()),
            ("state", state_param.as_str()),
            ("code_challenge", pair.code_challenge.as_str()),
            ("code_challenge_method", "S256"),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(AuthorizationRequest {
            url: format!("{}?{}", self.config.authorization_url, query),
            state,
            code_verifier: pair.code_verifier,
        })
    }

    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<OAuthTokens, ApiError> {
        log::info!("🔐 Exchanging authorization code at {}", self.config.token_url);

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code_verifier", code_verifier),
            ])
            .send()
            .await?;

        let tokens = parse_json_response::<OAuthTokens>(response, "Token exchange").await?;
        log::info!("✅ Token exchange successful");
        Ok(tokens)
    }

    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<OAuthTokens, ApiError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        parse_json_response(response, "Token refresh").await
    }

    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, ApiError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        parse_json_response(response, "User info").await
    }

    /// Best-effort: o chamador ignora erros
    pub async fn revoke(&self, token: &str, token_type_hint: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(revoke_url(&self.config.token_url))
            .form(&[
                ("token", token),
                ("token_type_hint", token_type_hint),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!("Token revoke failed: {}", response.status())));
        }
        Ok(())
    }
}

pub(crate) async fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("❌ {} failed: {} {}", what, status, body);
        return Err(ApiError::Upstream(format!("{} failed: {} {}", what, status.as_u16(), body)));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Upstream(format!("{} returned invalid JSON: {}", what, e)))
}

pub fn revoke_url(token_url: &str) -> String {
    token_url.replacen("/token", "/revoke", 1)
}

/// Separa o parâmetro `state` do callback em (state, redirect_path)
pub fn split_state(raw: &str) -> (&str, &str) {
    match raw.split_once(':') {
        Some((state, redirect)) if !redirect.is_empty() => (state, redirect),
        Some((state, _)) => (state, "/"),
        None => (raw, "/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SsoClient {
        SsoClient::new(crate::config::AppConfig::for_tests().sso)
    }

    #[test]
    fn test_authorization_url_carries_pkce_and_state() {
        let req = client().build_authorization_url("/meeting").unwrap();

        assert!(req.url.starts_with("https://sso.example.com/oauth/authorize?"));
        assert!(req.url.contains("response_type=code"));
        assert!(req.url.contains("client_id=ofm-client"));
        assert!(req.url.contains("code_challenge_method=S256"));
        assert!(req.url.contains(&format!("code_challenge={}", pkce::code_challenge(&req.code_verifier))));
        assert!(req.url.contains(&format!("state={}%3A%2Fmeeting", req.state)));
        assert!(req.url.contains("scope=openid%20email%20profile"));
        assert_eq!(req.state.len(), 64);
    }

    #[test]
    fn test_revoke_url() {
        assert_eq!(revoke_url("https://sso.example.com/oauth/token"), "https://sso.example.com/oauth/revoke");
    }

    #[test]
    fn test_split_state() {
        assert_eq!(split_state("abc:/transport/new"), ("abc", "/transport/new"));
        assert_eq!(split_state("abc:"), ("abc", "/"));
        assert_eq!(split_state("abc"), ("abc", "/"));
        assert_eq!(split_state("abc:/a:b"), ("abc", "/a:b"));
    }

    #[test]
    fn test_user_info_with_directory_fields() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({
            "sub": "u-1",
            "email": "budi@ias.co.id",
            "email_verified": true,
            "employeeId": "E123",
            "organizationId": "IAS"
        }))
        .unwrap();
        assert_eq!(info.employee_id.as_deref(), Some("E123"));
        assert_eq!(info.organization_id.as_deref(), Some("IAS"));
        assert_eq!(info.email_verified, Some(true));
        assert!(info.manager_id.is_none());
    }

    #[test]
    fn test_tokens_defaults() {
        let tokens: OAuthTokens = serde_json::from_value(serde_json::json!({ "access_token": "at" })).unwrap();
        assert_eq!(tokens.expires_in, 3600);
        assert_eq!(tokens.token_type, "Bearer");
        assert!(tokens.refresh_token.is_none());
    }
}
