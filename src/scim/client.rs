use super::types::{ConnectionTest, ListResponse, ScimGroup, ScimToken, ScimUser, PAGE_SIZE};
use crate::auth::oauth::parse_json_response;
use crate::services::settings_service::{ScimConfig, SettingsStore};
use crate::utils::cache::TtlCell;
use crate::utils::error::{ApiError, ApiResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

const CONFIG_TTL: Duration = Duration::from_secs(60);
/// Renova o token um minuto antes de expirar
const TOKEN_MARGIN_SECS: u64 = 60;
const SCIM_CONTENT_TYPE: &str = "application/scim+json";

pub const NOT_CONFIGURED: &str = "SCIM not configured. Please set SCIM credentials in Settings.";

/// Origem do diretório corporativo (SSO via SCIM 2.0)
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn fetch_all_users(&self) -> ApiResult<Vec<ScimUser>>;
    async fn fetch_all_groups(&self) -> ApiResult<Vec<ScimGroup>>;
    async fn test_connection(&self) -> ConnectionTest;
}

pub fn token_ttl(expires_in: u64) -> Duration {
    Duration::from_secs(expires_in.saturating_sub(TOKEN_MARGIN_SECS))
}

/// Página curta encerra a paginação
pub fn is_last_page(received: usize, page_size: usize) -> bool {
    received < page_size
}

#[derive(Clone)]
pub struct ScimClient {
    settings: SettingsStore,
    http: reqwest::Client,
    config: Arc<TtlCell<ScimConfig>>,
    token: Arc<TtlCell<String>>,
}

impl ScimClient {
    pub fn new(settings: SettingsStore) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
            config: Arc::new(TtlCell::new()),
            token: Arc::new(TtlCell::new()),
        }
    }

    pub async fn config(&self) -> ApiResult<ScimConfig> {
        if let Some(config) = self.config.get() {
            return Ok(config);
        }
        let config = self.settings.scim_config().await?;
        self.config.set(config.clone(), CONFIG_TTL);
        Ok(config)
    }

    /// Chamado após salvar settings SCIM
    pub fn invalidate(&self) {
        self.config.clear();
        self.token.clear();
    }

    pub async fn is_configured(&self) -> bool {
        self.config().await.map(|c| c.is_configured()).unwrap_or(false)
    }

    pub async fn webhook_secret(&self) -> ApiResult<Option<String>> {
        Ok(self.config().await?.webhook_secret)
    }

    async fn access_token(&self, config: &ScimConfig) -> ApiResult<String> {
        if let Some(token) = self.token.get() {
            return Ok(token);
        }
        let (Some(client_id), Some(client_secret)) = (config.client_id.as_deref(), config.client_secret.as_deref())
        else {
            return Err(ApiError::BadRequest(NOT_CONFIGURED.to_string()));
        };

        let response = self
            .http
            .post(format!("{}/scim/v2/token", config.base_url()))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        let token: ScimToken = parse_json_response(response, "SCIM token").await?;
        self.token.set(token.access_token.clone(), token_ttl(token.expires_in));
        log::info!("🔑 SCIM access token obtained (expires in {}s)", token.expires_in);
        Ok(token.access_token)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let config = self.config().await?;
        let token = self.access_token(&config).await?;
        let response = self
            .http
            .get(format!("{}/scim/v2/{}", config.base_url(), path))
            .query(query)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, SCIM_CONTENT_TYPE)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.token.clear();
        }
        parse_json_response(response, &format!("SCIM {}", path)).await
    }

    async fn fetch_all<T: DeserializeOwned>(&self, resource: &str) -> ApiResult<Vec<T>> {
        let mut all = Vec::new();
        let mut start_index = 1;
        loop {
            let page: ListResponse<T> = self
                .get(resource, &[("startIndex", start_index.to_string()), ("count", PAGE_SIZE.to_string())])
                .await?;
            let received = page.resources.len();
            all.extend(page.resources);
            if is_last_page(received, PAGE_SIZE) || (page.total_results > 0 && all.len() >= page.total_results) {
                break;
            }
            start_index += received;
        }
        log::debug!("📥 Fetched {} SCIM {}", all.len(), resource);
        Ok(all)
    }

    pub async fn check_connection(&self) -> ConnectionTest {
        match self.get::<serde_json::Value>("ServiceProviderConfig", &[]).await {
            Ok(provider) => ConnectionTest {
                success: true,
                message: "Successfully connected to SSO SCIM API".to_string(),
                details: Some(serde_json::json!({
                    "supportsBulk": provider["bulk"]["supported"],
                    "supportsFilter": provider["filter"]["supported"],
                    "maxResults": provider["filter"]["maxResults"],
                })),
            },
            Err(e) => {
                log::warn!("⚠️ SCIM connection test failed: {}", e);
                ConnectionTest { success: false, message: e.to_string(), details: None }
            }
        }
    }
}

#[async_trait]
impl DirectorySource for ScimClient {
    async fn fetch_all_users(&self) -> ApiResult<Vec<ScimUser>> {
        self.fetch_all("Users").await
    }

    async fn fetch_all_groups(&self) -> ApiResult<Vec<ScimGroup>> {
        self.fetch_all("Groups").await
    }

    async fn test_connection(&self) -> ConnectionTest {
        self.check_connection().await
    }
}
