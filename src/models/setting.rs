use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const SCIM_BASE_URL: &str = "scim.base_url";
pub const SCIM_CLIENT_ID: &str = "scim.client_id";
pub const SCIM_CLIENT_SECRET: &str = "scim.client_secret";
pub const SCIM_WEBHOOK_SECRET: &str = "scim.webhook_secret";
pub const SMTP_HOST: &str = "email.smtp_host";
pub const SMTP_PORT: &str = "email.smtp_port";
pub const SMTP_USER: &str = "email.smtp_user";
pub const SMTP_PASSWORD: &str = "email.smtp_password";
pub const APP_NAME: &str = "general.app_name";
pub const APP_URL: &str = "general.app_url";

/// Placeholder devolvido no lugar de valores secretos
pub const MASKED_VALUE: &str = "***HIDDEN***";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettingCategory {
    Scim,
    Email,
    General,
    Auth,
}

impl SettingCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scim" => Some(SettingCategory::Scim),
            "email" => Some(SettingCategory::Email),
            "general" => Some(SettingCategory::General),
            "auth" => Some(SettingCategory::Auth),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingCategory::Scim => "scim",
            SettingCategory::Email => "email",
            SettingCategory::General => "general",
            SettingCategory::Auth => "auth",
        }
    }
}

/// Configuração editável pelo admin; `value` é cifrado quando `is_secret`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub key: String,
    pub value: String,
    pub category: SettingCategory,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Definição de um setting padrão criado no seed
pub struct SettingDefault {
    pub key: &'static str,
    pub value: &'static str,
    pub category: SettingCategory,
    pub label: &'static str,
    pub description: &'static str,
    pub is_secret: bool,
    pub is_required: bool,
}

pub const DEFAULT_SETTINGS: &[SettingDefault] = &[
    SettingDefault {
        key: SCIM_BASE_URL,
        value: "http://localhost:5173",
        category: SettingCategory::Scim,
        label: "SSO Base URL",
        description: "Base URL of the SSO server",
        is_secret: false,
        is_required: true,
    },
    SettingDefault {
        key: SCIM_CLIENT_ID,
        value: "",
        category: SettingCategory::Scim,
        label: "SCIM Client ID",
        description: "OAuth 2.0 client ID from SSO",
        is_secret: false,
        is_required: true,
    },
    SettingDefault {
        key: SCIM_CLIENT_SECRET,
        value: "",
        category: SettingCategory::Scim,
        label: "SCIM Client Secret",
        description: "OAuth 2.0 client secret from SSO",
        is_secret: true,
        is_required: true,
    },
    SettingDefault {
        key: SCIM_WEBHOOK_SECRET,
        value: "",
        category: SettingCategory::Scim,
        label: "SCIM Webhook Secret",
        description: "Secret for verifying webhook signatures",
        is_secret: true,
        is_required: false,
    },
    SettingDefault {
        key: SMTP_HOST,
        value: "smtp.gmail.com",
        category: SettingCategory::Email,
        label: "SMTP Host",
        description: "Email server hostname",
        is_secret: false,
        is_required: false,
    },
    SettingDefault {
        key: SMTP_PORT,
        value: "587",
        category: SettingCategory::Email,
        label: "SMTP Port",
        description: "Email server port",
        is_secret: false,
        is_required: false,
    },
    SettingDefault {
        key: SMTP_USER,
        value: "",
        category: SettingCategory::Email,
        label: "SMTP Username",
        description: "Email account username",
        is_secret: false,
        is_required: false,
    },
    SettingDefault {
        key: SMTP_PASSWORD,
        value: "",
        category: SettingCategory::Email,
        label: "SMTP Password",
        description: "Email account password",
        is_secret: true,
        is_required: false,
    },
    SettingDefault {
        key: APP_NAME,
        value: "Office Facility Management",
        category: SettingCategory::General,
        label: "Application Name",
        description: "Name of the application",
        is_secret: false,
        is_required: true,
    },
    SettingDefault {
        key: APP_URL,
        value: "http://localhost:5074",
        category: SettingCategory::General,
        label: "Application URL",
        description: "Base URL of this application",
        is_secret: false,
        is_required: true,
    },
];

#[derive(Debug, Deserialize)]
pub struct SettingUpdate {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub settings: Vec<SettingUpdate>,
}
