use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Erro de validação de um campo do request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Validation { message: String, details: Vec<FieldError> },
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("Upstream error: {0}")]
    Upstream(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Falha de validação sem detalhes por campo
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation { message: message.into(), details: Vec::new() }
    }

    pub fn validation_failed(details: Vec<FieldError>) -> Self {
        ApiError::Validation { message: "Validation failed".to_string(), details }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Duplicate(_) => "DUPLICATE_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) | ApiError::Database(_) | ApiError::Upstream(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Mensagem exposta ao cliente (falhas internas não vazam detalhes)
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Database(_) => "Internal server error".to_string(),
            ApiError::Upstream(_) => "Upstream service error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl From<mongodb::bson::oid::Error> for ApiError {
    fn from(_: mongodb::bson::oid::Error) -> Self {
        ApiError::validation("Invalid ID")
    }
}

impl From<mongodb::bson::ser::Error> for ApiError {
    fn from(e: mongodb::bson::ser::Error) -> Self {
        ApiError::Internal(format!("Serialization error: {}", e))
    }
}

impl From<mongodb::bson::de::Error> for ApiError {
    fn from(e: mongodb::bson::de::Error) -> Self {
        ApiError::Internal(format!("Deserialization error: {}", e))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } | ApiError::Duplicate(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) | ApiError::Database(_) | ApiError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("❌ {}", self);
        }

        let details = match self {
            ApiError::Validation { details, .. } if !details.is_empty() => {
                Some(serde_json::to_value(details).unwrap_or(serde_json::Value::Null))
            }
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(crate::api::response::ApiResponse::<()>::failure(
            self.code(),
            self.public_message(),
            details,
        ))
    }
}
