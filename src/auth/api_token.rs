use crate::utils::error::ApiError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

const TOKEN_LIFETIME_HOURS: i64 = 24;

// JWT Claims dos tokens emitidos para apps mobile/tablet
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // userId local
    pub email: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub company_id: Option<String>,
    #[serde(default)]
    pub company_access: Vec<String>,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Emite e valida os bearer tokens HS256
#[derive(Clone)]
pub struct ApiTokenIssuer {
    secret: String,
    issuer: String,
    audience: String,
}

/// Identidade mínima para emitir um token
pub struct TokenSubject<'a> {
    pub user_id: &'a str,
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub roles: &'a [String],
    pub company_id: Option<&'a str>,
    pub company_access: &'a [String],
}

impl ApiTokenIssuer {
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        Self {
            secret: secret.to_string(),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }

    pub fn issue(&self, subject: &TokenSubject<'_>) -> Result<ApiTokenResponse, ApiError> {
        let iat = Utc::now().timestamp() as usize;
        let exp = (Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp() as usize;

        let claims = Claims {
            sub: subject.user_id.to_string(),
            email: subject.email.to_string(),
            name: subject.name.map(String::from),
            roles: subject.roles.to_vec(),
            company_id: subject.company_id.map(String::from),
            company_access: subject.company_access.to_vec(),
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_ref()))
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok(ApiTokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: TOKEN_LIFETIME_HOURS * 3600,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.audience.as_str()]);

        let mut issuers = HashSet::new();
        issuers.insert(self.issuer.clone());
        validation.iss = Some(issuers);

        decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_ref()), &validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> ApiTokenIssuer {
        ApiTokenIssuer::new("test-jwt-secret", "ofm-service", "ofm-api")
    }

    fn subject<'a>(roles: &'a [String], access: &'a [String]) -> TokenSubject<'a> {
        TokenSubject {
            user_id: "E001",
            email: "budi@ias.co.id",
            name: Some("Budi"),
            roles,
            company_id: Some("IAS"),
            company_access: access,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let roles = vec!["admin".to_string()];
        let token = issuer().issue(&subject(&roles, &[])).unwrap();
        assert_eq!(token.expires_in, 86_400);

        let claims = issuer().verify(&token.access_token).unwrap();
        assert_eq!(claims.sub, "E001");
        assert_eq!(claims.roles, roles);
        assert_eq!(claims.company_id.as_deref(), Some("IAS"));
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn test_wrong_secret_audience_or_issuer_is_rejected() {
        let token = issuer().issue(&subject(&[], &[])).unwrap().access_token;

        for other in [
            ApiTokenIssuer::new("other-secret", "ofm-service", "ofm-api"),
            ApiTokenIssuer::new("test-jwt-secret", "ofm-service", "other-api"),
            ApiTokenIssuer::new("test-jwt-secret", "someone-else", "ofm-api"),
        ] {
            assert_eq!(other.verify(&token).unwrap_err().code(), "UNAUTHORIZED");
        }
    }

    #[test]
    fn test_garbage_token() {
        assert!(issuer().verify("not.a.jwt").is_err());
    }
}
