use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Usuário local, criado no primeiro login SSO ou pela sincronização SCIM.
/// Não existe senha local: `passwordHash` nunca é gravado nem retornado.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub email: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
    /// `_id` (hex) dos roles atribuídos
    #[serde(default)]
    pub role_ids: Vec<String>,
    /// Empresas extras que o usuário pode acessar
    #[serde(default)]
    pub company_access: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_user_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn display_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub company_id: Option<String>,
    pub department_id: Option<String>,
    pub position_id: Option<String>,
    pub manager_id: Option<String>,
    pub role_ids: Option<Vec<String>>,
    pub company_access: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// `ssoUserId` não faz parte do update: é imutável pela API
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_access: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_ignores_sso_user_id() {
        let update: UpdateUserRequest =
            serde_json::from_value(serde_json::json!({ "ssoUserId": "evil", "phone": "0812" })).unwrap();
        let doc = mongodb::bson::to_document(&update).unwrap();
        assert!(doc.get("ssoUserId").is_none());
        assert_eq!(doc.get_str("phone").unwrap(), "0812");
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_password_hash_is_never_deserialized_back_out() {
        let json = serde_json::json!({
            "userId": "E001", "email": "a@ias.co.id", "username": "a",
            "passwordHash": "x", "createdAt": 0, "updatedAt": 0
        });
        let user: User = serde_json::from_value(json).unwrap();
        let out = serde_json::to_value(&user).unwrap();
        assert!(out.get("passwordHash").is_none());
        assert_eq!(out["isActive"], true);
    }
}
