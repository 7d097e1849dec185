use serde::{Deserialize, Serialize};

pub const ENTERPRISE_USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
/// Máximo por página aceito pelo SSO
pub const PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScimName {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub formatted: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MultiValue {
    pub value: String,
    #[serde(default)]
    pub primary: Option<bool>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagerRef {
    pub value: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnterpriseExtension {
    #[serde(default)]
    pub employee_number: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub manager: Option<ManagerRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionExtension {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_manager: Option<bool>,
    #[serde(default)]
    pub level: Option<i32>,
}

fn default_active() -> bool {
    true
}

/// Recurso `User` do SCIM 2.0 com as extensões do SSO
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    pub id: String,
    #[serde(default)]
    pub external_id: Option<String>,
    pub user_name: String,
    #[serde(default)]
    pub name: Option<ScimName>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub emails: Vec<MultiValue>,
    #[serde(default)]
    pub phone_numbers: Vec<MultiValue>,
    #[serde(default, rename = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")]
    pub enterprise: Option<EnterpriseExtension>,
    #[serde(default, rename = "x-position")]
    pub position: Option<PositionExtension>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GroupMember {
    pub value: String,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgUnitExtension {
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub parent_unit_id: Option<String>,
    #[serde(default)]
    pub manager_id: Option<String>,
}

/// Recurso `Group` (unidade organizacional)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroup {
    pub id: String,
    #[serde(default)]
    pub external_id: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub members: Vec<GroupMember>,
    #[serde(default, rename = "x-orgUnit")]
    pub org_unit: Option<OrgUnitExtension>,
}

#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default, rename = "totalResults")]
    pub total_results: usize,
    #[serde(default = "Vec::new", rename = "Resources")]
    pub resources: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct ScimToken {
    pub access_token: String,
    #[serde(default = "default_token_lifetime")]
    pub expires_in: u64,
}

fn default_token_lifetime() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAction {
    Create,
    Update,
    Delete,
}

/// Corpo do webhook enviado pelo SSO
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub event: String,
    pub resource_type: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    pub action: WebhookAction,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserializes_extensions() {
        let json = serde_json::json!({
            "id": "u-1",
            "userName": "budi@ias.co.id",
            "active": false,
            "emails": [{ "value": "budi.santoso@ias.co.id", "primary": true }],
            ENTERPRISE_USER_SCHEMA: {
                "employeeNumber": "E001",
                "organization": "IAS-BALI",
                "manager": { "value": "E000" }
            },
            "x-position": { "id": "POS-7", "name": "Supervisor" }
        });
        let user: ScimUser = serde_json::from_value(json).unwrap();
        assert!(!user.active);
        let ext = user.enterprise.unwrap();
        assert_eq!(ext.employee_number.as_deref(), Some("E001"));
        assert_eq!(ext.manager.unwrap().value, "E000");
        assert_eq!(user.position.unwrap().id, "POS-7");
    }

    #[test]
    fn test_list_response_without_resources() {
        let list: ListResponse<ScimGroup> = serde_json::from_str(r#"{"totalResults":0}"#).unwrap();
        assert!(list.resources.is_empty());
    }

    #[test]
    fn test_webhook_payload() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"event":"user.deleted","resourceType":"User","resourceId":"u-1","action":"delete"}"#,
        )
        .unwrap();
        assert_eq!(payload.action, WebhookAction::Delete);
        assert!(payload.data.is_null());
    }
}
