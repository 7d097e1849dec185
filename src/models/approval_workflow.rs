use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_required_approvers() -> i32 {
    1
}

fn default_escalation_hours() -> i32 {
    24
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowModule {
    Transportation,
    Meeting,
    Facility,
}

impl WorkflowModule {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "transportation" => Some(WorkflowModule::Transportation),
            "meeting" => Some(WorkflowModule::Meeting),
            "facility" => Some(WorkflowModule::Facility),
            _ => None,
        }
    }
}

/// Regras de aprovação por módulo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalWorkflow {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub workflow_name: String,
    pub module: WorkflowModule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_required_approvers")]
    pub required_approvers: i32,
    #[serde(default)]
    pub approver_roles: Vec<String>,
    #[serde(default)]
    pub approver_users: Vec<String>,
    #[serde(default)]
    pub auto_approve_enabled: bool,
    /// Condições livres (JSON arbitrário)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_approve_conditions: Option<serde_json::Value>,
    #[serde(default)]
    pub escalation_enabled: bool,
    #[serde(default = "default_escalation_hours")]
    pub escalation_hours: i32,
    #[serde(default)]
    pub escalation_to_roles: Vec<String>,
    #[serde(default = "default_true")]
    pub notify_on_submit: bool,
    #[serde(default = "default_true")]
    pub notify_on_approval: bool,
    #[serde(default = "default_true")]
    pub notify_on_rejection: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub priority: i32,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowRequest {
    pub workflow_name: Option<String>,
    pub module: Option<WorkflowModule>,
    pub description: Option<String>,
    pub required_approvers: Option<i32>,
    pub approver_roles: Option<Vec<String>>,
    pub approver_users: Option<Vec<String>>,
    pub auto_approve_enabled: Option<bool>,
    pub auto_approve_conditions: Option<serde_json::Value>,
    pub escalation_enabled: Option<bool>,
    pub escalation_hours: Option<i32>,
    pub escalation_to_roles: Option<Vec<String>>,
    pub notify_on_submit: Option<bool>,
    pub notify_on_approval: Option<bool>,
    pub notify_on_rejection: Option<bool>,
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkflowRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<WorkflowModule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_approvers: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_users: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_approve_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_approve_conditions: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_hours: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_to_roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_on_submit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_on_approval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_on_rejection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}
