use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const SCIM_FULL_SYNC: &str = "scim_full_sync";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityStats {
    pub created: u32,
    pub updated: u32,
    pub deactivated: u32,
    pub errors: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub users: EntityStats,
    pub groups: EntityStats,
}

/// Registro de uma execução de sync (sucesso ou falha)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistory {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub sync_type: String,
    pub started_at: i64,
    pub completed_at: i64,
    pub status: SyncStatus,
    pub stats: SyncStats,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub last_sync: Option<i64>,
    /// success | failed | never
    pub status: String,
    pub stats: Option<SyncStats>,
    pub error: Option<String>,
}

impl SyncStatusResponse {
    pub fn from_history(last: Option<&SyncHistory>) -> Self {
        match last {
            None => SyncStatusResponse {
                last_sync: None,
                status: "never".to_string(),
                stats: None,
                error: None,
            },
            Some(h) => SyncStatusResponse {
                last_sync: Some(h.completed_at),
                status: match h.status {
                    SyncStatus::Success => "success".to_string(),
                    SyncStatus::Failed => "failed".to_string(),
                },
                stats: Some(h.stats.clone()),
                error: h.errors.first().cloned(),
            },
        }
    }
}

/// Evento recebido pelo webhook SCIM
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub event_type: String,
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub received_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_never_when_no_history() {
        let status = SyncStatusResponse::from_history(None);
        assert_eq!(status.status, "never");
        assert!(status.last_sync.is_none());
    }

    #[test]
    fn test_status_from_failed_history() {
        let history = SyncHistory {
            id: None,
            sync_type: SCIM_FULL_SYNC.to_string(),
            started_at: 1,
            completed_at: 2,
            status: SyncStatus::Failed,
            stats: SyncStats::default(),
            errors: vec!["connection refused".to_string()],
            triggered_by: None,
        };
        let status = SyncStatusResponse::from_history(Some(&history));
        assert_eq!(status.status, "failed");
        assert_eq!(status.last_sync, Some(2));
        assert_eq!(status.error.as_deref(), Some("connection refused"));
    }
}
