use crate::utils::error::ApiError;
use serde::{Deserialize, Serialize};

/// Ciclo de vida comum a transporte, reunião e facility
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    /// Viagem iniciada pelo motorista
    InProgress,
    Rejected,
    Cancelled,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "in_progress" => Some(RequestStatus::InProgress),
            "rejected" => Some(RequestStatus::Rejected),
            "cancelled" => Some(RequestStatus::Cancelled),
            "completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Cancelled | RequestStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Dados do solicitante, gravados "flat" no documento
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    #[serde(default)]
    pub company_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
}

/// Campos de aprovação compartilhados
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";

/// Valida a mudança de status pedida no PATCH.
/// Permissão é checada antes do estado: sem permissão sempre dá 403.
pub fn check_transition(
    current: RequestStatus,
    target: RequestStatus,
    is_admin: bool,
    is_owner: bool,
) -> Result<(), ApiError> {
    let allowed = match target {
        RequestStatus::Approved | RequestStatus::Rejected | RequestStatus::Completed => is_admin,
        RequestStatus::Cancelled => is_owner || is_admin,
        // in_progress só pelo início de viagem do motorista
        RequestStatus::Pending | RequestStatus::InProgress => false,
    };
    if !allowed {
        return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
    }

    if current.is_terminal() {
        return Err(ApiError::Conflict(format!("Request is already {}", current.as_str())));
    }

    match target {
        RequestStatus::Approved | RequestStatus::Rejected if current != RequestStatus::Pending => Err(
            ApiError::Conflict("Only pending requests can be approved or rejected".to_string()),
        ),
        RequestStatus::Completed if !matches!(current, RequestStatus::Approved | RequestStatus::InProgress) => Err(
            ApiError::Conflict("Only approved requests can be completed".to_string()),
        ),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    #[test]
    fn test_admin_approves_pending() {
        assert!(check_transition(Pending, Approved, true, false).is_ok());
        assert!(check_transition(Pending, Rejected, true, false).is_ok());
    }

    #[test]
    fn test_non_admin_cannot_approve() {
        let err = check_transition(Pending, Approved, false, true).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn test_only_pending_can_be_approved() {
        let err = check_transition(Approved, Approved, true, false).unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
        let err = check_transition(Approved, Rejected, true, false).unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [Rejected, Cancelled, Completed] {
            let err = check_transition(terminal, Cancelled, true, true).unwrap_err();
            assert_eq!(err.code(), "CONFLICT");
        }
    }

    #[test]
    fn test_owner_cancels_pending_or_approved() {
        assert!(check_transition(Pending, Cancelled, false, true).is_ok());
        assert!(check_transition(Approved, Cancelled, false, true).is_ok());
        let err = check_transition(Pending, Cancelled, false, false).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn test_complete_requires_approved() {
        assert!(check_transition(Approved, Completed, true, false).is_ok());
        assert_eq!(check_transition(Pending, Completed, true, false).unwrap_err().code(), "CONFLICT");
    }

    #[test]
    fn test_pending_target_is_forbidden() {
        assert_eq!(check_transition(Approved, Pending, true, true).unwrap_err().code(), "FORBIDDEN");
    }

    #[test]
    fn test_in_progress_trip() {
        // só o motorista inicia a viagem; o PATCH nunca leva a in_progress
        assert_eq!(check_transition(Approved, InProgress, true, true).unwrap_err().code(), "FORBIDDEN");
        assert!(check_transition(InProgress, Completed, true, false).is_ok());
        assert!(check_transition(InProgress, Cancelled, true, false).is_ok());
        assert_eq!(check_transition(InProgress, Approved, true, false).unwrap_err().code(), "CONFLICT");
        assert_eq!(RequestStatus::parse("in_progress"), Some(InProgress));
        assert!(!InProgress.is_terminal());
    }

    #[test]
    fn test_status_parse_and_str() {
        assert_eq!(RequestStatus::parse("cancelled"), Some(Cancelled));
        assert_eq!(RequestStatus::parse("done"), None);
        assert_eq!(Completed.as_str(), "completed");
    }
}
