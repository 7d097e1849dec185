use crate::database::{MongoDB, APPROVAL_WORKFLOWS};
use crate::models::{ApprovalWorkflow, CreateWorkflowRequest, UpdateWorkflowRequest, WorkflowModule};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::{now_ms, Validator};
use mongodb::bson::{doc, to_bson, Document};

pub fn module_filter(module: Option<&str>) -> ApiResult<Document> {
    let Some(raw) = module.filter(|m| !m.is_empty()) else {
        return Ok(Document::new());
    };
    let module = WorkflowModule::parse(raw).ok_or_else(|| ApiError::validation(format!("Invalid module: {}", raw)))?;
    Ok(doc! { "module": to_bson(&module)? })
}

pub async fn list_workflows(db: &MongoDB, module: Option<&str>) -> ApiResult<Vec<ApprovalWorkflow>> {
    crud::find_all(
        &db.collection::<ApprovalWorkflow>(APPROVAL_WORKFLOWS),
        module_filter(module)?,
        doc! { "createdAt": -1 },
    )
    .await
}

pub fn build_workflow(req: CreateWorkflowRequest, created_by: &str, now: i64) -> ApiResult<ApprovalWorkflow> {
    Validator::new()
        .require_str("workflowName", &req.workflow_name)
        .require("module", &req.module)
        .check(req.required_approvers.map_or(true, |n| n >= 1), "requiredApprovers", "Must be at least 1")
        .check(req.escalation_hours.map_or(true, |h| h > 0), "escalationHours", "Must be greater than 0")
        .finish()?;

    let (Some(workflow_name), Some(module)) = (req.workflow_name, req.module) else {
        return Err(ApiError::validation("workflowName and module are required"));
    };

    Ok(ApprovalWorkflow {
        id: None,
        workflow_name: workflow_name.trim().to_string(),
        module,
        description: req.description,
        required_approvers: req.required_approvers.unwrap_or(1),
        approver_roles: req.approver_roles.unwrap_or_default(),
        approver_users: req.approver_users.unwrap_or_default(),
        auto_approve_enabled: req.auto_approve_enabled.unwrap_or(false),
        auto_approve_conditions: req.auto_approve_conditions,
        escalation_enabled: req.escalation_enabled.unwrap_or(false),
        escalation_hours: req.escalation_hours.unwrap_or(24),
        escalation_to_roles: req.escalation_to_roles.unwrap_or_default(),
        notify_on_submit: req.notify_on_submit.unwrap_or(true),
        notify_on_approval: req.notify_on_approval.unwrap_or(true),
        notify_on_rejection: req.notify_on_rejection.unwrap_or(true),
        is_active: req.is_active.unwrap_or(true),
        priority: req.priority.unwrap_or(0),
        created_at: now,
        updated_at: now,
        created_by: Some(created_by.to_string()),
        updated_by: Some(created_by.to_string()),
    })
}

pub async fn create_workflow(db: &MongoDB, req: CreateWorkflowRequest, created_by: &str) -> ApiResult<ApprovalWorkflow> {
    let mut workflow = build_workflow(req, created_by, now_ms())?;
    let result = db.collection::<ApprovalWorkflow>(APPROVAL_WORKFLOWS).insert_one(&workflow).await?;
    workflow.id = result.inserted_id.as_object_id();
    log::info!("✅ Approval workflow created: {} ({:?})", workflow.workflow_name, workflow.module);
    Ok(workflow)
}

pub async fn update_workflow(
    db: &MongoDB,
    id: &str,
    req: UpdateWorkflowRequest,
    updated_by: &str,
) -> ApiResult<ApprovalWorkflow> {
    let oid = crud::parse_object_id(id, "workflow")?;
    if req.workflow_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::validation("workflowName cannot be empty"));
    }

    let workflows = db.collection::<ApprovalWorkflow>(APPROVAL_WORKFLOWS);
    let set = crud::set_document(&req, Some(updated_by), now_ms())?;
    let result = workflows.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    if result.matched_count == 0 {
        return Err(ApiError::NotFound("Workflow not found".to_string()));
    }
    crud::find_by_id(&workflows, oid, "Workflow not found").await
}

pub async fn delete_workflow(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "workflow")?;
    let result = db
        .collection::<ApprovalWorkflow>(APPROVAL_WORKFLOWS)
        .delete_one(doc! { "_id": oid })
        .await?;
    if result.deleted_count == 0 {
        return Err(ApiError::NotFound("Workflow not found".to_string()));
    }
    log::info!("🗑️ Approval workflow deleted: {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_filter() {
        assert!(module_filter(None).unwrap().is_empty());
        assert!(module_filter(Some("")).unwrap().is_empty());
        assert_eq!(module_filter(Some("meeting")).unwrap(), doc! { "module": "meeting" });
        assert!(module_filter(Some("canteen")).is_err());
    }

    #[test]
    fn test_build_workflow_defaults() {
        let req = CreateWorkflowRequest {
            workflow_name: Some(" Car approval ".into()),
            module: Some(WorkflowModule::Transportation),
            ..Default::default()
        };
        let wf = build_workflow(req, "ADM1", 9).unwrap();
        assert_eq!(wf.workflow_name, "Car approval");
        assert_eq!(wf.required_approvers, 1);
        assert_eq!(wf.escalation_hours, 24);
        assert!(wf.notify_on_submit && wf.notify_on_approval && wf.notify_on_rejection);
        assert_eq!(wf.priority, 0);
        assert_eq!(wf.created_by.as_deref(), Some("ADM1"));
    }

    #[test]
    fn test_build_workflow_requires_name_and_module() {
        let err = build_workflow(CreateWorkflowRequest::default(), "ADM1", 0).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let zero = CreateWorkflowRequest {
            workflow_name: Some("x".into()),
            module: Some(WorkflowModule::Facility),
            required_approvers: Some(0),
            ..Default::default()
        };
        assert!(build_workflow(zero, "ADM1", 0).is_err());
    }
}
