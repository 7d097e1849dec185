use crate::api::response::{created, document_json, documents_json, ok};
use crate::database::MongoDB;
use crate::middleware::AuthUser;
use crate::models::{CreateWorkflowRequest, UpdateWorkflowRequest};
use crate::services::approval_workflow_service;
use crate::utils::error::ApiError;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WorkflowQuery {
    pub module: Option<String>,
}

#[get("")]
pub async fn list_workflows(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    query: web::Query<WorkflowQuery>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let workflows = approval_workflow_service::list_workflows(&db, query.module.as_deref()).await?;
    Ok(ok(documents_json(&workflows)))
}

#[post("")]
pub async fn create_workflow(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    body: web::Json<CreateWorkflowRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let workflow = approval_workflow_service::create_workflow(&db, body.into_inner(), &user.user_id).await?;
    Ok(created(document_json(&workflow)))
}

#[put("/{id}")]
pub async fn update_workflow(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<UpdateWorkflowRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let workflow = approval_workflow_service::update_workflow(&db, &path, body.into_inner(), &user.user_id).await?;
    Ok(ok(document_json(&workflow)))
}

#[delete("/{id}")]
pub async fn delete_workflow(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    approval_workflow_service::delete_workflow(&db, &path).await?;
    Ok(ok(serde_json::json!({ "message": "Workflow deleted" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_workflows)
        .service(create_workflow)
        .service(update_workflow)
        .service(delete_workflow);
}
