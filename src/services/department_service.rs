use crate::api::response::Pagination;
use crate::database::{MongoDB, DEPARTMENTS, USERS};
use crate::models::{CreateDepartmentRequest, Department, DepartmentType, UpdateDepartmentRequest};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::{now_ms, Validator};
use mongodb::bson::{doc, to_bson, Document};

#[derive(Debug, Default)]
pub struct DepartmentFilter {
    pub company_id: Option<String>,
    pub department_type: Option<DepartmentType>,
    pub is_active: Option<bool>,
}

impl DepartmentFilter {
    pub fn to_document(&self) -> ApiResult<Document> {
        let mut filter = Document::new();
        crud::insert_if_present(&mut filter, "companyId", self.company_id.as_deref());
        if let Some(t) = self.department_type {
            filter.insert("type", to_bson(&t)?);
        }
        if let Some(active) = self.is_active {
            filter.insert("isActive", active);
        }
        Ok(filter)
    }
}

pub async fn list_departments(
    db: &MongoDB,
    filter: &DepartmentFilter,
    pagination: &Pagination,
) -> ApiResult<(Vec<Department>, u64)> {
    crud::find_page(
        &db.collection::<Department>(DEPARTMENTS),
        filter.to_document()?,
        doc! { "level": 1, "departmentName": 1 },
        pagination,
    )
    .await
}

pub async fn get_department(db: &MongoDB, id: &str) -> ApiResult<Department> {
    let oid = crud::parse_object_id(id, "department")?;
    crud::find_by_id(&db.collection::<Department>(DEPARTMENTS), oid, "Department not found").await
}

pub async fn create_department(db: &MongoDB, req: CreateDepartmentRequest, created_by: &str) -> ApiResult<Department> {
    Validator::new()
        .require_str("departmentId", &req.department_id)
        .require_str("departmentName", &req.department_name)
        .require_str("companyId", &req.company_id)
        .finish()?;

    let department_id = req.department_id.unwrap_or_default().trim().to_string();
    let departments = db.collection::<Department>(DEPARTMENTS);

    if departments.find_one(doc! { "departmentId": &department_id }).await?.is_some() {
        return Err(ApiError::validation("Department with this ID already exists"));
    }

    let now = now_ms();
    let mut department = Department {
        id: None,
        code: req.code.filter(|c| !c.is_empty()).unwrap_or_else(|| department_id.clone()),
        department_id,
        department_name: req.department_name.unwrap_or_default(),
        department_type: req.department_type.unwrap_or_default(),
        parent_department_id: req.parent_department_id.filter(|p| !p.is_empty()),
        company_id: req.company_id.unwrap_or_default(),
        level: req.level.unwrap_or(1),
        sso_org_unit_id: req.sso_org_unit_id,
        is_active: req.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
        created_by: Some(created_by.to_string()),
        updated_by: None,
    };

    let result = departments.insert_one(&department).await?;
    department.id = result.inserted_id.as_object_id();
    log::info!("✅ Department created: {} ({})", department.department_id, department.company_id);
    Ok(department)
}

pub async fn update_department(
    db: &MongoDB,
    id: &str,
    req: UpdateDepartmentRequest,
    updated_by: &str,
) -> ApiResult<Department> {
    let oid = crud::parse_object_id(id, "department")?;
    let departments = db.collection::<Department>(DEPARTMENTS);
    let existing = crud::find_by_id(&departments, oid, "Department not found").await?;

    if let Some(new_id) = req.department_id.as_deref().filter(|n| *n != existing.department_id) {
        if departments.find_one(doc! { "departmentId": new_id }).await?.is_some() {
            return Err(ApiError::validation("Department with this ID already exists"));
        }
    }

    let set = crud::set_document(&req, Some(updated_by), now_ms())?;
    departments.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    crud::find_by_id(&departments, oid, "Department not found").await
}

/// Recusado com sub-departamentos ou usuários vinculados
pub async fn delete_department(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "department")?;
    let departments = db.collection::<Department>(DEPARTMENTS);
    let existing = crud::find_by_id(&departments, oid, "Department not found").await?;

    let children = departments
        .count_documents(doc! { "parentDepartmentId": &existing.department_id })
        .await?;
    if children > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete department. It has {} child department(s).",
            children
        )));
    }

    let users = db
        .collection::<Document>(USERS)
        .count_documents(doc! { "departmentId": &existing.department_id })
        .await?;
    if users > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete department. {} user(s) are associated with it.",
            users
        )));
    }

    departments.delete_one(doc! { "_id": oid }).await?;
    log::info!("🗑️ Department deleted: {}", existing.department_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_document() {
        let filter = DepartmentFilter {
            company_id: Some("IAS".into()),
            department_type: Some(DepartmentType::Division),
            is_active: None,
        };
        assert_eq!(filter.to_document().unwrap(), doc! { "companyId": "IAS", "type": "division" });
    }

    #[test]
    fn test_update_serializes_type_field() {
        let req = UpdateDepartmentRequest { department_type: Some(DepartmentType::Section), ..Default::default() };
        let set = crud::set_document(&req, Some("E001"), 1).unwrap();
        assert_eq!(set.get_str("type").unwrap(), "section");
        assert!(set.get("departmentName").is_none());
    }
}
