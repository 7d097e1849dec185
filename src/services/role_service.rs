use crate::api::response::Pagination;
use crate::database::{MongoDB, ROLES, USERS};
use crate::models::{CreateRoleRequest, Role, UpdateRoleRequest};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::{escape_regex, now_ms, Validator};
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

/// `_id` (hex) do role com esse `roleId`, usado ao atribuir roles padrão
pub async fn find_role_object_id(db: &MongoDB, role_id: &str) -> ApiResult<Option<String>> {
    let role = db.collection::<Role>(ROLES).find_one(doc! { "roleId": role_id }).await?;
    Ok(role.and_then(|r| r.id).map(|id| id.to_hex()))
}

/// Converte `roleIds` do usuário (hex de `_id`) nos `roleId` legíveis.
/// Valores que não são ObjectId já são tratados como `roleId`.
pub async fn resolve_role_names(db: &MongoDB, role_ids: &[String]) -> ApiResult<Vec<String>> {
    let mut object_ids = Vec::new();
    let mut names = Vec::new();
    for id in role_ids {
        match ObjectId::parse_str(id) {
            Ok(oid) => object_ids.push(oid),
            Err(_) => names.push(id.clone()),
        }
    }

    if !object_ids.is_empty() {
        let roles = crud::find_all(
            &db.collection::<Role>(ROLES),
            doc! { "_id": { "$in": object_ids }, "isActive": { "$ne": false } },
            doc! { "roleId": 1 },
        )
        .await?;
        names.extend(roles.into_iter().map(|r| r.role_id));
    }

    names.sort();
    names.dedup();
    Ok(names)
}

/// Filtro da listagem: busca textual + visibilidade por empresa
pub fn build_list_filter(search: Option<&str>, company_id: Option<&str>, is_global_admin: bool) -> Document {
    let mut clauses: Vec<Document> = Vec::new();

    if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
        let pattern = escape_regex(search.trim());
        clauses.push(doc! { "$or": [
            { "roleId": { "$regex": &pattern, "$options": "i" } },
            { "roleName": { "$regex": &pattern, "$options": "i" } },
            { "description": { "$regex": &pattern, "$options": "i" } },
        ] });
    }

    // Roles globais (companyIds vazio) + roles da empresa pedida
    if let Some(company_id) = company_id.filter(|c| !c.is_empty()) {
        if !is_global_admin {
            clauses.push(doc! { "$or": [
                { "companyIds": { "$size": 0 } },
                { "companyIds": { "$exists": false } },
                { "companyIds": company_id },
            ] });
        }
    }

    match clauses.len() {
        0 => Document::new(),
        1 => clauses.remove(0),
        _ => doc! { "$and": clauses.into_iter().map(Bson::Document).collect::<Vec<_>>() },
    }
}

pub async fn list_roles(
    db: &MongoDB,
    search: Option<&str>,
    company_id: Option<&str>,
    is_global_admin: bool,
    pagination: &Pagination,
) -> ApiResult<(Vec<Role>, u64)> {
    let filter = build_list_filter(search, company_id, is_global_admin);
    crud::find_page(&db.collection::<Role>(ROLES), filter, doc! { "createdAt": -1 }, pagination).await
}

pub async fn get_role(db: &MongoDB, id: &str) -> ApiResult<Role> {
    let oid = crud::parse_object_id(id, "role")?;
    crud::find_by_id(&db.collection::<Role>(ROLES), oid, "Role not found").await
}

pub async fn create_role(db: &MongoDB, req: CreateRoleRequest) -> ApiResult<Role> {
    Validator::new()
        .require_str("roleId", &req.role_id)
        .require_str("roleName", &req.role_name)
        .finish()?;

    let role_id = req.role_id.unwrap_or_default().trim().to_string();
    let roles = db.collection::<Role>(ROLES);

    if roles.find_one(doc! { "roleId": &role_id }).await?.is_some() {
        return Err(ApiError::Duplicate("Role ID already exists".to_string()));
    }

    let now = now_ms();
    let mut role = Role {
        id: None,
        role_id,
        role_name: req.role_name.unwrap_or_default(),
        description: req.description,
        permissions: req.permissions.unwrap_or_default(),
        company_ids: req.company_ids.unwrap_or_default(),
        is_active: req.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    let result = roles.insert_one(&role).await?;
    role.id = result.inserted_id.as_object_id();
    log::info!("✅ Role created: {}", role.role_id);
    Ok(role)
}

pub async fn update_role(db: &MongoDB, id: &str, req: UpdateRoleRequest) -> ApiResult<Role> {
    let oid = crud::parse_object_id(id, "role")?;
    let roles = db.collection::<Role>(ROLES);

    let set = crud::set_document(&req, None, now_ms())?;
    let result = roles.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    if result.matched_count == 0 {
        return Err(ApiError::NotFound("Role not found".to_string()));
    }

    crud::find_by_id(&roles, oid, "Role not found").await
}

/// Recusado enquanto algum usuário tiver o role
pub async fn delete_role(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "role")?;

    let in_use = db
        .collection::<Document>(USERS)
        .count_documents(doc! { "roleIds": oid.to_hex() })
        .await?;
    if in_use > 0 {
        return Err(ApiError::validation("Cannot delete role that is assigned to users"));
    }

    let result = db.collection::<Role>(ROLES).delete_one(doc! { "_id": oid }).await?;
    if result.deleted_count == 0 {
        return Err(ApiError::NotFound("Role not found".to_string()));
    }
    log::info!("🗑️ Role deleted: {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter() {
        assert_eq!(build_list_filter(None, None, false), Document::new());
        assert_eq!(build_list_filter(Some("  "), Some(""), false), Document::new());
    }

    #[test]
    fn test_search_is_escaped_and_case_insensitive() {
        let filter = build_list_filter(Some("admin.*"), None, false);
        let or = filter.get_array("$or").unwrap();
        let first = or[0].as_document().unwrap().get_document("roleId").unwrap();
        assert_eq!(first.get_str("$regex").unwrap(), "admin\\.\\*");
        assert_eq!(first.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_company_scope_only_for_non_global_admin() {
        let scoped = build_list_filter(None, Some("IAS"), false);
        assert_eq!(scoped.get_array("$or").unwrap().len(), 3);

        let global = build_list_filter(None, Some("IAS"), true);
        assert_eq!(global, Document::new());
    }

    #[test]
    fn test_search_and_company_are_combined_with_and() {
        let filter = build_list_filter(Some("driver"), Some("IAS"), false);
        assert_eq!(filter.get_array("$and").unwrap().len(), 2);
    }
}
