use crate::auth::user_sync::EMPLOYEE_ROLE;
use crate::database::{MongoDB, ROLES};
use crate::middleware::auth::{ADMIN, DRIVER, GLOBAL_ADMIN, REGIONAL_ADMIN, SUPER_ADMIN};
use crate::models::Role;
use mongodb::bson::doc;

/// (roleId, roleName, descrição, permissões)
const DEFAULT_ROLES: &[(&str, &str, &str, &[&str])] = &[
    (SUPER_ADMIN, "Super Admin", "Full access to every company and setting", &["*"]),
    (GLOBAL_ADMIN, "Global Admin", "Manages all companies", &["org:*", "requests:*", "vouchers:*"]),
    (REGIONAL_ADMIN, "Regional Admin", "Manages the companies they have access to", &["org:read", "requests:*", "vouchers:*"]),
    (ADMIN, "Admin", "Approves requests within their company", &["org:read", "requests:*"]),
    (EMPLOYEE_ROLE, "Employee", "Creates and follows their own requests", &["requests:create", "requests:read"]),
    (DRIVER, "Driver", "Sees assigned transport requests", &["transport:read"]),
];

fn build_default_roles(now: i64) -> Vec<Role> {
    DEFAULT_ROLES
        .iter()
        .map(|(role_id, role_name, description, permissions)| Role {
            id: None,
            role_id: role_id.to_string(),
            role_name: role_name.to_string(),
            description: Some(description.to_string()),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            company_ids: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

/// Insere os papéis padrão ausentes (match por `roleId`)
pub async fn seed_default_roles(db: &MongoDB) {
    let collection = db.collection::<Role>(ROLES);
    let now = chrono::Utc::now().timestamp_millis();
    let mut inserted = 0;

    for role in build_default_roles(now) {
        match collection.count_documents(doc! { "roleId": &role.role_id }).await {
            Ok(0) => {}
            Ok(_) => continue,
            Err(e) => {
                log::error!("   ❌ Failed to check role {}: {}", role.role_id, e);
                continue;
            }
        }

        match collection.insert_one(&role).await {
            Ok(_) => inserted += 1,
            Err(e) => log::error!("   ❌ Failed to seed role {}: {}", role.role_id, e),
        }
    }

    if inserted == 0 {
        log::info!("📋 Roles: {} defaults already in DB, skipping seed", DEFAULT_ROLES.len());
    } else {
        log::info!("📋 Roles: seeded {} default role(s)", inserted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles_cover_middleware_roles() {
        let roles = build_default_roles(0);
        let ids: Vec<&str> = roles.iter().map(|r| r.role_id.as_str()).collect();
        assert_eq!(ids, vec!["super_admin", "global_admin", "regional_admin", "admin", "employee", "driver"]);
        assert!(roles.iter().all(|r| r.is_active && r.company_ids.is_empty()));
    }
}
