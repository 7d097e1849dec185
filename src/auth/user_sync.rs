use super::oauth::UserInfo;
use crate::config::AppConfig;
use crate::database::{MongoDB, USERS};
use crate::models::User;
use crate::services::role_service;
use crate::utils::error::ApiError;
use crate::utils::validation::now_ms;
use mongodb::bson::{doc, to_bson};

pub const SUPER_ADMIN_ROLE: &str = "super_admin";
pub const EMPLOYEE_ROLE: &str = "employee";

/// Parte local do email (`budi@ias.co.id` -> `budi`)
pub fn username_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Role atribuído a usuários novos
pub fn default_role_for(email: &str, super_admin_email: &str) -> &'static str {
    if email.eq_ignore_ascii_case(super_admin_email) {
        SUPER_ADMIN_ROLE
    } else {
        EMPLOYEE_ROLE
    }
}

/// Sobrescreve os campos do diretório que o SSO forneceu; o que veio vazio mantém o valor local
pub fn apply_sso_profile(user: &mut User, info: &UserInfo, now: i64) {
    fn keep_or(local: &mut Option<String>, remote: &Option<String>) {
        if let Some(v) = remote.as_ref().filter(|v| !v.is_empty()) {
            *local = Some(v.clone());
        }
    }

    user.email = info.email.clone();
    user.username = username_from_email(&info.email);
    keep_or(&mut user.first_name, &info.first_name);
    keep_or(&mut user.last_name, &info.last_name);
    keep_or(&mut user.phone, &info.phone);
    keep_or(&mut user.company_id, &info.organization_id);
    keep_or(&mut user.department_id, &info.org_unit_id);
    keep_or(&mut user.position_id, &info.position_id);
    keep_or(&mut user.manager_id, &info.manager_id);
    if user.sso_user_id.is_none() {
        user.sso_user_id = Some(info.sub.clone());
    }
    user.last_login_at = Some(now);
    user.updated_at = now;
}

pub fn new_user_from_sso(info: &UserInfo, role_ids: Vec<String>, default_company_id: &str, now: i64) -> User {
    let username = username_from_email(&info.email);
    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

    User {
        id: None,
        user_id: non_empty(&info.employee_id).unwrap_or_else(|| username.clone()),
        email: info.email.clone(),
        username,
        first_name: non_empty(&info.first_name)
            .or_else(|| non_empty(&info.name))
            .or_else(|| Some("User".to_string())),
        last_name: non_empty(&info.last_name),
        phone: non_empty(&info.phone),
        company_id: Some(non_empty(&info.organization_id).unwrap_or_else(|| default_company_id.to_string())),
        department_id: non_empty(&info.org_unit_id),
        position_id: non_empty(&info.position_id),
        manager_id: non_empty(&info.manager_id),
        role_ids,
        company_access: Vec::new(),
        sso_user_id: Some(info.sub.clone()),
        is_active: true,
        last_login_at: Some(now),
        synced_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Sincroniza o usuário no login SSO e devolve o usuário + nomes dos roles
pub async fn sync_user_from_sso(db: &MongoDB, config: &AppConfig, info: &UserInfo) -> Result<(User, Vec<String>), ApiError> {
    let users = db.collection::<User>(USERS);
    let now = now_ms();

    let existing = users
        .find_one(doc! { "$or": [ { "ssoUserId": &info.sub }, { "email": &info.email } ] })
        .await?;

    let user = match existing {
        Some(mut user) => {
            apply_sso_profile(&mut user, info, now);
            let filter = match user.id {
                Some(id) => doc! { "_id": id },
                None => doc! { "userId": &user.user_id },
            };
            users
                .update_one(
                    filter,
                    doc! { "$set": {
                        "email": &user.email,
                        "username": &user.username,
                        "firstName": to_bson(&user.first_name)?,
                        "lastName": to_bson(&user.last_name)?,
                        "phone": to_bson(&user.phone)?,
                        "companyId": to_bson(&user.company_id)?,
                        "departmentId": to_bson(&user.department_id)?,
                        "positionId": to_bson(&user.position_id)?,
                        "managerId": to_bson(&user.manager_id)?,
                        "ssoUserId": to_bson(&user.sso_user_id)?,
                        "lastLoginAt": now,
                        "updatedAt": now,
                    } },
                )
                .await?;
            log::info!("✅ SSO user updated: {}", user.user_id);
            user
        }
        None => {
            let role_name = default_role_for(&info.email, &config.super_admin_email);
            let role_ids = role_service::find_role_object_id(db, role_name)
                .await?
                .map(|id| vec![id])
                .unwrap_or_default();

            let mut user = new_user_from_sso(info, role_ids, &config.default_company_id, now);
            let result = users.insert_one(&user).await?;
            user.id = result.inserted_id.as_object_id();
            log::info!("✅ SSO user created: {} ({})", user.user_id, role_name);
            user
        }
    };

    let roles = role_service::resolve_role_names(db, &user.role_ids).await?;
    Ok((user, roles))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> UserInfo {
        UserInfo {
            sub: "sso-42".into(),
            email: "siti.rahma@ias.co.id".into(),
            name: Some("Siti Rahma".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_username_from_email() {
        assert_eq!(username_from_email("siti.rahma@ias.co.id"), "siti.rahma");
        assert_eq!(username_from_email("noatsign"), "noatsign");
    }

    #[test]
    fn test_default_role() {
        assert_eq!(default_role_for("admin@ias.co.id", "admin@ias.co.id"), SUPER_ADMIN_ROLE);
        assert_eq!(default_role_for("ADMIN@ias.co.id", "admin@ias.co.id"), SUPER_ADMIN_ROLE);
        assert_eq!(default_role_for("x@ias.co.id", "admin@ias.co.id"), EMPLOYEE_ROLE);
    }

    #[test]
    fn test_new_user_defaults() {
        let user = new_user_from_sso(&info(), vec!["r1".into()], "IAS", 5);
        assert_eq!(user.user_id, "siti.rahma");
        assert_eq!(user.company_id.as_deref(), Some("IAS"));
        assert_eq!(user.first_name.as_deref(), Some("Siti Rahma"));
        assert_eq!(user.sso_user_id.as_deref(), Some("sso-42"));
        assert_eq!(user.role_ids, vec!["r1".to_string()]);
        assert!(user.is_active);
    }

    #[test]
    fn test_new_user_prefers_employee_id_and_organization() {
        let mut i = info();
        i.employee_id = Some("E777".into());
        i.organization_id = Some("IAS-BALI".into());
        let user = new_user_from_sso(&i, vec![], "IAS", 5);
        assert_eq!(user.user_id, "E777");
        assert_eq!(user.company_id.as_deref(), Some("IAS-BALI"));
    }

    #[test]
    fn test_existing_user_keeps_local_values_when_sso_omits_them() {
        let mut user = new_user_from_sso(&info(), vec![], "IAS", 1);
        user.phone = Some("0811".into());
        user.department_id = Some("FIN".into());

        let mut i = info();
        i.email = "siti@ias.co.id".into();
        // SSO manda string vazia para campos sem valor
        i.org_unit_id = Some(String::new());
        i.position_id = Some("MGR".into());
        apply_sso_profile(&mut user, &i, 9);

        assert_eq!(user.email, "siti@ias.co.id");
        assert_eq!(user.username, "siti");
        assert_eq!(user.phone.as_deref(), Some("0811"));
        assert_eq!(user.department_id.as_deref(), Some("FIN"));
        assert_eq!(user.position_id.as_deref(), Some("MGR"));
        assert_eq!(user.last_login_at, Some(9));
    }
}
