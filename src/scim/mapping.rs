use super::types::{ScimGroup, ScimUser};
use crate::auth::user_sync::username_from_email;
use mongodb::bson::{doc, Bson, Document};

/// Campos locais derivados de um usuário SCIM
#[derive(Debug, Clone, PartialEq)]
pub struct MappedUser {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub company_id: String,
    pub department_id: Option<String>,
    pub position_id: Option<String>,
    pub manager_id: Option<String>,
    pub sso_user_id: String,
    pub is_active: bool,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

fn opt(value: &Option<String>) -> Bson {
    match value {
        Some(v) => Bson::String(v.clone()),
        None => Bson::Null,
    }
}

/// `"Budi Santoso Putra"` -> (`Budi`, `Santoso Putra`)
pub fn split_display_name(display: &str) -> (Option<String>, Option<String>) {
    let mut parts = display.split_whitespace();
    let first = parts.next().map(String::from);
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, if rest.is_empty() { None } else { Some(rest) })
}

pub fn map_user(user: &ScimUser, default_company_id: &str) -> MappedUser {
    let primary_email = user
        .emails
        .iter()
        .find(|e| e.primary == Some(true))
        .or_else(|| user.emails.first())
        .map(|e| e.value.clone())
        .filter(|v| !v.is_empty());
    let email = primary_email.unwrap_or_else(|| user.user_name.clone()).to_lowercase();
    let username = username_from_email(&user.user_name);

    let (display_first, display_rest) = user.display_name.as_deref().map(split_display_name).unwrap_or_default();
    let name = user.name.as_ref();
    let enterprise = user.enterprise.as_ref();

    MappedUser {
        user_id: non_empty(enterprise.and_then(|e| e.employee_number.as_ref())).unwrap_or_else(|| username.clone()),
        email,
        username,
        first_name: non_empty(name.and_then(|n| n.given_name.as_ref()))
            .or(display_first)
            .unwrap_or_else(|| "User".to_string()),
        last_name: non_empty(name.and_then(|n| n.family_name.as_ref())).or(display_rest),
        phone: non_empty(user.phone_numbers.first().map(|p| &p.value)),
        company_id: non_empty(enterprise.and_then(|e| e.organization.as_ref()))
            .unwrap_or_else(|| default_company_id.to_string()),
        department_id: non_empty(enterprise.and_then(|e| e.department.as_ref())),
        position_id: non_empty(user.position.as_ref().map(|p| &p.id)),
        manager_id: non_empty(enterprise.and_then(|e| e.manager.as_ref()).map(|m| &m.value)),
        sso_user_id: user.id.clone(),
        is_active: user.active,
    }
}

impl MappedUser {
    /// `$set` aplicado a cada sync; não toca em roles nem em `createdAt`
    pub fn to_set(&self, now: i64) -> Document {
        doc! {
            "userId": &self.user_id,
            "email": &self.email,
            "username": &self.username,
            "firstName": &self.first_name,
            "lastName": opt(&self.last_name),
            "phone": opt(&self.phone),
            "companyId": &self.company_id,
            "departmentId": opt(&self.department_id),
            "positionId": opt(&self.position_id),
            "managerId": opt(&self.manager_id),
            "ssoUserId": &self.sso_user_id,
            "isActive": self.is_active,
            "syncedAt": now,
            "updatedAt": now,
        }
    }
}

/// Campos de `organizational_units` para um grupo SCIM
pub fn group_set(group: &ScimGroup, now: i64) -> Document {
    let ext = group.org_unit.clone().unwrap_or_default();
    let member_ids: Vec<String> = group.members.iter().map(|m| m.value.clone()).collect();
    doc! {
        "scimId": &group.id,
        "name": &group.display_name,
        "unitType": ext.unit_type.filter(|t| !t.is_empty()).unwrap_or_else(|| "department".to_string()),
        "level": ext.level.unwrap_or(1),
        "parentUnitId": opt(&ext.parent_unit_id),
        "managerId": opt(&ext.manager_id),
        "externalId": opt(&group.external_id),
        "memberIds": member_ids,
        "isActive": true,
        "syncedAt": now,
        "updatedAt": now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scim::types::{EnterpriseExtension, ManagerRef, MultiValue, OrgUnitExtension, ScimName};

    fn scim_user() -> ScimUser {
        ScimUser {
            id: "sso-9".into(),
            user_name: "siti.rahma@ias.co.id".into(),
            display_name: Some("Siti Rahma Dewi".into()),
            active: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_split_display_name() {
        assert_eq!(split_display_name("Budi"), (Some("Budi".into()), None));
        assert_eq!(split_display_name("Siti  Rahma Dewi"), (Some("Siti".into()), Some("Rahma Dewi".into())));
        assert_eq!(split_display_name(""), (None, None));
    }

    #[test]
    fn test_minimal_user_falls_back_to_username() {
        let mapped = map_user(&scim_user(), "IAS");
        assert_eq!(mapped.user_id, "siti.rahma");
        assert_eq!(mapped.email, "siti.rahma@ias.co.id");
        assert_eq!(mapped.first_name, "Siti");
        assert_eq!(mapped.last_name.as_deref(), Some("Rahma Dewi"));
        assert_eq!(mapped.company_id, "IAS");
        assert!(mapped.manager_id.is_none());
    }

    #[test]
    fn test_enterprise_fields_win() {
        let mut user = scim_user();
        user.name = Some(ScimName { given_name: Some("Siti".into()), family_name: Some("R.".into()), formatted: None });
        user.emails = vec![
            MultiValue { value: "old@ias.co.id".into(), ..Default::default() },
            MultiValue { value: "Siti@IAS.co.id".into(), primary: Some(true), kind: None },
        ];
        user.enterprise = Some(EnterpriseExtension {
            employee_number: Some("E042".into()),
            organization: Some("IAS-BALI".into()),
            department: Some("OPS".into()),
            manager: Some(ManagerRef { value: "E001".into(), display_name: None }),
            division: None,
        });

        let mapped = map_user(&user, "IAS");
        assert_eq!(mapped.user_id, "E042");
        assert_eq!(mapped.email, "siti@ias.co.id");
        assert_eq!(mapped.last_name.as_deref(), Some("R."));
        assert_eq!(mapped.company_id, "IAS-BALI");
        assert_eq!(mapped.department_id.as_deref(), Some("OPS"));
        assert_eq!(mapped.manager_id.as_deref(), Some("E001"));
    }

    #[test]
    fn test_nameless_user_is_called_user() {
        let mut user = scim_user();
        user.display_name = None;
        assert_eq!(map_user(&user, "IAS").first_name, "User");
    }

    #[test]
    fn test_user_set_nulls_missing_fields() {
        let set = map_user(&scim_user(), "IAS").to_set(7);
        assert_eq!(set.get("phone"), Some(&Bson::Null));
        assert_eq!(set.get_i64("syncedAt").unwrap(), 7);
        assert!(set.get("roleIds").is_none());
        assert!(set.get("createdAt").is_none());
    }

    #[test]
    fn test_group_set_defaults() {
        let group = ScimGroup {
            id: "g-1".into(),
            display_name: "Finance".into(),
            members: vec![crate::scim::types::GroupMember { value: "sso-9".into(), display: None }],
            ..Default::default()
        };
        let set = group_set(&group, 3);
        assert_eq!(set.get_str("unitType").unwrap(), "department");
        assert_eq!(set.get_i32("level").unwrap(), 1);
        assert_eq!(set.get_array("memberIds").unwrap().len(), 1);

        let mut nested = group.clone();
        nested.org_unit = Some(OrgUnitExtension { unit_type: Some("division".into()), level: Some(2), ..Default::default() });
        assert_eq!(group_set(&nested, 3).get_str("unitType").unwrap(), "division");
    }
}
