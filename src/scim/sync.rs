use super::client::DirectorySource;
use super::mapping::{group_set, map_user, MappedUser};
use super::types::{ScimGroup, ScimUser};
use crate::auth::user_sync::{default_role_for, EMPLOYEE_ROLE, SUPER_ADMIN_ROLE};
use crate::database::{MongoDB, ORGANIZATIONAL_UNITS, SYNC_HISTORY, USERS};
use crate::models::{EntityStats, SyncHistory, SyncStats, SyncStatus, SyncStatusResponse, User, SCIM_FULL_SYNC};
use crate::services::role_service;
use crate::utils::error::ApiResult;
use crate::utils::validation::now_ms;
use mongodb::bson::{doc, Document};

/// Resultado do upsert de um registro
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
    Deactivated,
}

impl EntityStats {
    pub fn record(&mut self, outcome: Upserted) {
        match outcome {
            Upserted::Created => self.created += 1,
            Upserted::Updated => self.updated += 1,
            Upserted::Deactivated => self.deactivated += 1,
        }
    }
}

/// Só conta desativação na virada ativo -> inativo
pub fn user_outcome(was_active: bool, is_active: bool) -> Upserted {
    if was_active && !is_active {
        Upserted::Deactivated
    } else {
        Upserted::Updated
    }
}

/// `_id` (hex) dos roles padrão, resolvidos uma vez por sync
#[derive(Debug, Clone, Default)]
pub struct DefaultRoles {
    pub super_admin: Option<String>,
    pub employee: Option<String>,
}

impl DefaultRoles {
    pub async fn load(db: &MongoDB) -> ApiResult<Self> {
        Ok(Self {
            super_admin: role_service::find_role_object_id(db, SUPER_ADMIN_ROLE).await?,
            employee: role_service::find_role_object_id(db, EMPLOYEE_ROLE).await?,
        })
    }

    pub fn for_email(&self, email: &str, super_admin_email: &str) -> Vec<String> {
        let id = if default_role_for(email, super_admin_email) == SUPER_ADMIN_ROLE {
            &self.super_admin
        } else {
            &self.employee
        };
        id.iter().cloned().collect()
    }
}

/// Parâmetros de uma sincronização
pub struct SyncOptions<'a> {
    pub triggered_by: Option<&'a str>,
    pub super_admin_email: &'a str,
    pub default_company_id: &'a str,
}

pub async fn upsert_group(db: &MongoDB, group: &ScimGroup) -> ApiResult<Upserted> {
    let now = now_ms();
    let result = db
        .collection::<Document>(ORGANIZATIONAL_UNITS)
        .update_one(
            doc! { "scimId": &group.id },
            doc! { "$set": group_set(group, now), "$setOnInsert": { "createdAt": now } },
        )
        .upsert(true)
        .await?;
    Ok(if result.upserted_id.is_some() { Upserted::Created } else { Upserted::Updated })
}

/// Último a escrever vence: campos remotos sobrescrevem os locais
pub async fn upsert_user(
    db: &MongoDB,
    mapped: &MappedUser,
    roles: &DefaultRoles,
    super_admin_email: &str,
) -> ApiResult<Upserted> {
    let now = now_ms();
    let users = db.collection::<User>(USERS);
    let existing = users
        .find_one(doc! { "$or": [ { "ssoUserId": &mapped.sso_user_id }, { "email": &mapped.email } ] })
        .await?;

    match existing {
        Some(user) => {
            let filter = match user.id {
                Some(id) => doc! { "_id": id },
                None => doc! { "userId": &user.user_id },
            };
            users.update_one(filter, doc! { "$set": mapped.to_set(now) }).await?;
            Ok(user_outcome(user.is_active, mapped.is_active))
        }
        None => {
            let mut new_user = mapped.to_set(now);
            new_user.insert("roleIds", roles.for_email(&mapped.email, super_admin_email));
            new_user.insert("companyAccess", Vec::<String>::new());
            new_user.insert("createdAt", now);
            db.collection::<Document>(USERS).insert_one(new_user).await?;
            Ok(Upserted::Created)
        }
    }
}

/// Erro de um registro vira contagem + mensagem; a sincronização segue
pub fn record_upsert(stats: &mut EntityStats, errors: &mut Vec<String>, label: &str, result: ApiResult<Upserted>) {
    match result {
        Ok(outcome) => stats.record(outcome),
        Err(e) => {
            stats.errors += 1;
            errors.push(format!("{}: {}", label, e));
        }
    }
}

async fn sync_groups(db: &MongoDB, groups: &[ScimGroup], errors: &mut Vec<String>) -> EntityStats {
    let mut stats = EntityStats::default();
    for group in groups {
        let result = upsert_group(db, group).await;
        record_upsert(&mut stats, errors, &format!("Group {}", group.display_name), result);
    }
    stats
}

async fn sync_users(
    db: &MongoDB,
    users: &[ScimUser],
    options: &SyncOptions<'_>,
    errors: &mut Vec<String>,
) -> ApiResult<EntityStats> {
    let roles = DefaultRoles::load(db).await?;
    let mut stats = EntityStats::default();
    for user in users {
        let mapped = map_user(user, options.default_company_id);
        let result = upsert_user(db, &mapped, &roles, options.super_admin_email).await;
        record_upsert(&mut stats, errors, &format!("User {}", user.user_name), result);
    }
    Ok(stats)
}

async fn run_sync(
    db: &MongoDB,
    source: &dyn DirectorySource,
    options: &SyncOptions<'_>,
    errors: &mut Vec<String>,
) -> ApiResult<SyncStats> {
    let connection = source.test_connection().await;
    if !connection.success {
        return Err(crate::utils::error::ApiError::Upstream(connection.message));
    }

    let groups = source.fetch_all_groups().await?;
    let users = source.fetch_all_users().await?;
    log::info!("🔄 SCIM sync: {} groups, {} users fetched", groups.len(), users.len());

    let groups = sync_groups(db, &groups, errors).await;
    let users = sync_users(db, &users, options, errors).await?;
    Ok(SyncStats { users, groups })
}

/// Sincronização completa; o histórico é gravado em sucesso e em falha
pub async fn perform_full_sync(
    db: &MongoDB,
    source: &dyn DirectorySource,
    options: SyncOptions<'_>,
) -> ApiResult<SyncHistory> {
    let started_at = now_ms();
    let mut errors = Vec::new();

    let (status, stats) = match run_sync(db, source, &options, &mut errors).await {
        Ok(stats) => {
            log::info!(
                "✅ SCIM sync completed: users +{} ~{} -{}, groups +{} ~{}, {} error(s)",
                stats.users.created,
                stats.users.updated,
                stats.users.deactivated,
                stats.groups.created,
                stats.groups.updated,
                errors.len()
            );
            (SyncStatus::Success, stats)
        }
        Err(e) => {
            log::error!("❌ SCIM sync failed: {}", e);
            errors.insert(0, e.to_string());
            (SyncStatus::Failed, SyncStats::default())
        }
    };

    let mut history = SyncHistory {
        id: None,
        sync_type: SCIM_FULL_SYNC.to_string(),
        started_at,
        completed_at: now_ms(),
        status,
        stats,
        errors,
        triggered_by: options.triggered_by.map(String::from),
    };
    let result = db.collection::<SyncHistory>(SYNC_HISTORY).insert_one(&history).await?;
    history.id = result.inserted_id.as_object_id();
    Ok(history)
}

pub async fn last_sync_status(db: &MongoDB) -> ApiResult<SyncStatusResponse> {
    let last = db
        .collection::<SyncHistory>(SYNC_HISTORY)
        .find_one(doc! { "type": SCIM_FULL_SYNC })
        .sort(doc! { "completedAt": -1 })
        .await?;
    Ok(SyncStatusResponse::from_history(last.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scim::types::{ConnectionTest, EnterpriseExtension, MultiValue};
    use crate::utils::error::ApiError;
    use async_trait::async_trait;
    use mongodb::bson::oid::ObjectId;

    /// Diretório em memória no lugar do cliente SCIM
    struct FakeDirectory {
        reachable: bool,
        users: Vec<ScimUser>,
        groups: Vec<ScimGroup>,
    }

    #[async_trait]
    impl DirectorySource for FakeDirectory {
        async fn fetch_all_users(&self) -> ApiResult<Vec<ScimUser>> {
            Ok(self.users.clone())
        }

        async fn fetch_all_groups(&self) -> ApiResult<Vec<ScimGroup>> {
            Ok(self.groups.clone())
        }

        async fn test_connection(&self) -> ConnectionTest {
            ConnectionTest {
                success: self.reachable,
                message: if self.reachable { "ok".into() } else { "SCIM endpoint unreachable".into() },
                details: None,
            }
        }
    }

    fn scim_user(id: &str, email: &str, employee_number: &str) -> ScimUser {
        ScimUser {
            id: id.into(),
            external_id: None,
            user_name: email.into(),
            name: None,
            display_name: None,
            active: true,
            emails: vec![MultiValue { value: email.into(), primary: Some(true), kind: None }],
            phone_numbers: vec![],
            enterprise: Some(EnterpriseExtension {
                employee_number: Some(employee_number.into()),
                ..Default::default()
            }),
            position: None,
        }
    }

    fn options() -> SyncOptions<'static> {
        SyncOptions { triggered_by: Some("ADM1"), super_admin_email: "root@ias.co.id", default_company_id: "IAS" }
    }

    #[test]
    fn test_record_upsert_collects_errors_and_continues() {
        let mut stats = EntityStats::default();
        let mut errors = Vec::new();
        record_upsert(&mut stats, &mut errors, "User a", Ok(Upserted::Created));
        record_upsert(&mut stats, &mut errors, "User b", Err(ApiError::Conflict("duplicate userId".into())));
        record_upsert(&mut stats, &mut errors, "User c", Ok(Upserted::Updated));
        assert_eq!((stats.created, stats.updated, stats.errors), (1, 1, 1));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("User b: "));
    }

    #[tokio::test]
    #[ignore]
    async fn test_unreachable_directory_writes_failed_history() {
        let db = MongoDB::new("mongodb://localhost:27017", "ofm_test").await.unwrap();
        let source = FakeDirectory { reachable: false, users: vec![], groups: vec![] };

        let history = perform_full_sync(&db, &source, options()).await.unwrap();
        assert_eq!(history.status, SyncStatus::Failed);
        assert!(history.id.is_some());
        assert!(history.errors[0].contains("SCIM endpoint unreachable"));
        assert_eq!(history.stats.users.created, 0);
        assert_eq!(history.triggered_by.as_deref(), Some("ADM1"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_item_errors_are_collected_and_sync_continues() {
        let db = MongoDB::new("mongodb://localhost:27017", "ofm_test").await.unwrap();
        let suffix = ObjectId::new().to_hex();
        let users = vec![
            scim_user(&format!("a-{}", suffix), &format!("a-{}@ias.co.id", suffix), &format!("E-{}", suffix)),
            // mesmo userId que o primeiro: viola o índice único
            scim_user(&format!("b-{}", suffix), &format!("b-{}@ias.co.id", suffix), &format!("E-{}", suffix)),
            scim_user(&format!("c-{}", suffix), &format!("c-{}@ias.co.id", suffix), &format!("F-{}", suffix)),
        ];
        let source = FakeDirectory { reachable: true, users, groups: vec![] };

        let history = perform_full_sync(&db, &source, options()).await.unwrap();
        assert_eq!(history.status, SyncStatus::Success);
        assert_eq!(history.stats.users.created, 2);
        assert_eq!(history.stats.users.errors, 1);
        assert_eq!(history.errors.len(), 1);
        assert!(history.errors[0].starts_with(&format!("User b-{}@ias.co.id", suffix)));
    }

    #[test]
    fn test_deactivation_only_on_flip() {
        assert_eq!(user_outcome(true, false), Upserted::Deactivated);
        assert_eq!(user_outcome(false, false), Upserted::Updated);
        assert_eq!(user_outcome(false, true), Upserted::Updated);
    }

    #[test]
    fn test_stats_record() {
        let mut stats = EntityStats::default();
        stats.record(Upserted::Created);
        stats.record(Upserted::Deactivated);
        stats.record(Upserted::Updated);
        stats.record(Upserted::Updated);
        assert_eq!((stats.created, stats.updated, stats.deactivated), (1, 2, 1));
    }

    #[test]
    fn test_default_roles_for_email() {
        let roles = DefaultRoles { super_admin: Some("sa".into()), employee: Some("emp".into()) };
        assert_eq!(roles.for_email("root@ias.co.id", "root@ias.co.id"), vec!["sa".to_string()]);
        assert_eq!(roles.for_email("budi@ias.co.id", "root@ias.co.id"), vec!["emp".to_string()]);
        assert!(DefaultRoles::default().for_email("budi@ias.co.id", "").is_empty());
    }
}
