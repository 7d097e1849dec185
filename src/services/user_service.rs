use crate::api::response::Pagination;
use crate::auth::user_sync::username_from_email;
use crate::database::{MongoDB, USERS};
use crate::models::{CreateUserRequest, UpdateUserRequest, User};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult, FieldError};
use crate::utils::validation::{escape_regex, is_valid_email, now_ms, Validator};
use mongodb::bson::{doc, Document};

#[derive(Debug, Default)]
pub struct UserFilter {
    pub company_id: Option<String>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        crud::insert_if_present(&mut filter, "companyId", self.company_id.as_deref());
        if let Some(active) = self.is_active {
            filter.insert("isActive", active);
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = escape_regex(search);
            let fields = ["userId", "email", "username", "firstName", "lastName"];
            let clauses: Vec<Document> = fields
                .iter()
                .map(|f| {
                    let mut clause = Document::new();
                    clause.insert(*f, doc! { "$regex": &pattern, "$options": "i" });
                    clause
                })
                .collect();
            filter.insert("$or", clauses);
        }
        filter
    }
}

pub async fn list_users(db: &MongoDB, filter: &UserFilter, pagination: &Pagination) -> ApiResult<(Vec<User>, u64)> {
    crud::find_page(&db.collection::<User>(USERS), filter.to_document(), doc! { "createdAt": -1 }, pagination).await
}

pub async fn get_user(db: &MongoDB, id: &str) -> ApiResult<User> {
    let oid = crud::parse_object_id(id, "user")?;
    crud::find_by_id(&db.collection::<User>(USERS), oid, "User not found").await
}

pub async fn find_by_user_id(db: &MongoDB, user_id: &str) -> ApiResult<Option<User>> {
    Ok(db.collection::<User>(USERS).find_one(doc! { "userId": user_id }).await?)
}

pub async fn create_user(db: &MongoDB, req: CreateUserRequest) -> ApiResult<User> {
    let email = req.email.as_deref().map(str::trim).unwrap_or("").to_lowercase();
    Validator::new()
        .require_str("email", &req.email)
        .check(email.is_empty() || is_valid_email(&email), "email", "Invalid email format")
        .finish()?;

    let users = db.collection::<User>(USERS);
    if users.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(ApiError::validation_failed(vec![FieldError::new("email", "Email already exists")]));
    }

    let now = now_ms();
    let user_id = req
        .user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| format!("USR-{}", now));
    if users.find_one(doc! { "userId": &user_id }).await?.is_some() {
        return Err(ApiError::validation_failed(vec![FieldError::new("userId", "User ID already exists")]));
    }

    let mut user = User {
        id: None,
        user_id,
        username: req.username.filter(|u| !u.is_empty()).unwrap_or_else(|| username_from_email(&email)),
        email,
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        company_id: req.company_id,
        department_id: req.department_id,
        position_id: req.position_id,
        manager_id: req.manager_id,
        role_ids: req.role_ids.unwrap_or_default(),
        company_access: req.company_access.unwrap_or_default(),
        sso_user_id: None,
        is_active: req.is_active.unwrap_or(true),
        last_login_at: None,
        synced_at: None,
        created_at: now,
        updated_at: now,
    };

    let result = users.insert_one(&user).await?;
    user.id = result.inserted_id.as_object_id();
    log::info!("✅ User created: {}", user.user_id);
    Ok(user)
}

pub async fn update_user(db: &MongoDB, id: &str, mut req: UpdateUserRequest) -> ApiResult<User> {
    let oid = crud::parse_object_id(id, "user")?;
    let users = db.collection::<User>(USERS);
    let existing = crud::find_by_id(&users, oid, "User not found").await?;

    if let Some(email) = req.email.take() {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(ApiError::validation_failed(vec![FieldError::new("email", "Invalid email format")]));
        }
        if email != existing.email && users.find_one(doc! { "email": &email }).await?.is_some() {
            return Err(ApiError::validation_failed(vec![FieldError::new("email", "Email already exists")]));
        }
        req.email = Some(email);
    }

    let set = crud::set_document(&req, None, now_ms())?;
    users.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    crud::find_by_id(&users, oid, "User not found").await
}

pub async fn delete_user(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "user")?;
    let result = db.collection::<User>(USERS).delete_one(doc! { "_id": oid }).await?;
    if result.deleted_count == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    log::info!("🗑️ User deleted: {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_with_search() {
        let filter = UserFilter {
            company_id: Some("IAS".into()),
            is_active: Some(true),
            search: Some(" budi ".into()),
        };
        let doc = filter.to_document();
        assert_eq!(doc.get_str("companyId").unwrap(), "IAS");
        let or = doc.get_array("$or").unwrap();
        assert_eq!(or.len(), 5);
        let email = or[1].as_document().unwrap().get_document("email").unwrap();
        assert_eq!(email.get_str("$regex").unwrap(), "budi");
    }

    #[test]
    fn test_filter_without_search() {
        let doc = UserFilter { search: Some("".into()), ..Default::default() }.to_document();
        assert!(doc.is_empty());
    }
}
