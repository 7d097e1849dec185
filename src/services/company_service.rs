use crate::api::response::Pagination;
use crate::database::{MongoDB, COMPANIES, USERS};
use crate::middleware::AuthUser;
use crate::models::{Company, CompanyOption, CreateCompanyRequest, UpdateCompanyRequest};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::{now_ms, Validator};
use mongodb::bson::{doc, Document};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Default)]
pub struct CompanyFilter {
    pub company_id: Option<String>,
    pub is_active: Option<bool>,
}

impl CompanyFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        crud::insert_if_present(&mut filter, "companyId", self.company_id.as_deref());
        if let Some(active) = self.is_active {
            filter.insert("isActive", active);
        }
        filter
    }
}

/// Lista plana em profundidade; pais fora do conjunto viram raiz.
/// Nós presos num ciclo de pais entram como raízes extras, na ordem de entrada.
pub fn build_company_tree(companies: &[Company]) -> Vec<CompanyOption> {
    let ids: HashSet<&str> = companies.iter().map(|c| c.company_id.as_str()).collect();
    let mut children: HashMap<&str, Vec<&Company>> = HashMap::new();
    let mut roots: Vec<&Company> = Vec::new();

    for company in companies {
        match company.parent_company_id.as_deref() {
            Some(parent) if ids.contains(parent) && parent != company.company_id => {
                children.entry(parent).or_default().push(company)
            }
            _ => roots.push(company),
        }
    }

    fn walk<'a>(
        nodes: &[&'a Company],
        level: usize,
        children: &HashMap<&str, Vec<&'a Company>>,
        visited: &mut HashSet<&'a str>,
        out: &mut Vec<CompanyOption>,
    ) {
        for node in nodes {
            if !visited.insert(node.company_id.as_str()) {
                continue;
            }
            out.push(CompanyOption {
                company_id: node.company_id.clone(),
                company_name: node.company_name.clone(),
                parent_company_id: node.parent_company_id.clone(),
                level,
            });
            if let Some(kids) = children.get(node.company_id.as_str()) {
                walk(kids, level + 1, children, visited, out);
            }
        }
    }

    let mut out = Vec::with_capacity(companies.len());
    let mut visited = HashSet::new();
    walk(&roots, 0, &children, &mut visited, &mut out);

    for company in companies {
        if !visited.contains(company.company_id.as_str()) {
            walk(&[company], 0, &children, &mut visited, &mut out);
        }
    }
    out
}

/// BFS pelos filhos ativos; inclui as próprias raízes
pub fn descendant_company_ids(companies: &[Company], roots: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = roots.iter().cloned().collect();
    let mut result: Vec<String> = roots.to_vec();
    let mut queue: VecDeque<String> = roots.iter().cloned().collect();

    while let Some(current) = queue.pop_front() {
        for child in companies
            .iter()
            .filter(|c| c.is_active && c.parent_company_id.as_deref() == Some(current.as_str()))
        {
            if seen.insert(child.company_id.clone()) {
                result.push(child.company_id.clone());
                queue.push_back(child.company_id.clone());
            }
        }
    }
    result
}

/// `None` = sem restrição (super/global admin)
pub fn accessible_company_ids(user: &AuthUser) -> Option<Vec<String>> {
    if user.is_global_admin() {
        return None;
    }
    if !user.company_access.is_empty() {
        return Some(user.company_access.clone());
    }
    Some(user.company_id.clone().into_iter().collect())
}

pub async fn list_companies(db: &MongoDB, filter: &CompanyFilter, pagination: &Pagination) -> ApiResult<(Vec<Company>, u64)> {
    crud::find_page(
        &db.collection::<Company>(COMPANIES),
        filter.to_document(),
        doc! { "companyName": 1 },
        pagination,
    )
    .await
}

/// Empresas ativas que o usuário pode selecionar, em árvore
pub async fn select_options(db: &MongoDB, user: &AuthUser, include_descendants: bool) -> ApiResult<Vec<CompanyOption>> {
    let active = crud::find_all(
        &db.collection::<Company>(COMPANIES),
        doc! { "isActive": true },
        doc! { "companyName": 1 },
    )
    .await?;

    let visible: Vec<Company> = match accessible_company_ids(user) {
        None => active,
        Some(ids) => {
            let ids = if include_descendants { descendant_company_ids(&active, &ids) } else { ids };
            let allowed: HashSet<&str> = ids.iter().map(String::as_str).collect();
            active.into_iter().filter(|c| allowed.contains(c.company_id.as_str())).collect()
        }
    };

    Ok(build_company_tree(&visible))
}

pub async fn get_company(db: &MongoDB, id: &str) -> ApiResult<Company> {
    let oid = crud::parse_object_id(id, "company")?;
    crud::find_by_id(&db.collection::<Company>(COMPANIES), oid, "Company not found").await
}

pub async fn create_company(db: &MongoDB, req: CreateCompanyRequest, created_by: &str) -> ApiResult<Company> {
    Validator::new()
        .require_str("companyId", &req.company_id)
        .require_str("companyName", &req.company_name)
        .finish()?;

    let company_id = req.company_id.unwrap_or_default().trim().to_string();
    let companies = db.collection::<Company>(COMPANIES);

    if companies.find_one(doc! { "companyId": &company_id }).await?.is_some() {
        return Err(ApiError::validation("Company with this ID already exists"));
    }

    let now = now_ms();
    let mut company = Company {
        id: None,
        code: req.code.filter(|c| !c.is_empty()).unwrap_or_else(|| company_id.clone()),
        company_id,
        company_name: req.company_name.unwrap_or_default(),
        email: req.email,
        phone: req.phone,
        address: req.address,
        parent_company_id: req.parent_company_id.filter(|p| !p.is_empty()),
        sso_org_id: req.sso_org_id,
        is_active: req.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
        created_by: Some(created_by.to_string()),
        updated_by: None,
    };

    let result = companies.insert_one(&company).await?;
    company.id = result.inserted_id.as_object_id();
    log::info!("✅ Company created: {}", company.company_id);
    Ok(company)
}

pub async fn update_company(db: &MongoDB, id: &str, req: UpdateCompanyRequest, updated_by: &str) -> ApiResult<Company> {
    let oid = crud::parse_object_id(id, "company")?;
    let companies = db.collection::<Company>(COMPANIES);
    let existing = crud::find_by_id(&companies, oid, "Company not found").await?;

    if let Some(new_id) = req.company_id.as_deref().filter(|n| *n != existing.company_id) {
        if companies.find_one(doc! { "companyId": new_id }).await?.is_some() {
            return Err(ApiError::validation("Company with this ID already exists"));
        }
    }

    let set = crud::set_document(&req, Some(updated_by), now_ms())?;
    companies.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    crud::find_by_id(&companies, oid, "Company not found").await
}

pub async fn delete_company(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "company")?;
    let companies = db.collection::<Company>(COMPANIES);
    let existing = crud::find_by_id(&companies, oid, "Company not found").await?;

    let users = db
        .collection::<Document>(USERS)
        .count_documents(doc! { "companyId": &existing.company_id })
        .await?;
    if users > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete company. {} user(s) are associated with it.",
            users
        )));
    }

    companies.delete_one(doc! { "_id": oid }).await?;
    log::info!("🗑️ Company deleted: {}", existing.company_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(id: &str, parent: Option<&str>) -> Company {
        Company {
            id: None,
            company_id: id.into(),
            company_name: format!("{} Name", id),
            code: id.into(),
            email: None,
            phone: None,
            address: None,
            parent_company_id: parent.map(String::from),
            sso_org_id: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
            created_by: None,
            updated_by: None,
        }
    }

    fn user(roles: &[&str], company: Option<&str>, access: &[&str]) -> AuthUser {
        AuthUser {
            user_id: "E001".into(),
            email: "budi@ias.co.id".into(),
            name: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            company_id: company.map(String::from),
            company_access: access.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_tree_is_depth_first_with_levels() {
        let companies = vec![
            company("IAS", None),
            company("IAS-BALI", Some("IAS")),
            company("IAS-BALI-DPS", Some("IAS-BALI")),
            company("IAS-JKT", Some("IAS")),
            company("OTHER", None),
        ];
        let tree = build_company_tree(&companies);
        let flat: Vec<(&str, usize)> = tree.iter().map(|c| (c.company_id.as_str(), c.level)).collect();
        assert_eq!(
            flat,
            vec![("IAS", 0), ("IAS-BALI", 1), ("IAS-BALI-DPS", 2), ("IAS-JKT", 1), ("OTHER", 0)]
        );
    }

    #[test]
    fn test_missing_parent_becomes_root() {
        let tree = build_company_tree(&[company("IAS-BALI", Some("IAS"))]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].level, 0);
    }

    #[test]
    fn test_parent_cycle_keeps_every_company() {
        let companies = vec![company("A", Some("B")), company("B", Some("A")), company("C", None)];
        let tree = build_company_tree(&companies);
        let flat: Vec<(&str, usize)> = tree.iter().map(|c| (c.company_id.as_str(), c.level)).collect();
        assert_eq!(flat, vec![("C", 0), ("A", 0), ("B", 1)]);
    }

    #[test]
    fn test_descendants_skip_inactive() {
        let mut inactive = company("IAS-OLD", Some("IAS"));
        inactive.is_active = false;
        let companies = vec![
            company("IAS", None),
            company("IAS-BALI", Some("IAS")),
            company("IAS-BALI-DPS", Some("IAS-BALI")),
            inactive,
        ];
        let ids = descendant_company_ids(&companies, &["IAS".to_string()]);
        assert_eq!(ids, vec!["IAS", "IAS-BALI", "IAS-BALI-DPS"]);
    }

    #[test]
    fn test_accessible_company_ids() {
        assert_eq!(accessible_company_ids(&user(&["super_admin"], Some("IAS"), &[])), None);
        assert_eq!(accessible_company_ids(&user(&["global_admin"], None, &[])), None);
        assert_eq!(
            accessible_company_ids(&user(&["admin"], Some("IAS"), &["A", "B"])),
            Some(vec!["A".to_string(), "B".to_string()])
        );
        assert_eq!(accessible_company_ids(&user(&["employee"], Some("IAS"), &[])), Some(vec!["IAS".to_string()]));
        assert_eq!(accessible_company_ids(&user(&["employee"], None, &[])), Some(vec![]));
    }

    #[test]
    fn test_filter_document() {
        let filter = CompanyFilter { company_id: Some("IAS".into()), is_active: Some(false) };
        assert_eq!(filter.to_document(), doc! { "companyId": "IAS", "isActive": false });
    }
}
