use crate::database::{MongoDB, TRANSPORT_COMPANIES, VOUCHERS};
use crate::models::{CreateTransportCompanyRequest, TransportCompany, UpdateTransportCompanyRequest};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::{now_ms, parse_datetime_ms, Validator};
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};

const ID_PREFIX: &str = "TRANS";

pub async fn list_transport_companies(db: &MongoDB, active_only: bool) -> ApiResult<Vec<TransportCompany>> {
    let filter = if active_only { doc! { "isActive": true } } else { doc! {} };
    crud::find_all(&db.collection::<TransportCompany>(TRANSPORT_COMPANIES), filter, doc! { "name": 1 }).await
}

pub async fn get_transport_company(db: &MongoDB, id: &str) -> ApiResult<TransportCompany> {
    let oid = crud::parse_object_id(id, "transport company")?;
    crud::find_by_id(&db.collection::<TransportCompany>(TRANSPORT_COMPANIES), oid, "Transport company not found").await
}

fn parse_contract_date(value: Option<&str>, field: &str) -> ApiResult<Option<i64>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_datetime_ms(v)
            .map(Some)
            .ok_or_else(|| ApiError::validation(format!("Invalid {} date", field))),
    }
}

pub fn build_transport_company(
    req: CreateTransportCompanyRequest,
    company_id: String,
    org_company_id: &str,
    created_by: &str,
    now: i64,
) -> ApiResult<TransportCompany> {
    Validator::new()
        .require_str("name", &req.name)
        .require("type", &req.company_type)
        .finish()
        .map_err(|_| ApiError::validation("Name and type are required"))?;

    Ok(TransportCompany {
        id: None,
        company_id,
        name: req.name.map(|n| n.trim().to_string()).unwrap_or_default(),
        company_type: req
            .company_type
            .ok_or_else(|| ApiError::validation("Name and type are required"))?,
        contact_person: req.contact_person.filter(|c| !c.is_empty()),
        contact_phone: req.contact_phone.filter(|c| !c.is_empty()),
        contact_email: req.contact_email.filter(|c| !c.is_empty()),
        contract_number: req.contract_number.filter(|c| !c.is_empty()),
        contract_start_date: parse_contract_date(req.contract_start_date.as_deref(), "contractStartDate")?,
        contract_end_date: parse_contract_date(req.contract_end_date.as_deref(), "contractEndDate")?,
        billing_cycle: req.billing_cycle,
        billing_contact_email: req.billing_contact_email.filter(|c| !c.is_empty()),
        is_active: req.is_active != Some(false),
        notes: req.notes.filter(|n| !n.is_empty()),
        org_company_id: org_company_id.to_string(),
        created_at: now,
        updated_at: now,
        created_by: Some(created_by.to_string()),
        updated_by: Some(created_by.to_string()),
    })
}

pub async fn create_transport_company(
    db: &MongoDB,
    req: CreateTransportCompanyRequest,
    org_company_id: &str,
    created_by: &str,
) -> ApiResult<TransportCompany> {
    let companies = db.collection::<TransportCompany>(TRANSPORT_COMPANIES);
    let existing: Vec<Document> = db
        .collection::<Document>(TRANSPORT_COMPANIES)
        .find(doc! {})
        .projection(doc! { "companyId": 1, "_id": 0 })
        .await?
        .try_collect()
        .await?;
    let next_id = crud::next_sequence_id(
        ID_PREFIX,
        crud::highest_sequence_id(ID_PREFIX, existing.iter().filter_map(|d| d.get_str("companyId").ok())),
    );

    let mut company = build_transport_company(req, next_id, org_company_id, created_by, now_ms())?;
    let result = companies.insert_one(&company).await?;
    company.id = result.inserted_id.as_object_id();
    log::info!("✅ Transport company created: {} ({})", company.company_id, company.name);
    Ok(company)
}

pub fn transport_company_update_set(
    req: &UpdateTransportCompanyRequest,
    updated_by: &str,
    now: i64,
) -> ApiResult<Document> {
    let mut set = crud::set_document(req, Some(updated_by), now)?;
    if let Some(start) = parse_contract_date(req.contract_start_date.as_deref(), "contractStartDate")? {
        set.insert("contractStartDate", start);
    }
    if let Some(end) = parse_contract_date(req.contract_end_date.as_deref(), "contractEndDate")? {
        set.insert("contractEndDate", end);
    }
    Ok(set)
}

pub async fn update_transport_company(
    db: &MongoDB,
    id: &str,
    req: UpdateTransportCompanyRequest,
    updated_by: &str,
) -> ApiResult<TransportCompany> {
    let oid = crud::parse_object_id(id, "transport company")?;
    let set = transport_company_update_set(&req, updated_by, now_ms())?;
    let companies = db.collection::<TransportCompany>(TRANSPORT_COMPANIES);
    crud::find_by_id(&companies, oid, "Transport company not found").await?;

    companies.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    crud::find_by_id(&companies, oid, "Transport company not found").await
}

/// Recusado enquanto existirem vouchers do fornecedor
pub async fn delete_transport_company(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "transport company")?;
    let companies = db.collection::<TransportCompany>(TRANSPORT_COMPANIES);
    let existing = crud::find_by_id(&companies, oid, "Transport company not found").await?;

    let vouchers = db
        .collection::<Document>(VOUCHERS)
        .count_documents(doc! { "transportCompanyId": &existing.company_id })
        .await?;
    if vouchers > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete company with {} vouchers. Set to inactive instead.",
            vouchers
        )));
    }

    companies.delete_one(doc! { "_id": oid }).await?;
    log::info!("🗑️ Transport company deleted: {}", existing.company_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillingCycle, TransportCompanyType};

    #[test]
    fn test_build_transport_company() {
        let req = CreateTransportCompanyRequest {
            name: Some(" Gojek ".into()),
            company_type: Some(TransportCompanyType::RideHailing),
            contract_start_date: Some("2026-01-01".into()),
            billing_cycle: Some(BillingCycle::Monthly),
            ..Default::default()
        };
        let company = build_transport_company(req, "TRANS-001".into(), "IAS", "ADM1", 3).unwrap();
        assert_eq!(company.name, "Gojek");
        assert!(company.is_active);
        assert_eq!(company.contract_start_date, parse_datetime_ms("2026-01-01"));

        let json = serde_json::to_value(&company).unwrap();
        assert_eq!(json["type"], "ride_hailing");
        assert_eq!(json["companyId"], "TRANS-001");
        assert_eq!(json["companyId_org"], "IAS");
    }

    #[test]
    fn test_build_requires_name_and_type() {
        let req = CreateTransportCompanyRequest { name: Some("Grab".into()), ..Default::default() };
        let err = build_transport_company(req, "TRANS-002".into(), "IAS", "ADM1", 0).unwrap_err();
        assert_eq!(err.to_string(), "Name and type are required");
    }

    #[test]
    fn test_update_set_parses_contract_dates() {
        let req = UpdateTransportCompanyRequest {
            contract_end_date: Some("2026-12-31".into()),
            is_active: Some(false),
            ..Default::default()
        };
        let set = transport_company_update_set(&req, "ADM1", 1).unwrap();
        assert_eq!(set.get_i64("contractEndDate").unwrap(), parse_datetime_ms("2026-12-31").unwrap());
        assert!(!set.get_bool("isActive").unwrap());
        assert!(!set.contains_key("contractStartDate"));

        let bad = UpdateTransportCompanyRequest { contract_start_date: Some("soon".into()), ..Default::default() };
        assert!(transport_company_update_set(&bad, "ADM1", 1).is_err());
    }
}
