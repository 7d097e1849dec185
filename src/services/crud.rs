use crate::api::response::Pagination;
use crate::middleware::AuthUser;
use crate::models::{RequestStatus, Requester, DEFAULT_REJECTION_REASON};
use crate::utils::crypto::random_bytes;
use crate::utils::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::Collection;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// `what` entra na mensagem: "Invalid request ID", "Invalid company ID"...
pub fn parse_object_id(id: &str, what: &str) -> ApiResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| ApiError::validation(format!("Invalid {} ID", what)))
}

pub async fn find_page<T>(
    collection: &Collection<T>,
    filter: Document,
    sort: Document,
    pagination: &Pagination,
) -> ApiResult<(Vec<T>, u64)>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let total = collection.count_documents(filter.clone()).await?;
    let items = collection
        .find(filter)
        .sort(sort)
        .skip(pagination.skip())
        .limit(pagination.limit as i64)
        .await?
        .try_collect()
        .await?;
    Ok((items, total))
}

pub async fn find_all<T>(collection: &Collection<T>, filter: Document, sort: Document) -> ApiResult<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    Ok(collection.find(filter).sort(sort).await?.try_collect().await?)
}

pub async fn find_by_id<T>(collection: &Collection<T>, id: ObjectId, not_found: &str) -> ApiResult<T>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    collection
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::NotFound(not_found.to_string()))
}

/// Monta o `$set` de um update parcial (campos `None` não entram) + auditoria
pub fn set_document<U: Serialize>(update: &U, updated_by: Option<&str>, now: i64) -> ApiResult<Document> {
    let mut set = mongodb::bson::to_document(update)?;
    set.insert("updatedAt", now);
    if let Some(by) = updated_by {
        set.insert("updatedBy", by);
    }
    Ok(set)
}

/// Filtro de igualdade só quando o parâmetro veio preenchido
pub fn insert_if_present(filter: &mut Document, field: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        filter.insert(field, v);
    }
}

/// `{$gte, $lte}` em epoch ms a partir de `startDate`/`endDate`
pub fn date_range(start: Option<i64>, end: Option<i64>) -> Option<Document> {
    if start.is_none() && end.is_none() {
        return None;
    }
    let mut range = Document::new();
    if let Some(s) = start {
        range.insert("$gte", Bson::Int64(s));
    }
    if let Some(e) = end {
        range.insert("$lte", Bson::Int64(e));
    }
    Some(range)
}

/// `PREFIX-YYYYMMDD-NNNN` com sufixo aleatório
pub fn request_number(prefix: &str, now: DateTime<Utc>) -> ApiResult<String> {
    let bytes = random_bytes(2).map_err(ApiError::Internal)?;
    let sequence = u16::from_be_bytes([bytes[0], bytes[1]]) % 10_000;
    Ok(format_request_number(prefix, now, sequence))
}

fn format_request_number(prefix: &str, now: DateTime<Utc>, sequence: u16) -> String {
    format!("{}-{}-{:04}", prefix, now.format("%Y%m%d"), sequence)
}

/// Próximo `PREFIX-NNN` depois do maior já gravado (não reaproveita números após deletes)
pub fn next_sequence_id(prefix: &str, last: Option<&str>) -> String {
    let next = last
        .and_then(|id| sequence_number(prefix, id))
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("{}-{:03}", prefix, next)
}

/// Id com o maior número entre os gravados (comparação numérica, não lexicográfica)
pub fn highest_sequence_id<'a>(prefix: &str, ids: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    ids.into_iter()
        .filter_map(|id| sequence_number(prefix, id).map(|n| (n, id)))
        .max_by_key(|(n, _)| *n)
        .map(|(_, id)| id)
}

fn sequence_number(prefix: &str, id: &str) -> Option<u32> {
    id.strip_prefix(prefix).and_then(|n| n.trim_start_matches('-').parse::<u32>().ok())
}

/// `PREFIX-<epoch ms>` para ids opcionais no create (`ROOM-`, `VEH-`, `DRV-`, `LOC-`)
pub fn timestamp_id(prefix: &str, now: i64) -> String {
    format!("{}-{}", prefix, now)
}

/// Solicitante a partir do usuário autenticado
pub fn requester_for(user: &AuthUser, department_id: Option<String>, default_company_id: &str) -> Requester {
    Requester {
        user_id: user.user_id.clone(),
        user_name: user.display_name(),
        user_email: user.email.clone(),
        company_id: user.company_id.clone().unwrap_or_else(|| default_company_id.to_string()),
        department_id: department_id.filter(|d| !d.is_empty()),
    }
}

/// `$set` comum das mudanças de status (já validadas por `check_transition`)
pub fn status_set(target: RequestStatus, actor: &AuthUser, rejection_reason: Option<&str>, now: i64) -> Document {
    let mut set = doc! {
        "status": target.as_str(),
        "updatedAt": now,
        "updatedBy": &actor.user_id,
    };
    match target {
        RequestStatus::Approved => {
            set.insert("approvedBy", &actor.user_id);
            set.insert("approvedAt", now);
        }
        RequestStatus::Rejected => {
            let reason = rejection_reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_REJECTION_REASON);
            set.insert("approvedBy", &actor.user_id);
            set.insert("approvedAt", now);
            set.insert("rejectionReason", reason);
        }
        _ => {}
    }
    set
}

/// Filtro de compare-and-set: só casa se o status não mudou desde a leitura
pub fn status_guard(id: ObjectId, current: RequestStatus) -> Document {
    doc! { "_id": id, "status": current.as_str() }
}

/// `$set` condicionado ao status lido; outra escrita no meio vira 409
pub async fn guarded_status_update<T>(
    collection: &Collection<T>,
    id: ObjectId,
    current: RequestStatus,
    set: Document,
) -> ApiResult<()>
where
    T: Send + Sync,
{
    let result = collection.update_one(status_guard(id, current), doc! { "$set": set }).await?;
    if result.matched_count == 0 {
        log::warn!("⚠️ Concurrent status change on {} (expected {})", id, current.as_str());
        return Err(ApiError::Conflict("Request status changed concurrently, please reload".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex(), "request").unwrap(), id);

        let err = parse_object_id("nope", "request").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.to_string(), "Invalid request ID");
    }

    #[test]
    fn test_set_document_skips_none_and_adds_audit() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Patch {
            #[serde(skip_serializing_if = "Option::is_none")]
            company_name: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            phone: Option<String>,
        }

        let set = set_document(&Patch { company_name: Some("IAS".into()), phone: None }, Some("E001"), 42).unwrap();
        assert_eq!(set.get_str("companyName").unwrap(), "IAS");
        assert!(set.get("phone").is_none());
        assert_eq!(set.get_i64("updatedAt").unwrap(), 42);
        assert_eq!(set.get_str("updatedBy").unwrap(), "E001");
    }

    #[test]
    fn test_next_sequence_id() {
        assert_eq!(next_sequence_id("TP", None), "TP-001");
        assert_eq!(next_sequence_id("TP", Some("TP-009")), "TP-010");
        assert_eq!(next_sequence_id("TRANS", Some("TRANS-041")), "TRANS-042");
        assert_eq!(next_sequence_id("TP", Some("garbage")), "TP-001");
        assert_eq!(timestamp_id("ROOM", 1700000000000), "ROOM-1700000000000");
    }

    #[test]
    fn test_highest_sequence_id_is_numeric() {
        let ids = ["TRANS-009", "TRANS-1000", "TRANS-010", "LEGACY"];
        assert_eq!(highest_sequence_id("TRANS", ids), Some("TRANS-1000"));
        assert_eq!(next_sequence_id("TRANS", highest_sequence_id("TRANS", ids)), "TRANS-1001");
        assert_eq!(highest_sequence_id("TP", Vec::<&str>::new()), None);
    }

    #[test]
    fn test_status_guard_matches_id_and_current_status() {
        let id = ObjectId::new();
        assert_eq!(status_guard(id, RequestStatus::Pending), doc! { "_id": id, "status": "pending" });
        assert_eq!(status_guard(id, RequestStatus::Approved).get_str("status").unwrap(), "approved");
    }

    #[tokio::test]
    #[ignore]
    async fn test_guarded_update_conflicts_after_concurrent_change() {
        let db = crate::database::MongoDB::new("mongodb://localhost:27017", "ofm_test").await.unwrap();
        let coll = db.collection::<Document>("guarded_update_test");
        let id = ObjectId::new();
        coll.insert_one(doc! { "_id": id, "status": "pending" }).await.unwrap();

        guarded_status_update(&coll, id, RequestStatus::Pending, doc! { "status": "approved" }).await.unwrap();
        let err = guarded_status_update(&coll, id, RequestStatus::Pending, doc! { "status": "rejected" })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn test_date_range() {
        assert!(date_range(None, None).is_none());
        let range = date_range(Some(1), None).unwrap();
        assert_eq!(range.get_i64("$gte").unwrap(), 1);
        assert!(range.get("$lte").is_none());
    }

    #[test]
    fn test_insert_if_present_ignores_empty() {
        let mut filter = Document::new();
        insert_if_present(&mut filter, "status", Some(""));
        insert_if_present(&mut filter, "type", None);
        insert_if_present(&mut filter, "companyId", Some("IAS"));
        assert_eq!(filter, doc! { "companyId": "IAS" });
    }

    fn actor() -> AuthUser {
        AuthUser {
            user_id: "ADM1".into(),
            email: "admin@ias.co.id".into(),
            name: None,
            roles: vec!["admin".into()],
            company_id: None,
            company_access: vec![],
        }
    }

    #[test]
    fn test_status_set_for_rejection_uses_default_reason() {
        let set = status_set(RequestStatus::Rejected, &actor(), Some("  "), 5);
        assert_eq!(set.get_str("status").unwrap(), "rejected");
        assert_eq!(set.get_str("rejectionReason").unwrap(), "No reason provided");
        assert_eq!(set.get_i64("approvedAt").unwrap(), 5);
    }

    #[test]
    fn test_status_set_for_cancel_has_no_approval() {
        let set = status_set(RequestStatus::Cancelled, &actor(), None, 5);
        assert_eq!(set.get_str("status").unwrap(), "cancelled");
        assert_eq!(set.get_str("updatedBy").unwrap(), "ADM1");
        assert!(set.get("approvedBy").is_none());
    }

    #[test]
    fn test_requester_falls_back_to_default_company() {
        let requester = requester_for(&actor(), Some(String::new()), "IAS");
        assert_eq!(requester.company_id, "IAS");
        assert_eq!(requester.user_name, "admin@ias.co.id");
        assert!(requester.department_id.is_none());
    }

    #[test]
    fn test_request_number_format() {
        let now = Utc.with_ymd_and_hms(2025, 10, 16, 8, 0, 0).unwrap();
        assert_eq!(format_request_number("TR", now, 7), "TR-20251016-0007");

        let generated = request_number("MR", now).unwrap();
        assert!(generated.starts_with("MR-20251016-"));
        assert_eq!(generated.len(), "MR-20251016-0000".len());
    }
}
