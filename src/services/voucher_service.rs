use crate::api::response::Pagination;
use crate::database::{MongoDB, VOUCHERS};
use crate::models::{
    ImportResult, ProviderStats, ReconcileVoucherRequest, Voucher, VoucherExport, VoucherStats, VoucherStatus,
};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::now_ms;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, Document};
use std::collections::HashSet;

/// O CSV dos providers traz 3 linhas de cabeçalho antes dos códigos
const HEADER_LINES: usize = 3;

pub const EXPORT_HEADER: &str =
    "Voucher Code,Provider,Used At,Used By,Request ID,Actual Price,Billed At,Invoice Number,Billing Month";

fn is_voucher_code(line: &str) -> bool {
    (6..=12).contains(&line.len()) && line.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

pub fn parse_voucher_codes(csv: &str) -> Vec<String> {
    csv.lines()
        .skip(HEADER_LINES)
        .map(str::trim)
        .filter(|l| is_voucher_code(l))
        .map(String::from)
        .collect()
}

/// Primeiro `YYYYMMDD` do nome do arquivo vira `YYYY-MM`; sem data, mês corrente
pub fn extract_billing_month(filename: &str, now: DateTime<Utc>) -> String {
    let bytes = filename.as_bytes();
    for start in 0..bytes.len().saturating_sub(7) {
        let window = &bytes[start..start + 8];
        if window.iter().all(u8::is_ascii_digit) {
            let digits = &filename[start..start + 8];
            return format!("{}-{}", &digits[..4], &digits[4..6]);
        }
    }
    now.format("%Y-%m").to_string()
}

pub fn provider_from_filename(filename: &str) -> &'static str {
    if filename.to_lowercase().contains("grab") {
        "grab"
    } else {
        "gojek"
    }
}

pub struct ImportContext<'a> {
    pub filename: &'a str,
    pub transport_company_id: &'a str,
    pub imported_by: &'a str,
    pub company_id: &'a str,
}

/// Separa os códigos novos; repetido no próprio arquivo também conta como duplicado
pub fn split_new_codes(codes: Vec<String>, existing: &HashSet<String>) -> (Vec<String>, usize) {
    let mut seen = HashSet::new();
    let mut fresh = Vec::new();
    let mut duplicates = 0;
    for code in codes {
        if existing.contains(&code) || !seen.insert(code.clone()) {
            duplicates += 1;
            continue;
        }
        fresh.push(code);
    }
    (fresh, duplicates)
}

pub async fn import_vouchers(db: &MongoDB, csv: &str, ctx: ImportContext<'_>) -> ApiResult<ImportResult> {
    if ctx.transport_company_id.trim().is_empty() {
        return Err(ApiError::BadRequest("Transport company ID is required".to_string()));
    }

    let mut result = ImportResult::default();
    let codes = parse_voucher_codes(csv);
    if codes.is_empty() {
        result.errors.push("No valid voucher codes found in CSV".to_string());
        return Ok(result);
    }

    let vouchers = db.collection::<Voucher>(VOUCHERS);
    let existing: HashSet<String> = crud::find_all(
        &vouchers,
        doc! { "voucherCode": { "$in": codes.clone() } },
        doc! { "voucherCode": 1 },
    )
    .await?
    .into_iter()
    .map(|v| v.voucher_code)
    .collect();

    let now = now_ms();
    let billing_month = extract_billing_month(ctx.filename, Utc::now());
    let provider = provider_from_filename(ctx.filename);
    let (new_codes, duplicates) = split_new_codes(codes, &existing);
    result.duplicates = duplicates;

    let mut fresh = Vec::with_capacity(new_codes.len());
    for code in new_codes {
        fresh.push(Voucher {
            id: None,
            voucher_code: code,
            transport_company_id: ctx.transport_company_id.to_string(),
            provider: provider.to_string(),
            status: VoucherStatus::Available,
            used_at: None,
            used_by: None,
            request_id: None,
            actual_price: None,
            billed_at: None,
            billing_month: billing_month.clone(),
            invoice_number: None,
            imported_at: now,
            imported_by: Some(ctx.imported_by.to_string()),
            expiry_date: None,
            company_id: ctx.company_id.to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
        });
    }

    if !fresh.is_empty() {
        vouchers.insert_many(&fresh).await?;
    }

    result.imported = fresh.len();
    result.voucher_codes = fresh.into_iter().map(|v| v.voucher_code).collect();
    result.success = true;
    log::info!(
        "✅ Vouchers imported from {}: {} new, {} duplicates ({})",
        ctx.filename,
        result.imported,
        result.duplicates,
        provider
    );
    Ok(result)
}

#[derive(Debug, Default)]
pub struct VoucherFilter {
    pub status: Option<VoucherStatus>,
    pub provider: Option<String>,
    pub billing_month: Option<String>,
}

impl VoucherFilter {
    pub fn to_document(&self, company_id: &str) -> ApiResult<Document> {
        let mut filter = doc! { "companyId": company_id };
        if let Some(status) = self.status {
            filter.insert("status", to_bson(&status)?);
        }
        let provider = self.provider.as_deref().map(str::to_lowercase);
        crud::insert_if_present(&mut filter, "provider", provider.as_deref());
        crud::insert_if_present(&mut filter, "billingMonth", self.billing_month.as_deref());
        Ok(filter)
    }
}

pub async fn list_vouchers(
    db: &MongoDB,
    company_id: &str,
    filter: &VoucherFilter,
    pagination: &Pagination,
) -> ApiResult<(Vec<Voucher>, u64)> {
    crud::find_page(
        &db.collection::<Voucher>(VOUCHERS),
        filter.to_document(company_id)?,
        doc! { "importedAt": -1 },
        pagination,
    )
    .await
}

pub async fn voucher_stats(db: &MongoDB, company_id: &str) -> ApiResult<VoucherStats> {
    let coll = db.collection::<Document>(VOUCHERS);
    let pipeline = vec![
        doc! { "$match": { "companyId": company_id } },
        doc! { "$group": {
            "_id": { "provider": "$provider", "status": "$status" },
            "count": { "$sum": 1 },
        } },
    ];

    let groups: Vec<Document> = coll.aggregate(pipeline).await?.try_collect().await?;

    let mut stats = VoucherStats::default();
    for group in &groups {
        let count = match group.get("count") {
            Some(mongodb::bson::Bson::Int32(n)) => *n as u64,
            Some(mongodb::bson::Bson::Int64(n)) => *n as u64,
            _ => 0,
        };
        let key = group.get_document("_id").ok();
        let provider = key.and_then(|k| k.get_str("provider").ok()).unwrap_or("unknown");
        let status = key.and_then(|k| k.get_str("status").ok()).unwrap_or("");
        accumulate(&mut stats, provider, status, count);
    }
    stats.by_provider.sort_by(|a, b| a.provider.cmp(&b.provider));
    Ok(stats)
}

fn accumulate(stats: &mut VoucherStats, provider: &str, status: &str, count: u64) {
    stats.total += count;
    let index = match stats.by_provider.iter().position(|p| p.provider == provider) {
        Some(index) => index,
        None => {
            stats.by_provider.push(ProviderStats { provider: provider.to_string(), ..Default::default() });
            stats.by_provider.len() - 1
        }
    };
    let entry = &mut stats.by_provider[index];
    entry.total += count;
    match status {
        "available" => {
            stats.available += count;
            entry.available += count;
        }
        "used" => {
            stats.used += count;
            entry.used += count;
        }
        "expired" => stats.expired += count,
        _ => {}
    }
}

fn iso_ms(ms: Option<i64>) -> String {
    ms.and_then(DateTime::from_timestamp_millis)
        .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

pub fn vouchers_to_csv(vouchers: &[Voucher]) -> String {
    let mut lines = Vec::with_capacity(vouchers.len() + 1);
    lines.push(EXPORT_HEADER.to_string());
    for v in vouchers {
        lines.push(
            [
                v.voucher_code.clone(),
                v.provider.clone(),
                iso_ms(v.used_at),
                v.used_by.clone().unwrap_or_default(),
                v.request_id.clone().unwrap_or_default(),
                v.actual_price.map(|p| p.to_string()).unwrap_or_default(),
                iso_ms(v.billed_at),
                v.invoice_number.clone().unwrap_or_default(),
                v.billing_month.clone(),
            ]
            .join(","),
        );
    }
    lines.join("\n")
}

pub fn export_filename(provider: Option<&str>, billing_month: Option<&str>, now: i64) -> String {
    format!(
        "vouchers_{}_{}_{}.csv",
        provider.filter(|p| !p.is_empty()).unwrap_or("all"),
        billing_month.filter(|m| !m.is_empty()).unwrap_or("all"),
        now
    )
}

/// CSV dos vouchers usados para conferir com a fatura do provider
pub async fn export_used_vouchers(
    db: &MongoDB,
    company_id: &str,
    provider: Option<&str>,
    billing_month: Option<&str>,
) -> ApiResult<VoucherExport> {
    let mut filter = doc! { "companyId": company_id, "status": "used" };
    let provider = provider.map(str::to_lowercase);
    crud::insert_if_present(&mut filter, "provider", provider.as_deref());
    crud::insert_if_present(&mut filter, "billingMonth", billing_month);

    let used = crud::find_all(&db.collection::<Voucher>(VOUCHERS), filter, doc! { "usedAt": 1 }).await?;
    log::info!("📤 Exporting {} used vouchers ({})", used.len(), company_id);

    Ok(VoucherExport {
        csv: vouchers_to_csv(&used),
        filename: export_filename(provider.as_deref(), billing_month, now_ms()),
        count: used.len(),
    })
}

/// Chamado na aprovação de um pedido de transporte com voucher
pub async fn mark_voucher_used(db: &MongoDB, code: &str, used_by: &str, request_id: &str) -> ApiResult<()> {
    let now = now_ms();
    let result = db
        .collection::<Voucher>(VOUCHERS)
        .update_one(
            doc! { "voucherCode": code, "status": "available" },
            doc! { "$set": {
                "status": "used",
                "usedAt": now,
                "usedBy": used_by,
                "requestId": request_id,
                "updatedAt": now,
            } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(ApiError::validation(format!("Voucher {} is not available", code)));
    }
    log::info!("🎟️ Voucher {} used by {} ({})", code, used_by, request_id);
    Ok(())
}

/// Devolve um voucher consumido por uma aprovação que não chegou a gravar
pub async fn release_voucher(db: &MongoDB, code: &str, request_id: &str) -> ApiResult<()> {
    db.collection::<Voucher>(VOUCHERS)
        .update_one(
            doc! { "voucherCode": code, "status": "used", "requestId": request_id },
            doc! {
                "$set": { "status": "available", "updatedAt": now_ms() },
                "$unset": { "usedAt": "", "usedBy": "", "requestId": "" },
            },
        )
        .await?;
    log::info!("🔄 Voucher {} released ({})", code, request_id);
    Ok(())
}

pub async fn reconcile_voucher(db: &MongoDB, id: &str, company_id: &str, req: ReconcileVoucherRequest) -> ApiResult<Voucher> {
    let oid = crud::parse_object_id(id, "voucher")?;
    let Some(price) = req.actual_price else {
        return Err(ApiError::validation("actualPrice is required"));
    };
    if price < 0.0 {
        return Err(ApiError::validation("actualPrice must not be negative"));
    }

    let vouchers = db.collection::<Voucher>(VOUCHERS);
    let now = now_ms();
    let mut set = doc! { "actualPrice": price, "billedAt": now, "updatedAt": now };
    crud::insert_if_present(&mut set, "invoiceNumber", req.invoice_number.as_deref());

    let result = vouchers
        .update_one(doc! { "_id": oid, "companyId": company_id }, doc! { "$set": set })
        .await?;
    if result.matched_count == 0 {
        return Err(ApiError::NotFound("Voucher not found".to_string()));
    }
    crud::find_by_id(&vouchers, oid, "Voucher not found").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn voucher(code: &str) -> Voucher {
        Voucher {
            id: None,
            voucher_code: code.into(),
            transport_company_id: "GOJEK".into(),
            provider: "gojek".into(),
            status: VoucherStatus::Used,
            used_at: Some(1_735_689_600_000),
            used_by: Some("E001".into()),
            request_id: None,
            actual_price: Some(25000.0),
            billed_at: None,
            billing_month: "2025-01".into(),
            invoice_number: None,
            imported_at: 0,
            imported_by: None,
            expiry_date: None,
            company_id: "IAS".into(),
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_parse_codes_skips_header_and_invalid_lines() {
        let csv = "Gojek Voucher\nBatch 12\nCode\nABC123\n  XYZ98765 \nabc123\nSHORT\nTOOLONGCODE1234\n\nGO2025JAN";
        assert_eq!(parse_voucher_codes(csv), vec!["ABC123", "XYZ98765", "GO2025JAN"]);
    }

    #[test]
    fn test_parse_codes_with_only_header() {
        assert!(parse_voucher_codes("a\nb\nc\n").is_empty());
    }

    #[test]
    fn test_billing_month_from_filename() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap();
        assert_eq!(extract_billing_month("gojek_20250115_batch.csv", now), "2025-01");
        assert_eq!(extract_billing_month("vouchers.csv", now), "2025-03");
        assert_eq!(extract_billing_month("v_2025011.csv", now), "2025-03");
    }

    #[test]
    fn test_provider_from_filename() {
        assert_eq!(provider_from_filename("GRAB_Jan.csv"), "grab");
        assert_eq!(provider_from_filename("gojek.csv"), "gojek");
        assert_eq!(provider_from_filename("batch.csv"), "gojek");
    }

    #[test]
    fn test_csv_export_format() {
        let csv = vouchers_to_csv(&[voucher("ABC123")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], EXPORT_HEADER);
        assert_eq!(lines[1], "ABC123,gojek,2025-01-01T00:00:00.000Z,E001,,25000,,,2025-01");
    }

    #[test]
    fn test_export_envelope_keys() {
        let export = VoucherExport {
            csv: vouchers_to_csv(&[voucher("ABC123")]),
            filename: export_filename(Some("gojek"), None, 7),
            count: 1,
        };
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["filename"], "vouchers_gojek_all_7.csv");
        assert_eq!(json["count"], 1);
        assert!(json["csv"].as_str().unwrap().starts_with(EXPORT_HEADER));
    }

    #[test]
    fn test_export_filename_defaults_to_all() {
        assert_eq!(export_filename(None, Some(""), 7), "vouchers_all_all_7.csv");
        assert_eq!(export_filename(Some("grab"), Some("2025-01"), 7), "vouchers_grab_2025-01_7.csv");
    }

    #[test]
    fn test_stats_accumulate() {
        let mut stats = VoucherStats::default();
        accumulate(&mut stats, "gojek", "available", 3);
        accumulate(&mut stats, "gojek", "used", 2);
        accumulate(&mut stats, "grab", "expired", 1);
        assert_eq!((stats.total, stats.available, stats.used, stats.expired), (6, 3, 2, 1));
        assert_eq!(
            stats.by_provider,
            vec![
                ProviderStats { provider: "gojek".into(), total: 5, available: 3, used: 2 },
                ProviderStats { provider: "grab".into(), total: 1, available: 0, used: 0 },
            ]
        );
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["byProvider"][0]["_id"], "gojek");
        assert_eq!(json["byProvider"][1]["total"], 1);
    }

    #[test]
    fn test_split_new_codes_counts_repeats_and_stored() {
        let codes: Vec<String> = ["A1", "B2", "A1", "C3", "B2"].iter().map(|c| c.to_string()).collect();
        let existing: HashSet<String> = HashSet::from(["C3".to_string()]);
        let (fresh, duplicates) = split_new_codes(codes, &existing);
        assert_eq!(fresh, vec!["A1".to_string(), "B2".to_string()]);
        assert_eq!(duplicates, 3);

        let (fresh, duplicates) = split_new_codes(vec![], &existing);
        assert!(fresh.is_empty());
        assert_eq!(duplicates, 0);
    }

    #[test]
    fn test_filter_document_is_company_scoped() {
        let filter = VoucherFilter {
            status: Some(VoucherStatus::Available),
            provider: Some("GRAB".into()),
            billing_month: None,
        };
        assert_eq!(
            filter.to_document("IAS").unwrap(),
            doc! { "companyId": "IAS", "status": "available", "provider": "grab" }
        );
    }
}
