use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    #[default]
    Available,
    Used,
    Expired,
}

/// Voucher de ride-hailing (Gojek/Grab) importado de CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub voucher_code: String,
    pub transport_company_id: String,
    /// Sempre minúsculo ("gojek" | "grab")
    pub provider: String,
    #[serde(default)]
    pub status: VoucherStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    // Conciliação com a fatura do provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billed_at: Option<i64>,
    pub billing_month: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    pub imported_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    pub company_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub imported: usize,
    pub duplicates: usize,
    pub errors: Vec<String>,
    pub voucher_codes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherStats {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub expired: u64,
    pub by_provider: Vec<ProviderStats>,
}

/// Uma linha do `byProvider`, no formato do `$group` por provider
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProviderStats {
    #[serde(rename = "_id")]
    pub provider: String,
    pub total: u64,
    pub available: u64,
    pub used: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoucherExport {
    pub csv: String,
    pub filename: String,
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileVoucherRequest {
    pub actual_price: Option<f64>,
    pub invoice_number: Option<String>,
}
