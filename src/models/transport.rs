use super::request::{Approval, Priority, RequestStatus, Requester};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    CompanyCar,
    Voucher,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct Location {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Pedido de transporte (carro da empresa ou voucher de ride-hailing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportationRequest {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub request_number: String,
    #[serde(rename = "type")]
    pub transport_type: TransportType,
    #[serde(flatten)]
    pub requester: Requester,

    pub pickup: Location,
    pub destination: Location,
    pub scheduled_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_time: Option<i64>,
    #[serde(default)]
    pub is_round_trip: bool,
    pub passenger_count: i32,
    #[serde(default)]
    pub passengers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_id: Option<String>,
    pub purpose: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_driver: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_should_wait: Option<bool>,

    pub status: RequestStatus,
    #[serde(flatten)]
    pub approval: Approval,

    // Atribuição (carro da empresa)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<i64>,

    // Voucher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_company_id: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransportRequest {
    #[serde(rename = "type")]
    pub transport_type: Option<TransportType>,
    pub pickup: Option<Location>,
    pub destination: Option<Location>,
    pub scheduled_time: Option<String>,
    pub return_time: Option<String>,
    pub is_round_trip: Option<bool>,
    pub passenger_count: Option<i32>,
    pub passengers: Option<Vec<String>>,
    pub purpose_id: Option<String>,
    pub purpose: Option<String>,
    pub priority: Option<Priority>,
    pub special_requirements: Option<String>,
    pub needs_driver: Option<bool>,
    pub driver_should_wait: Option<bool>,
    pub department_id: Option<String>,
}

/// Corpo do PATCH: status alvo + dados de atribuição
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransportRequest {
    pub status: Option<RequestStatus>,
    pub rejection_reason: Option<String>,
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    pub voucher_code: Option<String>,
    pub voucher_amount: Option<f64>,
    pub voucher_provider: Option<String>,
    pub transport_company_id: Option<String>,
}
