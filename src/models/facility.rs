use super::request::{Approval, Priority, RequestStatus, Requester};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
    Atk,
    Equipment,
    Furniture,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FacilityItem {
    pub item_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_price: Option<f64>,
}

/// Item como chega no request (campos opcionais para validar com detalhes)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityItemInput {
    pub item_name: Option<String>,
    pub item_code: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub estimated_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityRequest {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub request_number: String,
    #[serde(flatten)]
    pub requester: Requester,

    #[serde(rename = "type")]
    pub facility_type: FacilityType,
    pub category: String,
    pub items: Vec<FacilityItem>,
    pub delivery_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<i64>,
    #[serde(default)]
    pub urgency: Priority,
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub status: RequestStatus,
    #[serde(flatten)]
    pub approval: Approval,

    // Atendimento
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfilled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfilled_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_order_number: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFacilityRequest {
    #[serde(rename = "type")]
    pub facility_type: Option<FacilityType>,
    pub category: Option<String>,
    pub items: Option<Vec<FacilityItemInput>>,
    pub delivery_location: Option<String>,
    pub delivery_date: Option<String>,
    pub urgency: Option<Priority>,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub department_id: Option<String>,
}

/// PATCH: `status` para approve/reject/cancel, `action: "fulfill"` para atendimento
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFacilityRequest {
    pub status: Option<RequestStatus>,
    pub action: Option<String>,
    pub rejection_reason: Option<String>,
    pub actual_cost: Option<f64>,
    pub purchase_order_number: Option<String>,
}
