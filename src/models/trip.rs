use super::request::RequestStatus;
use super::transport::{Location, TransportType};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_sort_order() -> i32 {
    999
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurposeCategory {
    Business,
    Operational,
    Official,
    Other,
}

/// Motivo de viagem selecionável no pedido de transporte (`TP-NNN` por empresa)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPurpose {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub purpose_id: String,
    pub name: String,
    pub category: PurposeCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_sort_order")]
    pub sort_order: i32,
    pub company_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripPurposeRequest {
    pub name: Option<String>,
    pub category: Option<PurposeCategory>,
    pub description: Option<String>,
    pub requires_approval: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTripPurposeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<PurposeCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_approval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

/// Resposta do seed: `Already seeded` quando a empresa já tem motivos
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeedResult {
    pub success: bool,
    pub message: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripEventType {
    Started,
    ArrivedPickup,
    PassengerOnboard,
    ArrivedDestination,
    Completed,
}

impl TripEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripEventType::Started => "started",
            TripEventType::ArrivedPickup => "arrived_pickup",
            TripEventType::PassengerOnboard => "passenger_onboard",
            TripEventType::ArrivedDestination => "arrived_destination",
            TripEventType::Completed => "completed",
        }
    }
}

/// Marco de uma viagem registrado pelo motorista (ATA/ATD)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripEvent {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub trip_id: String,
    pub request_id: String,
    pub driver_id: String,
    #[serde(default)]
    pub vehicle_id: String,
    pub event_type: TripEventType,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<i64>,
    pub actual_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<String>>,
    pub created_at: i64,
    pub updated_at: i64,
    pub created_by: String,
}

/// Corpo opcional de start/complete
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripActionRequest {
    pub location: Option<Location>,
    pub notes: Option<String>,
    pub photos: Option<Vec<String>>,
}

/// Viagem na lista do motorista; passageiro = solicitante
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedTrip {
    #[serde(rename = "_id")]
    pub id: String,
    pub request_number: String,
    #[serde(rename = "type")]
    pub transport_type: TransportType,
    pub status: RequestStatus,
    pub scheduled_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_time: Option<i64>,
    pub is_round_trip: bool,
    pub pickup: Location,
    pub destination: Location,
    pub passenger_name: String,
    pub passenger_email: String,
    pub passenger_count: i32,
    pub passengers: Vec<String>,
    pub purpose: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAssignments {
    pub date: String,
    pub driver_id: String,
    pub driver_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_vehicle_id: Option<String>,
    pub trips: Vec<AssignedTrip>,
    pub total_trips: usize,
}
