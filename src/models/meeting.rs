use super::request::{Approval, RequestStatus, Requester};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    Online,
    Offline,
    Hybrid,
}

impl MeetingType {
    pub fn needs_room(&self) -> bool {
        matches!(self, MeetingType::Offline | MeetingType::Hybrid)
    }

    pub fn needs_platform(&self) -> bool {
        matches!(self, MeetingType::Online | MeetingType::Hybrid)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MeetingPlatform {
    Zoom,
    GoogleMeet,
    Teams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CateringDetails {
    #[serde(rename = "type")]
    pub catering_type: String,
    pub item_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckinMethod {
    Qr,
    Manual,
}

/// Presença registrada no check-in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub method: CheckinMethod,
    pub is_external: bool,
    pub checked_in_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRequest {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub request_number: String,
    #[serde(flatten)]
    pub requester: Requester,

    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub meeting_type: MeetingType,
    pub start_time: i64,
    pub end_time: i64,
    /// Duração em minutos
    pub duration: i64,

    pub participant_count: i32,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_participants: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<MeetingPlatform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,

    #[serde(default)]
    pub required_facilities: Vec<String>,
    #[serde(default)]
    pub catering_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catering_details: Option<CateringDetails>,

    pub status: RequestStatus,
    #[serde(flatten)]
    pub approval: Approval,
    #[serde(default)]
    pub attendees: Vec<Attendee>,

    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub meeting_type: Option<MeetingType>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub participants: Option<Vec<String>>,
    pub participant_count: Option<i32>,
    pub external_participants: Option<i32>,
    pub room_id: Option<String>,
    pub location_id: Option<String>,
    pub platform: Option<MeetingPlatform>,
    pub meeting_link: Option<String>,
    pub required_facilities: Option<Vec<String>>,
    pub catering_required: Option<bool>,
    pub catering_details: Option<CateringDetails>,
    pub department_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeetingRequest {
    pub status: Option<RequestStatus>,
    pub rejection_reason: Option<String>,
    pub meeting_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    pub employee_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub method: Option<CheckinMethod>,
    #[serde(default)]
    pub is_external: bool,
}
