use crate::api::response::Pagination;
use crate::database::{MongoDB, MEETING_REQUESTS};
use crate::middleware::AuthUser;
use crate::models::{
    check_transition, Approval, Attendee, CheckinRequest, CreateMeetingRequest, MeetingRequest,
    MeetingType, RequestStatus, UpdateMeetingRequest,
};
use crate::services::{crud, device_service, user_service};
use crate::utils::error::{ApiError, ApiResult, FieldError};
use crate::utils::validation::{now_ms, parse_datetime_ms, Validator};
use chrono::{NaiveDate, Utc};
use mongodb::bson::{doc, to_bson, Bson, Document};
use serde::Serialize;

pub const MAX_DURATION_MINUTES: i64 = 480;
const CHECKIN_OPENS_BEFORE_MS: i64 = 15 * 60 * 1000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Default)]
pub struct MeetingFilter {
    pub status: Option<RequestStatus>,
    pub meeting_type: Option<MeetingType>,
    pub room_id: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

impl MeetingFilter {
    /// Não-admin: reuniões que organiza ou em que foi convidado (por email)
    pub fn to_document(&self, user: &AuthUser) -> ApiResult<Document> {
        let mut filter = Document::new();
        if !user.is_admin() {
            filter.insert(
                "$or",
                vec![
                    Bson::Document(doc! { "userId": &user.user_id }),
                    Bson::Document(doc! { "participants": &user.email }),
                ],
            );
        }
        if let Some(status) = self.status {
            filter.insert("status", to_bson(&status)?);
        }
        if let Some(t) = self.meeting_type {
            filter.insert("type", to_bson(&t)?);
        }
        crud::insert_if_present(&mut filter, "roomId", self.room_id.as_deref());
        if let Some(range) = crud::date_range(self.start_date, self.end_date) {
            filter.insert("startTime", range);
        }
        Ok(filter)
    }
}

fn invalid_date(field: &str) -> ApiError {
    ApiError::validation_failed(vec![FieldError::new(field, "Invalid date format")])
}

pub fn build_meeting_request(
    user: &AuthUser,
    req: CreateMeetingRequest,
    default_company_id: &str,
    request_number: String,
    now: i64,
) -> ApiResult<MeetingRequest> {
    Validator::new()
        .require_str("title", &req.title)
        .require("type", &req.meeting_type)
        .require_str("startTime", &req.start_time)
        .require_str("endTime", &req.end_time)
        .require("participants", &req.participants)
        .finish()?;

    let start_time = req.start_time.as_deref().and_then(parse_datetime_ms).ok_or_else(|| invalid_date("startTime"))?;
    let end_time = req.end_time.as_deref().and_then(parse_datetime_ms).ok_or_else(|| invalid_date("endTime"))?;
    let Some(meeting_type) = req.meeting_type else {
        return Err(ApiError::validation("Validation failed"));
    };

    let duration = (end_time - start_time) / 60_000;
    let room_id = req.room_id.filter(|r| !r.trim().is_empty());
    Validator::new()
        .check(end_time > start_time, "endTime", "End time must be after start time")
        .check(
            duration <= MAX_DURATION_MINUTES,
            "endTime",
            "Meeting duration cannot exceed 8 hours",
        )
        .check(
            !meeting_type.needs_room() || room_id.is_some(),
            "roomId",
            "Room is required for offline and hybrid meetings",
        )
        .check(
            !meeting_type.needs_platform() || req.platform.is_some(),
            "platform",
            "Platform is required for online and hybrid meetings",
        )
        .finish()?;

    let participants = req.participants.unwrap_or_default();
    Ok(MeetingRequest {
        id: None,
        request_number,
        requester: crud::requester_for(user, req.department_id, default_company_id),
        title: req.title.unwrap_or_default().trim().to_string(),
        description: req.description,
        meeting_type,
        start_time,
        end_time,
        duration,
        participant_count: req.participant_count.unwrap_or(participants.len() as i32),
        participants,
        external_participants: req.external_participants,
        room_id,
        location_id: req.location_id,
        platform: req.platform,
        meeting_link: req.meeting_link,
        required_facilities: req.required_facilities.unwrap_or_default(),
        catering_required: req.catering_required.unwrap_or(false),
        catering_details: req.catering_details,
        status: RequestStatus::Pending,
        approval: Approval::default(),
        attendees: Vec::new(),
        created_at: now,
        updated_at: now,
        created_by: Some(user.user_id.clone()),
        updated_by: None,
    })
}

/// Reuniões ativas da sala que se sobrepõem a [start, end)
pub fn overlap_filter(room_id: &str, start: i64, end: i64) -> Document {
    doc! {
        "roomId": room_id,
        "status": { "$in": ["pending", "approved"] },
        "startTime": { "$lt": end },
        "endTime": { "$gt": start },
    }
}

pub async fn create_meeting_request(
    db: &MongoDB,
    user: &AuthUser,
    req: CreateMeetingRequest,
    default_company_id: &str,
) -> ApiResult<MeetingRequest> {
    let number = crud::request_number("MR", Utc::now())?;
    let mut meeting = build_meeting_request(user, req, default_company_id, number, now_ms())?;
    let meetings = db.collection::<MeetingRequest>(MEETING_REQUESTS);

    if let Some(room_id) = meeting.room_id.as_deref() {
        let clash = meetings
            .find_one(overlap_filter(room_id, meeting.start_time, meeting.end_time))
            .await?;
        if let Some(clash) = clash {
            return Err(ApiError::Conflict(format!(
                "Room is already booked for this time ({})",
                clash.request_number
            )));
        }
    }

    let result = meetings.insert_one(&meeting).await?;
    meeting.id = result.inserted_id.as_object_id();
    log::info!("✅ Meeting {} booked by {}", meeting.request_number, user.user_id);
    Ok(meeting)
}

pub async fn list_meeting_requests(
    db: &MongoDB,
    user: &AuthUser,
    filter: &MeetingFilter,
    pagination: &Pagination,
) -> ApiResult<(Vec<MeetingRequest>, u64)> {
    crud::find_page(
        &db.collection::<MeetingRequest>(MEETING_REQUESTS),
        filter.to_document(user)?,
        doc! { "startTime": 1 },
        pagination,
    )
    .await
}

fn can_view(meeting: &MeetingRequest, user: &AuthUser) -> bool {
    user.is_admin() || meeting.requester.user_id == user.user_id || meeting.participants.contains(&user.email)
}

pub async fn get_meeting_request(db: &MongoDB, user: &AuthUser, id: &str) -> ApiResult<MeetingRequest> {
    let oid = crud::parse_object_id(id, "meeting")?;
    let meeting = crud::find_by_id(&db.collection::<MeetingRequest>(MEETING_REQUESTS), oid, "Meeting not found").await?;
    if !can_view(&meeting, user) {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(meeting)
}

pub async fn update_meeting_request(
    db: &MongoDB,
    user: &AuthUser,
    id: &str,
    req: UpdateMeetingRequest,
) -> ApiResult<MeetingRequest> {
    let oid = crud::parse_object_id(id, "meeting")?;
    let meetings = db.collection::<MeetingRequest>(MEETING_REQUESTS);
    let existing = crud::find_by_id(&meetings, oid, "Meeting not found").await?;

    let mut set = match req.status {
        Some(target) => {
            check_transition(existing.status, target, user.is_admin(), existing.requester.user_id == user.user_id)?;
            crud::status_set(target, user, req.rejection_reason.as_deref(), now_ms())
        }
        None => {
            // Só o link pode mudar sem transição de status
            if existing.requester.user_id != user.user_id && !user.is_admin() {
                return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
            }
            doc! { "updatedAt": now_ms(), "updatedBy": &user.user_id }
        }
    };
    crud::insert_if_present(&mut set, "meetingLink", req.meeting_link.as_deref());

    crud::guarded_status_update(&meetings, oid, existing.status, set).await?;
    log::info!("✅ Meeting {} updated by {}", existing.request_number, user.user_id);
    crud::find_by_id(&meetings, oid, "Meeting not found").await
}

pub async fn cancel_meeting_request(db: &MongoDB, user: &AuthUser, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "meeting")?;
    let meetings = db.collection::<MeetingRequest>(MEETING_REQUESTS);
    let existing = crud::find_by_id(&meetings, oid, "Meeting not found").await?;

    if existing.requester.user_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    check_transition(existing.status, RequestStatus::Cancelled, user.is_admin(), true)?;

    let set = crud::status_set(RequestStatus::Cancelled, user, None, now_ms());
    crud::guarded_status_update(&meetings, oid, existing.status, set).await?;
    log::info!("🗑️ Meeting {} cancelled by {}", existing.request_number, user.user_id);
    Ok(())
}

pub fn check_window(meeting: &MeetingRequest, now: i64) -> ApiResult<()> {
    if now < meeting.start_time - CHECKIN_OPENS_BEFORE_MS {
        return Err(ApiError::BadRequest(
            "Check-in window not yet open. You can check in 15 minutes before the meeting.".to_string(),
        ));
    }
    if now > meeting.end_time {
        return Err(ApiError::BadRequest("Meeting has already ended".to_string()));
    }
    Ok(())
}

pub fn already_checked_in(meeting: &MeetingRequest, candidate: &Attendee) -> bool {
    meeting.attendees.iter().any(|a| match (candidate.is_external, a.is_external) {
        (true, true) => a.name.eq_ignore_ascii_case(&candidate.name),
        (false, false) => a.employee_id == candidate.employee_id,
        _ => false,
    })
}

/// Check-in pelo tablet da sala (QR ou manual)
pub async fn checkin(db: &MongoDB, id: &str, req: CheckinRequest) -> ApiResult<Attendee> {
    let oid = crud::parse_object_id(id, "meeting")?;
    let Some(method) = req.method else {
        return Err(ApiError::BadRequest("Invalid method. Must be \"qr\" or \"manual\"".to_string()));
    };

    let meetings = db.collection::<MeetingRequest>(MEETING_REQUESTS);
    let meeting = crud::find_by_id(&meetings, oid, "Meeting not found").await?;
    let now = now_ms();
    check_window(&meeting, now)?;

    let attendee = if req.is_external {
        let name = req.name.as_deref().map(str::trim).unwrap_or("");
        if name.is_empty() {
            return Err(ApiError::BadRequest("Name is required for external participants".to_string()));
        }
        Attendee {
            employee_id: None,
            name: name.to_string(),
            email: req.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
            method,
            is_external: true,
            checked_in_at: now,
        }
    } else {
        let employee_id = req.employee_id.as_deref().map(str::trim).unwrap_or("");
        if employee_id.is_empty() {
            return Err(ApiError::BadRequest("Employee ID is required for internal participants".to_string()));
        }
        let employee = user_service::find_by_user_id(db, employee_id)
            .await?
            .ok_or_else(|| ApiError::BadRequest("Employee not found".to_string()))?;
        Attendee {
            employee_id: Some(employee_id.to_string()),
            name: employee.display_name().unwrap_or_else(|| employee.username.clone()),
            email: Some(employee.email),
            method,
            is_external: false,
            checked_in_at: now,
        }
    };

    if already_checked_in(&meeting, &attendee) {
        return Err(ApiError::Conflict("Already checked in".to_string()));
    }

    meetings
        .update_one(
            doc! { "_id": oid },
            doc! { "$push": { "attendees": to_bson(&attendee)? }, "$set": { "updatedAt": now } },
        )
        .await?;
    log::info!(
        "✅ Check-in {} ({:?}) on meeting {}",
        attendee.name,
        method,
        meeting.request_number
    );
    Ok(attendee)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingAttendance {
    pub meeting_id: String,
    pub meeting_title: String,
    pub start_time: i64,
    pub end_time: i64,
    pub total_invited: usize,
    pub total_checked_in: usize,
    pub attendance_rate: f64,
    pub attendees: Vec<Attendee>,
}

impl MeetingAttendance {
    pub fn from_meeting(id: &str, meeting: MeetingRequest) -> Self {
        // Organizador conta como convidado
        let total_invited = meeting.participants.len() + 1;
        let total_checked_in = meeting.attendees.len();
        let rate = total_checked_in as f64 / total_invited as f64 * 100.0;
        MeetingAttendance {
            meeting_id: id.to_string(),
            meeting_title: meeting.title,
            start_time: meeting.start_time,
            end_time: meeting.end_time,
            total_invited,
            total_checked_in,
            attendance_rate: (rate * 100.0).round() / 100.0,
            attendees: meeting.attendees,
        }
    }
}

pub async fn attendance(db: &MongoDB, id: &str) -> ApiResult<MeetingAttendance> {
    let oid = crud::parse_object_id(id, "meeting")?;
    let meeting = crud::find_by_id(&db.collection::<MeetingRequest>(MEETING_REQUESTS), oid, "Meeting not found").await?;
    Ok(MeetingAttendance::from_meeting(id, meeting))
}

/// `[00:00, 24:00)` UTC do dia `YYYY-MM-DD`
pub fn day_bounds(date: &str) -> ApiResult<(i64, i64)> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::validation("Invalid date format. Use YYYY-MM-DD"))?;
    let start = day
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc().timestamp_millis())
        .ok_or_else(|| ApiError::validation("Invalid date"))?;
    Ok((start, start + DAY_MS))
}

/// Agenda da sala no dia (usada pelos tablets)
pub async fn room_schedule(
    db: &MongoDB,
    room_id: &str,
    date: Option<&str>,
    device_id: Option<&str>,
) -> ApiResult<Vec<MeetingRequest>> {
    if let Some(device_id) = device_id.filter(|d| !d.is_empty()) {
        if !device_service::verify_device_access(db, device_id, room_id).await? {
            return Err(ApiError::Forbidden("Device is not authorized for this room".to_string()));
        }
    }

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let (start, end) = day_bounds(date.filter(|d| !d.is_empty()).unwrap_or(&today))?;
    crud::find_all(
        &db.collection::<MeetingRequest>(MEETING_REQUESTS),
        doc! {
            "roomId": room_id,
            "status": { "$nin": ["cancelled", "rejected"] },
            "startTime": { "$gte": start, "$lt": end },
        },
        doc! { "startTime": 1 },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckinMethod, MeetingPlatform};

    fn user(roles: &[&str]) -> AuthUser {
        AuthUser {
            user_id: "E001".into(),
            email: "budi@ias.co.id".into(),
            name: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            company_id: Some("IAS".into()),
            company_access: vec![],
        }
    }

    fn body(meeting_type: MeetingType) -> CreateMeetingRequest {
        CreateMeetingRequest {
            title: Some("Weekly sync".into()),
            meeting_type: Some(meeting_type),
            start_time: Some("2025-10-16T09:00:00Z".into()),
            end_time: Some("2025-10-16T10:30:00Z".into()),
            participants: Some(vec!["ani@ias.co.id".into(), "joko@ias.co.id".into()]),
            room_id: Some("ROOM-A".into()),
            platform: Some(MeetingPlatform::Zoom),
            ..Default::default()
        }
    }

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation { details, .. } => details.into_iter().map(|d| d.field).collect(),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    fn meeting(start: i64, end: i64) -> MeetingRequest {
        build_meeting_request(&user(&[]), body(MeetingType::Offline), "IAS", "MR-1".into(), 0)
            .map(|mut m| {
                m.start_time = start;
                m.end_time = end;
                m
            })
            .unwrap()
    }

    #[test]
    fn test_build_computes_duration_and_count() {
        let m = build_meeting_request(&user(&[]), body(MeetingType::Hybrid), "IAS", "MR-1".into(), 0).unwrap();
        assert_eq!(m.duration, 90);
        assert_eq!(m.participant_count, 2);
        assert_eq!(m.status, RequestStatus::Pending);
    }

    #[test]
    fn test_end_must_follow_start() {
        let mut b = body(MeetingType::Online);
        b.end_time = Some("2025-10-16T08:00:00Z".into());
        let err = build_meeting_request(&user(&[]), b, "IAS", "x".into(), 0).unwrap_err();
        assert_eq!(fields(err), vec!["endTime"]);
    }

    #[test]
    fn test_duration_limit() {
        let mut b = body(MeetingType::Online);
        b.end_time = Some("2025-10-16T17:00:00Z".into());
        assert!(build_meeting_request(&user(&[]), b, "IAS", "x".into(), 0).is_ok());

        let mut b = body(MeetingType::Online);
        b.end_time = Some("2025-10-16T17:01:00Z".into());
        let err = build_meeting_request(&user(&[]), b, "IAS", "x".into(), 0).unwrap_err();
        assert_eq!(fields(err), vec!["endTime"]);
    }

    #[test]
    fn test_room_and_platform_rules() {
        let mut b = body(MeetingType::Offline);
        b.room_id = None;
        b.platform = None;
        let err = build_meeting_request(&user(&[]), b, "IAS", "x".into(), 0).unwrap_err();
        assert_eq!(fields(err), vec!["roomId"]);

        let mut b = body(MeetingType::Hybrid);
        b.room_id = Some(" ".into());
        b.platform = None;
        let err = build_meeting_request(&user(&[]), b, "IAS", "x".into(), 0).unwrap_err();
        assert_eq!(fields(err), vec!["roomId", "platform"]);

        let mut b = body(MeetingType::Online);
        b.room_id = None;
        assert!(build_meeting_request(&user(&[]), b, "IAS", "x".into(), 0).is_ok());
    }

    #[test]
    fn test_overlap_filter() {
        let filter = overlap_filter("ROOM-A", 100, 200);
        assert_eq!(filter.get_document("startTime").unwrap().get_i64("$lt").unwrap(), 200);
        assert_eq!(filter.get_document("endTime").unwrap().get_i64("$gt").unwrap(), 100);
    }

    #[test]
    fn test_non_admin_list_filter() {
        let doc = MeetingFilter::default().to_document(&user(&["employee"])).unwrap();
        assert_eq!(doc.get_array("$or").unwrap().len(), 2);

        let doc = MeetingFilter { room_id: Some("ROOM-A".into()), ..Default::default() }
            .to_document(&user(&["admin"]))
            .unwrap();
        assert_eq!(doc, doc! { "roomId": "ROOM-A" });
    }

    #[test]
    fn test_checkin_window() {
        let m = meeting(60 * 60_000, 2 * 60 * 60_000);
        assert!(check_window(&m, 45 * 60_000).is_ok());
        assert!(check_window(&m, 2 * 60 * 60_000).is_ok());
        assert_eq!(check_window(&m, 44 * 60_000).unwrap_err().code(), "BAD_REQUEST");
        assert_eq!(check_window(&m, 2 * 60 * 60_000 + 1).unwrap_err().to_string(), "Meeting has already ended");
    }

    #[test]
    fn test_duplicate_checkin_detection() {
        let mut m = meeting(0, 1);
        m.attendees.push(Attendee {
            employee_id: None,
            name: "Guest One".into(),
            email: None,
            method: CheckinMethod::Manual,
            is_external: true,
            checked_in_at: 0,
        });
        m.attendees.push(Attendee {
            employee_id: Some("E002".into()),
            name: "Ani".into(),
            email: None,
            method: CheckinMethod::Qr,
            is_external: false,
            checked_in_at: 0,
        });

        let external = Attendee {
            employee_id: None,
            name: "guest one".into(),
            email: None,
            method: CheckinMethod::Manual,
            is_external: true,
            checked_in_at: 1,
        };
        assert!(already_checked_in(&m, &external));

        let internal = Attendee { employee_id: Some("E003".into()), is_external: false, ..external };
        assert!(!already_checked_in(&m, &internal));
    }

    #[test]
    fn test_attendance_rate() {
        let mut m = meeting(0, 1);
        m.attendees.push(Attendee {
            employee_id: Some("E002".into()),
            name: "Ani".into(),
            email: None,
            method: CheckinMethod::Qr,
            is_external: false,
            checked_in_at: 0,
        });
        let report = MeetingAttendance::from_meeting("abc", m);
        assert_eq!(report.total_invited, 3);
        assert_eq!(report.total_checked_in, 1);
        assert_eq!(report.attendance_rate, 33.33);
    }

    #[test]
    fn test_day_bounds() {
        let (start, end) = day_bounds("2025-10-16").unwrap();
        assert_eq!(start, 1_760_572_800_000);
        assert_eq!(end - start, DAY_MS);
        assert!(day_bounds("16/10/2025").is_err());
    }
}
