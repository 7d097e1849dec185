use crate::api::response::Pagination;
use crate::database::{MongoDB, MEETING_REQUESTS, MEETING_ROOMS};
use crate::models::{CreateRoomRequest, MeetingRoom, RoomStatus, RoomType, UpdateRoomRequest};
use crate::services::crud;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::{now_ms, Validator};
use mongodb::bson::{doc, to_bson, Document};

#[derive(Debug, Default)]
pub struct RoomFilter {
    pub company_id: Option<String>,
    pub status: Option<RoomStatus>,
    pub location_id: Option<String>,
    pub room_type: Option<RoomType>,
}

impl RoomFilter {
    pub fn to_document(&self) -> ApiResult<Document> {
        let mut filter = Document::new();
        crud::insert_if_present(&mut filter, "companyId", self.company_id.as_deref());
        crud::insert_if_present(&mut filter, "locationId", self.location_id.as_deref());
        if let Some(status) = self.status {
            filter.insert("status", to_bson(&status)?);
        }
        if let Some(room_type) = self.room_type {
            filter.insert("roomType", to_bson(&room_type)?);
        }
        Ok(filter)
    }
}

pub async fn list_rooms(db: &MongoDB, filter: &RoomFilter, pagination: &Pagination) -> ApiResult<(Vec<MeetingRoom>, u64)> {
    crud::find_page(
        &db.collection::<MeetingRoom>(MEETING_ROOMS),
        filter.to_document()?,
        doc! { "createdAt": -1 },
        pagination,
    )
    .await
}

pub async fn get_room(db: &MongoDB, id: &str) -> ApiResult<MeetingRoom> {
    let oid = crud::parse_object_id(id, "room")?;
    crud::find_by_id(&db.collection::<MeetingRoom>(MEETING_ROOMS), oid, "Room not found").await
}

pub fn build_room(req: CreateRoomRequest, created_by: &str, now: i64) -> ApiResult<MeetingRoom> {
    Validator::new()
        .require_str("companyId", &req.company_id)
        .require_str("locationId", &req.location_id)
        .require_str("roomName", &req.room_name)
        .require("capacity", &req.capacity)
        .check(req.capacity.map_or(true, |c| c > 0), "capacity", "capacity must be greater than 0")
        .finish()?;

    Ok(MeetingRoom {
        id: None,
        room_id: req
            .room_id
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| crud::timestamp_id("ROOM", now)),
        company_id: req.company_id.unwrap_or_default(),
        location_id: req.location_id.unwrap_or_default(),
        room_name: req.room_name.unwrap_or_default(),
        room_number: req.room_number.filter(|n| !n.is_empty()),
        floor: req.floor.filter(|f| !f.is_empty()),
        capacity: req.capacity.unwrap_or_default(),
        room_type: req.room_type.unwrap_or_default(),
        facilities: req.facilities.unwrap_or_default(),
        has_video_conference: req.has_video_conference.unwrap_or(false),
        tablet_device_id: req.tablet_device_id.filter(|t| !t.is_empty()),
        status: req.status.unwrap_or_default(),
        image_url: req.image_url.filter(|u| !u.is_empty()),
        created_at: now,
        updated_at: now,
        created_by: Some(created_by.to_string()),
        updated_by: None,
    })
}

pub async fn create_room(db: &MongoDB, req: CreateRoomRequest, created_by: &str) -> ApiResult<MeetingRoom> {
    let mut room = build_room(req, created_by, now_ms())?;
    let rooms = db.collection::<MeetingRoom>(MEETING_ROOMS);

    if rooms.find_one(doc! { "roomId": &room.room_id }).await?.is_some() {
        return Err(ApiError::validation("Room with this ID already exists"));
    }

    let result = rooms.insert_one(&room).await?;
    room.id = result.inserted_id.as_object_id();
    log::info!("✅ Room created: {} ({})", room.room_id, room.room_name);
    Ok(room)
}

pub async fn update_room(db: &MongoDB, id: &str, req: UpdateRoomRequest, updated_by: &str) -> ApiResult<MeetingRoom> {
    let oid = crud::parse_object_id(id, "room")?;
    if req.capacity.is_some_and(|c| c <= 0) {
        return Err(ApiError::validation("capacity must be greater than 0"));
    }

    let rooms = db.collection::<MeetingRoom>(MEETING_ROOMS);
    crud::find_by_id(&rooms, oid, "Room not found").await?;

    let set = crud::set_document(&req, Some(updated_by), now_ms())?;
    rooms.update_one(doc! { "_id": oid }, doc! { "$set": set }).await?;
    crud::find_by_id(&rooms, oid, "Room not found").await
}

/// Recusado enquanto houver reuniões pendentes/aprovadas na sala
pub async fn delete_room(db: &MongoDB, id: &str) -> ApiResult<()> {
    let oid = crud::parse_object_id(id, "room")?;
    let rooms = db.collection::<MeetingRoom>(MEETING_ROOMS);
    let existing = crud::find_by_id(&rooms, oid, "Room not found").await?;

    let booked = db
        .collection::<Document>(MEETING_REQUESTS)
        .count_documents(doc! { "roomId": &existing.room_id, "status": { "$in": ["pending", "approved"] } })
        .await?;
    if booked > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete room with {} open meeting(s). Set it to inactive instead.",
            booked
        )));
    }

    rooms.delete_one(doc! { "_id": oid }).await?;
    log::info!("🗑️ Room deleted: {}", existing.room_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateRoomRequest {
        CreateRoomRequest {
            company_id: Some("IAS".into()),
            location_id: Some("LOC-DPS".into()),
            room_name: Some("Bali Room".into()),
            capacity: Some(12),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_room_defaults() {
        let room = build_room(request(), "ADM1", 1_700_000_000_000).unwrap();
        assert_eq!(room.room_id, "ROOM-1700000000000");
        assert_eq!(room.status, RoomStatus::Available);
        assert_eq!(room.room_type, RoomType::Meeting);
        assert!(!room.has_video_conference);
        assert!(room.facilities.is_empty());
        assert_eq!(room.created_by.as_deref(), Some("ADM1"));
    }

    #[test]
    fn test_build_room_requires_fields() {
        let err = build_room(CreateRoomRequest::default(), "ADM1", 0).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let zero = CreateRoomRequest { capacity: Some(0), ..request() };
        assert!(build_room(zero, "ADM1", 0).is_err());
    }

    #[test]
    fn test_filter_document() {
        let filter = RoomFilter {
            company_id: Some("IAS".into()),
            status: Some(RoomStatus::Maintenance),
            location_id: None,
            room_type: Some(RoomType::Boardroom),
        };
        assert_eq!(
            filter.to_document().unwrap(),
            doc! { "companyId": "IAS", "status": "maintenance", "roomType": "boardroom" }
        );
    }
}
