use crate::database::{MongoDB, DEVICES};
use crate::models::{Device, DeviceAssignment, DeviceStatus};
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::validation::now_ms;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;

const DEVICE_LIST_LIMIT: i64 = 100;

pub fn device_name_for(room_id: &str) -> String {
    format!("Tablet - {}", room_id)
}

fn validate_device_id(device_id: &str) -> ApiResult<&str> {
    let id = device_id.trim();
    if id.is_empty() {
        return Err(ApiError::validation("Device ID is required"));
    }
    Ok(id)
}

/// Upsert: dispositivo novo entra como `pending`
pub async fn heartbeat(db: &MongoDB, device_id: &str) -> ApiResult<Device> {
    let device_id = validate_device_id(device_id)?;
    let now = now_ms();
    db.collection::<Device>(DEVICES)
        .find_one_and_update(
            doc! { "deviceId": device_id },
            doc! {
                "$set": { "lastSeen": now, "updatedAt": now },
                "$setOnInsert": { "deviceId": device_id, "status": "pending", "createdAt": now },
            },
        )
        .upsert(true)
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::Internal("Device upsert returned no document".to_string()))
}

pub async fn get_assignment(db: &MongoDB, device_id: &str) -> ApiResult<DeviceAssignment> {
    let device = heartbeat(db, device_id).await?;
    Ok(DeviceAssignment::from(&device))
}

pub async fn assign_device(db: &MongoDB, device_id: &str, room_id: &str, assigned_by: &str) -> ApiResult<Device> {
    let device_id = validate_device_id(device_id)?;
    let room_id = room_id.trim();
    if room_id.is_empty() {
        return Err(ApiError::validation("roomId is required"));
    }

    let now = now_ms();
    let device = db
        .collection::<Device>(DEVICES)
        .find_one_and_update(
            doc! { "deviceId": device_id },
            doc! {
                "$set": {
                    "status": "active",
                    "roomId": room_id,
                    "deviceName": device_name_for(room_id),
                    "assignedAt": now,
                    "assignedBy": assigned_by,
                    "lastSeen": now,
                    "updatedAt": now,
                },
                "$setOnInsert": { "deviceId": device_id, "createdAt": now },
            },
        )
        .upsert(true)
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::Internal("Device upsert returned no document".to_string()))?;

    log::info!("📱 Device {} assigned to room {} by {}", device_id, room_id, assigned_by);
    Ok(device)
}

pub async fn unassign_device(db: &MongoDB, device_id: &str) -> ApiResult<()> {
    let device_id = validate_device_id(device_id)?;
    let result = db
        .collection::<Device>(DEVICES)
        .update_one(
            doc! { "deviceId": device_id },
            doc! {
                "$set": { "status": "pending", "updatedAt": now_ms() },
                "$unset": { "roomId": "", "deviceName": "", "assignedAt": "", "assignedBy": "" },
            },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(ApiError::NotFound("Device not found".to_string()));
    }
    log::info!("📱 Device {} unassigned", device_id);
    Ok(())
}

pub async fn list_devices(db: &MongoDB) -> ApiResult<Vec<Device>> {
    Ok(db
        .collection::<Device>(DEVICES)
        .find(doc! {})
        .sort(doc! { "lastSeen": -1 })
        .limit(DEVICE_LIST_LIMIT)
        .await?
        .try_collect()
        .await?)
}

pub fn grants_access(device: &Device, room_id: &str) -> bool {
    device.status == DeviceStatus::Active && device.room_id.as_deref() == Some(room_id)
}

/// Dispositivo ativo e vinculado à sala
pub async fn verify_device_access(db: &MongoDB, device_id: &str, room_id: &str) -> ApiResult<bool> {
    let device = db.collection::<Device>(DEVICES).find_one(doc! { "deviceId": device_id }).await?;
    Ok(device.is_some_and(|d| grants_access(&d, room_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(status: DeviceStatus, room: Option<&str>) -> Device {
        Device {
            id: None,
            device_id: "TAB-01".into(),
            status,
            room_id: room.map(String::from),
            device_name: room.map(device_name_for),
            assigned_at: None,
            assigned_by: None,
            last_seen: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_device_name() {
        assert_eq!(device_name_for("ROOM-A"), "Tablet - ROOM-A");
    }

    #[test]
    fn test_grants_access_requires_active_and_same_room() {
        assert!(grants_access(&device(DeviceStatus::Active, Some("ROOM-A")), "ROOM-A"));
        assert!(!grants_access(&device(DeviceStatus::Active, Some("ROOM-A")), "ROOM-B"));
        assert!(!grants_access(&device(DeviceStatus::Pending, Some("ROOM-A")), "ROOM-A"));
        assert!(!grants_access(&device(DeviceStatus::Active, None), "ROOM-A"));
    }

    #[test]
    fn test_assignment_view() {
        let view = DeviceAssignment::from(&device(DeviceStatus::Active, Some("ROOM-A")));
        assert!(view.assigned);
        assert_eq!(view.device_name.as_deref(), Some("Tablet - ROOM-A"));
        assert!(!DeviceAssignment::from(&device(DeviceStatus::Pending, None)).assigned);
    }

    #[test]
    fn test_blank_device_id_rejected() {
        assert!(validate_device_id("  ").is_err());
        assert_eq!(validate_device_id(" TAB-01 ").unwrap(), "TAB-01");
    }

    #[tokio::test]
    #[ignore]
    async fn test_heartbeat_creates_pending_device() {
        let db = MongoDB::new("mongodb://localhost:27017", "ofm_test").await.unwrap();
        let device = heartbeat(&db, "TAB-TEST").await.unwrap();
        assert_eq!(device.device_id, "TAB-TEST");
        assert!(device.last_seen > 0);
    }
}
