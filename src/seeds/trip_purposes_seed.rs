use crate::database::{MongoDB, TRIP_PURPOSES};
use crate::models::{PurposeCategory, SeedResult, TripPurpose};
use crate::utils::error::ApiResult;
use mongodb::bson::doc;

/// (nome, categoria, descrição, exige aprovação)
const DEFAULT_PURPOSES: &[(&str, PurposeCategory, &str, bool)] = &[
    ("Airport Transfer", PurposeCategory::Business, "Pick up or drop off at airport", false),
    ("Client Meeting", PurposeCategory::Business, "Meeting with clients or partners", false),
    ("Site Visit", PurposeCategory::Business, "Visit project site or client location", false),
    ("Office Supplies", PurposeCategory::Operational, "Pick up office supplies or equipment", false),
    ("Bank/Post Office", PurposeCategory::Operational, "Banking or postal services", false),
    ("Document Delivery", PurposeCategory::Operational, "Deliver or collect documents", false),
    ("Training/Seminar", PurposeCategory::Business, "Attend training or seminar", false),
    ("Government Office Visit", PurposeCategory::Official, "Visit government offices for official business", true),
    ("Medical Emergency", PurposeCategory::Other, "Medical emergency or health-related", false),
    ("Business Lunch/Dinner", PurposeCategory::Business, "Business meal with clients or team", false),
];

pub fn default_trip_purposes(company_id: &str, now: i64) -> Vec<TripPurpose> {
    DEFAULT_PURPOSES
        .iter()
        .zip(1..)
        .map(|((name, category, description, requires_approval), order)| TripPurpose {
            id: None,
            purpose_id: format!("TP-{:03}", order),
            name: name.to_string(),
            category: *category,
            description: Some(description.to_string()),
            requires_approval: *requires_approval,
            is_active: true,
            sort_order: order,
            company_id: company_id.to_string(),
            created_at: now,
            updated_at: now,
            created_by: Some("system".to_string()),
            updated_by: Some("system".to_string()),
        })
        .collect()
}

/// Semeia os motivos padrão só se a empresa ainda não tem nenhum
pub async fn seed_trip_purposes(db: &MongoDB, company_id: &str) -> ApiResult<SeedResult> {
    let collection = db.collection::<TripPurpose>(TRIP_PURPOSES);
    let existing = collection.count_documents(doc! { "companyId": company_id }).await?;
    if existing > 0 {
        log::info!("📋 Trip purposes: {} already in DB for {}, skipping seed", existing, company_id);
        return Ok(SeedResult { success: true, message: "Already seeded".to_string(), count: existing });
    }

    let purposes = default_trip_purposes(company_id, chrono::Utc::now().timestamp_millis());
    let result = collection.insert_many(&purposes).await?;
    let count = result.inserted_ids.len() as u64;
    log::info!("📋 Trip purposes: seeded {} default purpose(s) for {}", count, company_id);
    Ok(SeedResult { success: true, message: "Trip purposes seeded successfully".to_string(), count })
}
