use crate::database::{MongoDB, SETTINGS};
use crate::models::{Setting, SettingDefault, DEFAULT_SETTINGS};
use mongodb::bson::doc;

fn setting_from_default(default: &SettingDefault, now: i64) -> Setting {
    Setting {
        id: None,
        key: default.key.to_string(),
        value: default.value.to_string(),
        category: default.category,
        label: default.label.to_string(),
        description: Some(default.description.to_string()),
        is_secret: default.is_secret,
        is_required: default.is_required,
        updated_by: None,
        created_at: now,
        updated_at: now,
    }
}

/// Cria os settings padrão que ainda não existem; valores já gravados ficam intactos
pub async fn seed_default_settings(db: &MongoDB) {
    let collection = db.collection::<Setting>(SETTINGS);
    let now = chrono::Utc::now().timestamp_millis();
    let mut inserted = 0;

    for default in DEFAULT_SETTINGS {
        match collection.count_documents(doc! { "key": default.key }).await {
            Ok(0) => {}
            Ok(_) => continue,
            Err(e) => {
                log::error!("   ❌ Failed to check setting {}: {}", default.key, e);
                continue;
            }
        }

        match collection.insert_one(setting_from_default(default, now)).await {
            Ok(_) => inserted += 1,
            Err(e) => log::error!("   ❌ Failed to seed setting {}: {}", default.key, e),
        }
    }

    if inserted == 0 {
        log::info!("📋 Settings: all {} defaults already in DB, skipping seed", DEFAULT_SETTINGS.len());
    } else {
        log::info!("📋 Settings: seeded {} default setting(s)", inserted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SettingCategory, SCIM_CLIENT_SECRET};

    #[test]
    fn test_default_keys_are_unique() {
        let mut keys: Vec<&str> = DEFAULT_SETTINGS.iter().map(|d| d.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), DEFAULT_SETTINGS.len());
    }

    #[test]
    fn test_setting_from_default_keeps_flags() {
        let default = DEFAULT_SETTINGS
            .iter()
            .find(|d| d.key == SCIM_CLIENT_SECRET)
            .unwrap();
        let setting = setting_from_default(default, 42);
        assert!(setting.is_secret);
        assert_eq!(setting.category, SettingCategory::Scim);
        assert_eq!(setting.value, "");
        assert_eq!(setting.created_at, 42);
    }
}
