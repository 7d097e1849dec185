// Sync periódico com o diretório SCIM do SSO

use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::models::SyncStatus;
use crate::scim::{self, ScimClient, SyncOptions};
use tokio::time::{interval_at, Duration, Instant};

pub fn sync_interval(hours: u64) -> Option<Duration> {
    (hours > 0).then(|| Duration::from_secs(hours * 3600))
}

/// Inicia o scheduler; `SCIM_SYNC_INTERVAL_HOURS=0` desliga
pub fn start_scim_scheduler(db: MongoDB, client: ScimClient, config: AppConfig) {
    let Some(period) = sync_interval(config.scim_sync_interval_hours) else {
        log::info!("⏸️ Scheduled SCIM sync disabled (SCIM_SYNC_INTERVAL_HOURS=0)");
        return;
    };

    log::info!("📅 Starting SCIM sync scheduler (every {}h)", config.scim_sync_interval_hours);

    tokio::spawn(async move {
        // Primeiro tick só após um período completo
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            run_scheduled_sync(&db, &client, &config).await;
        }
    });
}

async fn run_scheduled_sync(db: &MongoDB, client: &ScimClient, config: &AppConfig) {
    if !client.is_configured().await {
        log::debug!("⏭️ Scheduled SCIM sync skipped: SCIM not configured");
        return;
    }

    log::info!("🔄 Running scheduled SCIM sync...");
    let options = SyncOptions {
        triggered_by: None,
        super_admin_email: &config.super_admin_email,
        default_company_id: &config.default_company_id,
    };

    match scim::perform_full_sync(db, client, options).await {
        Ok(history) if history.status == SyncStatus::Success => {
            log::debug!("Scheduled SCIM sync recorded ({} item error(s))", history.errors.len());
        }
        Ok(history) => {
            log::warn!("⚠️ Scheduled SCIM sync failed: {}", history.errors.join("; "));
        }
        Err(e) => log::error!("❌ Scheduled SCIM sync error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_interval() {
        assert_eq!(sync_interval(0), None);
        assert_eq!(sync_interval(6), Some(Duration::from_secs(21_600)));
    }
}
