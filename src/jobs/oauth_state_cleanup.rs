use crate::auth::oauth_state::STATE_STORE;
use tokio::time::{interval, Duration};

const CLEANUP_INTERVAL_SECS: u64 = 60;

/// Remove estados OAuth (PKCE) expirados a cada minuto
pub fn start_oauth_state_cleanup() {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            let removed = STATE_STORE.purge_expired();
            if removed > 0 {
                log::debug!("🧹 Purged {} expired OAuth state(s)", removed);
            }
        }
    });

    log::info!("✅ OAuth state cleanup started (every {}s)", CLEANUP_INTERVAL_SECS);
}
