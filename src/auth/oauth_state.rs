use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Estados PKCE pendentes expiram após 10 minutos
pub const STATE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct PendingState {
    pub state: String,
    pub code_verifier: String,
    pub redirect_path: String,
    pub created_at: Instant,
}

/// Store em memória do processo (instância única, não sobrevive a restart)
#[derive(Default)]
pub struct OAuthStateStore {
    entries: Mutex<HashMap<String, PendingState>>,
}

lazy_static::lazy_static! {
    pub static ref STATE_STORE: OAuthStateStore = OAuthStateStore::default();
}

impl OAuthStateStore {
    /// Mutex envenenado: loga e segue com o mapa (cada escrita é um insert/remove inteiro)
    fn entries(&self) -> MutexGuard<'_, HashMap<String, PendingState>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            log::error!("❌ OAuth state store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn save(&self, state: &str, code_verifier: &str, redirect_path: &str) {
        self.save_at(state, code_verifier, redirect_path, Instant::now());
    }

    fn save_at(&self, state: &str, code_verifier: &str, redirect_path: &str, now: Instant) {
        self.entries().insert(
            state.to_string(),
            PendingState {
                state: state.to_string(),
                code_verifier: code_verifier.to_string(),
                redirect_path: redirect_path.to_string(),
                created_at: now,
            },
        );
    }

    /// Consome o estado: só pode ser usado uma vez
    pub fn take(&self, state: &str) -> Option<PendingState> {
        self.take_at(state, Instant::now())
    }

    fn take_at(&self, state: &str, now: Instant) -> Option<PendingState> {
        let entry = self.entries().remove(state)?;
        if now.duration_since(entry.created_at) > STATE_TTL {
            log::warn!("⚠️ OAuth state expired");
            return None;
        }
        Some(entry)
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, e| now.duration_since(e.created_at) <= STATE_TTL);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }
}
