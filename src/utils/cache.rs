use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Valor único com prazo de validade (config SCIM, access token SCIM)
pub struct TtlCell<V: Clone> {
    slot: RwLock<Option<(V, Instant)>>,
}

impl<V: Clone> Default for TtlCell<V> {
    fn default() -> Self {
        Self { slot: RwLock::new(None) }
    }
}

impl<V: Clone> TtlCell<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<V> {
        self.get_at(Instant::now())
    }

    fn get_at(&self, now: Instant) -> Option<V> {
        let slot = self.slot.read().ok()?;
        match slot.as_ref() {
            Some((value, expires_at)) if now < *expires_at => Some(value.clone()),
            _ => None,
        }
    }

    pub fn set(&self, value: V, ttl: Duration) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some((value, Instant::now() + ttl));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_expires() {
        let cell = TtlCell::new();
        cell.set("token".to_string(), Duration::from_secs(60));
        assert_eq!(cell.get().as_deref(), Some("token"));
        assert_eq!(cell.get_at(Instant::now() + Duration::from_secs(61)), None);
    }

    #[test]
    fn test_clear() {
        let cell = TtlCell::new();
        cell.set(1u32, Duration::from_secs(60));
        cell.clear();
        assert_eq!(cell.get(), None);
    }
}
