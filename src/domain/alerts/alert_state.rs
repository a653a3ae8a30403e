//! Cross-cycle alert state and time source

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::shared::types::AlertKey;

/// Last-fired timestamps per alert key.
///
/// Owned by the orchestrator; only one task mutates it.
pub trait AlertStateStore: Send {
    fn get(&self, key: &AlertKey) -> Option<i64>;
    fn set(&mut self, key: AlertKey, fired_at: i64);
    fn clear(&mut self, key: &AlertKey);
    fn entries(&self) -> Vec<(AlertKey, i64)>;

    /// Drop keys whose cooldown has elapsed.
    fn prune_expired(&mut self, now: i64, cooldown_secs: u64) -> usize {
        let expired: Vec<AlertKey> = self
            .entries()
            .into_iter()
            .filter(|(_, fired_at)| now - fired_at >= cooldown_secs as i64)
            .map(|(key, _)| key)
            .collect();
        for key in &expired {
            self.clear(key);
        }
        expired.len()
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryAlertStateStore {
    last_fired: HashMap<AlertKey, i64>,
}

impl InMemoryAlertStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I: IntoIterator<Item = (AlertKey, i64)>>(entries: I) -> Self {
        Self {
            last_fired: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}

impl AlertStateStore for InMemoryAlertStateStore {
    fn get(&self, key: &AlertKey) -> Option<i64> {
        self.last_fired.get(key).copied()
    }

    fn set(&mut self, key: AlertKey, fired_at: i64) {
        self.last_fired.insert(key, fired_at);
    }

    fn clear(&mut self, key: &AlertKey) {
        self.last_fired.remove(key);
    }

    fn entries(&self) -> Vec<(AlertKey, i64)> {
        self.last_fired.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

/// Unix-seconds time source
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::TokenKey;

    #[test]
    fn test_prune_expired_keeps_cooling_keys() {
        let token = TokenKey::from("BONK");
        let old = AlertKey::new(&token, 1.0);
        let fresh = AlertKey::new(&token, 2.0);
        let mut store = InMemoryAlertStateStore::new();
        store.set(old.clone(), 0);
        store.set(fresh.clone(), 3000);

        let pruned = store.prune_expired(3600, 3600);

        assert_eq!(pruned, 1);
        assert_eq!(store.get(&old), None);
        assert_eq!(store.get(&fresh), Some(3000));
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(100);
        clock.advance(50);
        assert_eq!(clock.now(), 150);
        clock.set(10);
        assert_eq!(clock.now(), 10);
    }
}
