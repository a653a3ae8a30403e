//! Proximity alerts with per-level cooldown

use tracing::debug;

use super::alert_state::AlertStateStore;
use crate::shared::config::{AlertsCfg, RearmPolicy};
use crate::shared::types::{AlertKey, AlertRecord, SupportLevel, TokenKey};
use crate::shared::utils::relative_distance;

/// Dedup state of one `(token, level)` key at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Idle,
    Cooling { fired_at: i64 },
}

#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    pub alert_threshold: f64,
    pub cooldown_secs: u64,
    pub frequency_floor: usize,
    pub rearm_policy: RearmPolicy,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::from_config(&AlertsCfg::default())
    }
}

impl AlertEvaluator {
    pub fn from_config(cfg: &AlertsCfg) -> Self {
        Self {
            alert_threshold: cfg.alert_threshold,
            cooldown_secs: cfg.cooldown_secs,
            frequency_floor: cfg.frequency_floor,
            rearm_policy: cfg.rearm_policy,
        }
    }

    pub fn state_of(&self, state: &dyn AlertStateStore, key: &AlertKey, now: i64) -> AlertState {
        match state.get(key) {
            Some(fired_at) if now - fired_at < self.cooldown_secs as i64 => {
                AlertState::Cooling { fired_at }
            }
            _ => AlertState::Idle,
        }
    }

    /// Evaluate every significant level against the live price.
    ///
    /// Emitting an alert moves its key to `Cooling` immediately.
    pub fn evaluate(
        &self,
        token: &TokenKey,
        current_price: f64,
        levels: &[SupportLevel],
        state: &mut dyn AlertStateStore,
        now: i64,
    ) -> Vec<AlertRecord> {
        let mut alerts = Vec::new();

        for level in levels.iter().filter(|l| l.frequency > self.frequency_floor) {
            let key = AlertKey::new(token, level.price);
            let distance = relative_distance(current_price, level.price);

            if distance < self.alert_threshold {
                match self.state_of(state, &key, now) {
                    AlertState::Idle => {
                        state.set(key, now);
                        alerts.push(AlertRecord {
                            token: token.clone(),
                            level_price: level.price,
                            level_frequency: level.frequency,
                            current_price,
                            distance_percent: distance * 100.0,
                            timestamp: now,
                        });
                    }
                    AlertState::Cooling { fired_at } => {
                        debug!(%key, fired_at, "level in cooldown");
                    }
                }
            } else if self.rearm_policy == RearmPolicy::ClearOnDeparture
                && state.get(&key).is_some()
            {
                debug!(%key, distance, "price left level, re-arming");
                state.clear(&key);
            }
        }

        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alerts::alert_state::{Clock, InMemoryAlertStateStore, ManualClock};

    fn level(price: f64, frequency: usize) -> SupportLevel {
        SupportLevel { price, frequency }
    }

    #[test]
    fn test_frequency_at_floor_never_alerts() {
        let evaluator = AlertEvaluator::default();
        let mut state = InMemoryAlertStateStore::new();
        let alerts = evaluator.evaluate(
            &TokenKey::from("X"),
            100.0,
            &[level(100.0, 3)],
            &mut state,
            0,
        );
        assert!(alerts.is_empty());
        assert!(state.is_empty());
    }

    #[test]
    fn test_alert_fires_once_within_cooldown() {
        let evaluator = AlertEvaluator::default();
        let mut state = InMemoryAlertStateStore::new();
        let token = TokenKey::from("X");
        let levels = [level(100.0, 4)];

        let first = evaluator.evaluate(&token, 100.5, &levels, &mut state, 1000);
        assert_eq!(first.len(), 1);
        assert!((first[0].distance_percent - 0.5).abs() < 1e-9);
        assert_eq!(first[0].level_frequency, 4);

        let second = evaluator.evaluate(&token, 100.5, &levels, &mut state, 1900);
        assert!(second.is_empty());
    }

    #[test]
    fn test_rearms_after_cooldown() {
        let evaluator = AlertEvaluator::default();
        let mut state = InMemoryAlertStateStore::new();
        let clock = ManualClock::new(10_000);
        let token = TokenKey::from("X");
        let levels = [level(100.0, 5)];

        assert_eq!(
            evaluator.evaluate(&token, 99.6, &levels, &mut state, clock.now()).len(),
            1
        );
        clock.advance(evaluator.cooldown_secs as i64 - 1);
        assert!(evaluator
            .evaluate(&token, 99.6, &levels, &mut state, clock.now())
            .is_empty());
        clock.advance(1);
        assert_eq!(
            evaluator.evaluate(&token, 99.6, &levels, &mut state, clock.now()).len(),
            1
        );
    }

    #[test]
    fn test_distance_at_threshold_does_not_alert() {
        let evaluator = AlertEvaluator::default();
        let mut state = InMemoryAlertStateStore::new();
        let alerts =
            evaluator.evaluate(&TokenKey::from("X"), 102.0, &[level(100.0, 9)], &mut state, 0);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_cooldown_policy_keeps_key_on_departure() {
        let evaluator = AlertEvaluator::default();
        let mut state = InMemoryAlertStateStore::new();
        let token = TokenKey::from("X");
        let levels = [level(100.0, 5)];

        evaluator.evaluate(&token, 100.2, &levels, &mut state, 0);
        evaluator.evaluate(&token, 150.0, &levels, &mut state, 60);
        assert!(evaluator.evaluate(&token, 100.2, &levels, &mut state, 120).is_empty());
    }

    #[test]
    fn test_clear_on_departure_rearms_immediately() {
        let evaluator = AlertEvaluator {
            rearm_policy: RearmPolicy::ClearOnDeparture,
            ..AlertEvaluator::default()
        };
        let mut state = InMemoryAlertStateStore::new();
        let token = TokenKey::from("X");
        let levels = [level(100.0, 5)];

        assert_eq!(evaluator.evaluate(&token, 100.2, &levels, &mut state, 0).len(), 1);
        assert!(evaluator.evaluate(&token, 150.0, &levels, &mut state, 60).is_empty());
        assert!(state.is_empty());
        assert_eq!(evaluator.evaluate(&token, 100.2, &levels, &mut state, 120).len(), 1);
    }

    #[test]
    fn test_keys_are_independent_per_token() {
        let evaluator = AlertEvaluator::default();
        let mut state = InMemoryAlertStateStore::new();
        let levels = [level(100.0, 5)];

        assert_eq!(evaluator.evaluate(&TokenKey::from("A"), 100.1, &levels, &mut state, 0).len(), 1);
        assert_eq!(evaluator.evaluate(&TokenKey::from("B"), 100.1, &levels, &mut state, 0).len(), 1);
        assert_eq!(state.len(), 2);
    }
}
