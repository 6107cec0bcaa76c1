//! Alert cooldown gate

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// State of an alert kind
#[derive(Debug, Clone)]
pub struct GateState {
    /// Last time this alert was fired
    pub last_fired: Instant,
    /// Number of times fired
    pub fire_count: usize,
}

/// Per-kind cooldown, so a risk that persists across cycles is announced
/// once per cooldown window instead of once per frame
pub struct AlertGate<K> {
    cooldown: Duration,
    states: HashMap<K, GateState>,
    suppressed: u64,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> AlertGate<K> {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            states: HashMap::new(),
            suppressed: 0,
        }
    }

    /// Check whether `key` is outside its cooldown window at `now`
    pub fn should_fire(&mut self, key: &K, now: Instant) -> bool {
        if let Some(state) = self.states.get(key) {
            if now.saturating_duration_since(state.last_fired) < self.cooldown {
                debug!("Alert {:?} suppressed: in cooldown period", key);
                self.suppressed += 1;
                return false;
            }
        }
        true
    }

    /// Record that an alert was fired
    pub fn record_fire(&mut self, key: K, now: Instant) {
        let state = self.states.entry(key.clone()).or_insert(GateState {
            last_fired: now,
            fire_count: 0,
        });
        state.last_fired = now;
        state.fire_count += 1;

        info!("Alert recorded: {:?} (count: {})", key, state.fire_count);
    }

    /// Forget the cooldown of `key`; its next assertion fires immediately
    pub fn release(&mut self, key: &K) {
        if self.states.remove(key).is_some() {
            debug!("Alert {:?} released", key);
        }
    }

    pub fn fire_count(&self, key: &K) -> usize {
        self.states.get(key).map_or(0, |s| s.fire_count)
    }

    pub fn state(&self, key: &K) -> Option<&GateState> {
        self.states.get(key)
    }

    /// Alerts suppressed by the cooldown so far
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Clear all alert states
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SoundKind;

    fn fire<K: Eq + Hash + Clone + std::fmt::Debug>(gate: &mut AlertGate<K>, key: K, now: Instant) -> bool {
        if !gate.should_fire(&key, now) {
            return false;
        }
        gate.record_fire(key, now);
        true
    }

    #[test]
    fn test_first_alert_fires() {
        let mut gate = AlertGate::new(Duration::from_secs(5));
        assert!(gate.should_fire(&SoundKind::Collision, Instant::now()));
        assert_eq!(gate.fire_count(&SoundKind::Collision), 0);
    }

    #[test]
    fn test_deduplication() {
        let mut gate = AlertGate::new(Duration::from_secs(5));
        let t0 = Instant::now();

        assert!(fire(&mut gate, SoundKind::SpeedLimit, t0));
        assert!(!fire(&mut gate, SoundKind::SpeedLimit, t0 + Duration::from_secs(1)));
        assert!(fire(&mut gate, SoundKind::SpeedLimit, t0 + Duration::from_secs(5)));

        assert_eq!(gate.fire_count(&SoundKind::SpeedLimit), 2);
        assert_eq!(gate.suppressed(), 1);
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut gate = AlertGate::new(Duration::from_secs(5));
        let t0 = Instant::now();

        assert!(fire(&mut gate, SoundKind::LaneDeparture, t0));
        assert!(fire(&mut gate, SoundKind::Collision, t0));
        assert!(!gate.should_fire(&SoundKind::LaneDeparture, t0));
    }

    #[test]
    fn test_release_rearms() {
        let mut gate = AlertGate::new(Duration::from_secs(5));
        let t0 = Instant::now();

        assert!(fire(&mut gate, SoundKind::Collision, t0));
        gate.release(&SoundKind::Collision);
        assert!(fire(&mut gate, SoundKind::Collision, t0 + Duration::from_millis(100)));
        assert_eq!(gate.suppressed(), 0);
    }

    #[test]
    fn test_clear() {
        let mut gate = AlertGate::new(Duration::from_secs(60));
        let t0 = Instant::now();
        gate.record_fire("lane", t0);
        assert!(gate.state(&"lane").is_some());

        gate.clear();
        assert!(gate.should_fire(&"lane", t0));
    }

    #[test]
    fn test_zero_cooldown_never_suppresses() {
        let mut gate = AlertGate::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(fire(&mut gate, 1u8, t0));
        assert!(fire(&mut gate, 1u8, t0));
    }
}
