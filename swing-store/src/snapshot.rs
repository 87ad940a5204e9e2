//! Persisted decision state.
//!
//! Everything the daemon needs to resume after a restart: the open position,
//! the pending signal, the cooldown clock, metrics and the last market view.
//! Every field defaults when missing so older or newer files still load.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use swing_domain::{MarketSnapshot, PerformanceMetrics, Position, Signal};

/// Durable snapshot of the decision state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    /// When the snapshot was taken (RFC 3339 on disk)
    pub timestamp: DateTime<Utc>,
    /// Whether a position was open
    pub in_position: bool,
    /// The open position
    pub position: Option<Position>,
    /// The pending signal
    pub signal: Option<Signal>,
    /// When the last signal resolved (cooldown clock)
    pub last_signal_time: Option<DateTime<Utc>>,
    /// Cumulative performance
    pub metrics: PerformanceMetrics,
    /// Last market snapshot seen
    pub last_market: Option<MarketSnapshot>,
}

impl PersistedState {
    /// Snapshot taken at `timestamp`; `in_position` follows `position`.
    pub fn capture(
        timestamp: DateTime<Utc>,
        position: Option<Position>,
        signal: Option<Signal>,
        last_signal_time: Option<DateTime<Utc>>,
        metrics: PerformanceMetrics,
        last_market: Option<MarketSnapshot>,
    ) -> Self {
        Self {
            timestamp,
            in_position: position.is_some(),
            position,
            signal,
            last_signal_time,
            metrics,
            last_market,
        }
    }

    /// Older than `max_age` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.timestamp > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_and_missing_fields_default() {
        let json = r#"{
            "timestamp": "2024-05-01T12:00:00Z",
            "in_position": false,
            "future_field": {"nested": true}
        }"#;

        let state: PersistedState = serde_json::from_str(json).unwrap();
        assert!(!state.in_position);
        assert!(state.position.is_none());
        assert!(state.signal.is_none());
        assert_eq!(state.metrics, PerformanceMetrics::default());
    }

    #[test]
    fn test_staleness() {
        let now = Utc::now();
        let state = PersistedState {
            timestamp: now - Duration::hours(49),
            ..PersistedState::default()
        };
        assert!(state.is_stale(now, Duration::hours(48)));
        assert!(!state.is_stale(now - Duration::hours(2), Duration::hours(48)));
    }

    #[test]
    fn test_capture_sets_in_position() {
        let state = PersistedState::capture(Utc::now(), None, None, None, PerformanceMetrics::default(), None);
        assert!(!state.in_position);
    }
}
