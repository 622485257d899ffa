//! The read-only `Event` record (spec §3).

use super::ids::{DeviceId, EntityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single observed state transition of a device in the home.
///
/// Invariant: `entity_id` is non-empty (enforced by `EntityId`); `timestamp`
/// is UTC. A fetched slice is chronologically non-decreasing by `timestamp`
/// (enforced by the event source, not by this type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_id: EntityId,
    pub new_state: String,
    pub device_id: Option<DeviceId>,
    pub area_id: Option<String>,
    pub attributes: HashMap<String, Value>,
}

impl Event {
    #[must_use]
    pub fn domain(&self) -> &str {
        self.entity_id.domain()
    }

    /// A `state_changed` event representing an actuation-style transition
    /// (to "on" or any non-"off"/non-"unavailable" value), used by the
    /// time-of-day detector's activation counting (§4.3).
    #[must_use]
    pub fn is_activation(&self) -> bool {
        self.event_type == "state_changed"
            && !matches!(self.new_state.as_str(), "off" | "unavailable" | "unknown")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(state: &str) -> Event {
        Event {
            timestamp: Utc::now(),
            event_type: "state_changed".to_string(),
            entity_id: EntityId::new("light.office").unwrap(),
            new_state: state.to_string(),
            device_id: None,
            area_id: None,
            attributes: HashMap::new(),
        }
    }

    #[test]
    fn domain_is_entity_prefix() {
        assert_eq!(event("on").domain(), "light");
    }

    #[test]
    fn activation_excludes_off_and_unavailable() {
        assert!(event("on").is_activation());
        assert!(!event("off").is_activation());
        assert!(!event("unavailable").is_activation());
        assert!(!event("unknown").is_activation());
    }
}
