//! Builders for the data model's most test-exercised shapes. Mirrors the
//! teacher's flat `create_test_*` function style rather than a builder type,
//! since each fixture here is a handful of fields, not a multi-stage object.

use chrono::{DateTime, Duration, Utc};
use homeiq_core::types::{Capability, DeviceCapability, DeviceId, EntityId, Event, ValueDomain};
use std::collections::HashMap;

/// A single `state_changed` event for `entity` transitioning to `new_state`.
#[must_use]
pub fn event(entity: &str, new_state: &str, at: DateTime<Utc>) -> Event {
    Event {
        timestamp: at,
        event_type: "state_changed".to_string(),
        entity_id: EntityId::new(entity).unwrap(),
        new_state: new_state.to_string(),
        device_id: None,
        area_id: None,
        attributes: HashMap::new(),
    }
}

/// One `anchor` activation followed `delay` later by `partner`'s, the shape
/// the co-occurrence detector (`patterns::co_occurrence`) looks for.
#[must_use]
pub fn co_occurring_event_pair(
    anchor: &str,
    partner: &str,
    at: DateTime<Utc>,
    delay: Duration,
) -> [Event; 2] {
    [event(anchor, "on", at), event(partner, "on", at + delay)]
}

/// `days` consecutive daily occurrences of `motion` followed five seconds
/// later by `light`, starting at `base` — enough to clear the default
/// `min_support = 5` / `confidence_floor = 0.20` co-occurrence thresholds.
#[must_use]
pub fn motion_light_events(base: DateTime<Utc>, days: i64) -> Vec<Event> {
    (0..days)
        .flat_map(|day| {
            let at = base + Duration::days(day);
            co_occurring_event_pair("sensor.motion_hall", "light.hall", at, Duration::seconds(5))
        })
        .collect()
}

/// A device with one boolean "on_off" capability, commandable.
#[must_use]
pub fn device_capability(device_id: &str) -> DeviceCapability {
    DeviceCapability {
        device_id: DeviceId::new(device_id).unwrap(),
        model: "generic-v1".to_string(),
        manufacturer: "Acme".to_string(),
        capabilities: vec![Capability {
            name: "on_off".to_string(),
            value_domain: ValueDomain::Boolean,
            commandable: true,
        }],
    }
}
