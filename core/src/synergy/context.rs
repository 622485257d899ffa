//! Layer 2: weather/energy/event context synergies (spec §4.4 item 2).

use crate::config::SynergyConfig;
use crate::math::stats::chi_square_2x2;
use crate::types::{Complexity, Event, EntityId, Synergy, SynergyKind};
use std::collections::{HashMap, HashSet};

/// One external context variable this layer tests against, with the
/// synergy kind it produces when a device's activation timing is found to
/// be statistically associated with it.
struct ContextSignal {
    tag: &'static str,
    kind: SynergyKind,
}

const SIGNALS: &[ContextSignal] = &[
    ContextSignal { tag: "rain", kind: SynergyKind::WeatherContext },
    ContextSignal { tag: "peak_tariff", kind: SynergyKind::EnergyContext },
    ContextSignal { tag: "media_playing", kind: SynergyKind::EventContext },
];

/// For each context signal, compares every entity's share of activations
/// that fall inside the context-tagged slice against the system-wide
/// background share (chi-square of independence, 2x2). An entity's timing
/// is treated as context-linked when `p < context_p_value` AND
/// `effect_size >= context_effect_floor` (spec §4.4 item 2).
///
/// `events` is the full windowed slice already fetched for detection; the
/// context-tagged subset is assumed to be contained in it (both sourced
/// from the same [`crate::event_source::EventSource::fetch_context_tagged_events`]
/// call over the same window).
#[must_use]
pub fn build(events: &[Event], config: &SynergyConfig) -> Vec<Synergy> {
    let mut synergies = Vec::new();

    for signal in SIGNALS {
        let context_events: Vec<&Event> =
            events.iter().filter(|e| e.attributes.contains_key(signal.tag)).collect();
        if context_events.is_empty() {
            continue;
        }

        let context_ids: HashSet<&EntityId> =
            context_events.iter().map(|e| &e.entity_id).collect();

        let mut by_entity: HashMap<&EntityId, usize> = HashMap::new();
        for event in events {
            if event.is_activation() {
                *by_entity.entry(&event.entity_id).or_default() += 1;
            }
        }
        let mut context_by_entity: HashMap<&EntityId, usize> = HashMap::new();
        for event in &context_events {
            if event.is_activation() {
                *context_by_entity.entry(&event.entity_id).or_default() += 1;
            }
        }

        let total_context: u64 = context_by_entity.values().sum::<usize>() as u64;
        let total_all: u64 = by_entity.values().sum::<usize>() as u64;

        for (&entity, &total) in &by_entity {
            if !context_ids.contains(entity) {
                continue;
            }
            let in_context = *context_by_entity.get(entity).unwrap_or(&0) as u64;
            let out_of_context = (total as u64).saturating_sub(in_context);
            let background_in_context = total_context.saturating_sub(in_context);
            let background_out_of_context =
                (total_all.saturating_sub(total as u64)).saturating_sub(background_in_context);

            let table = [
                [in_context, out_of_context],
                [background_in_context, background_out_of_context],
            ];
            let result = chi_square_2x2(table);
            if result.p_value < config.context_p_value
                && result.effect_size >= config.context_effect_floor
            {
                let confidence = in_context as f64 / total.max(1) as f64;
                let context_entity = EntityId::new(format!("context.{}", signal.tag))
                    .expect("static tag is never empty");
                let synergy = Synergy::new(
                    signal.kind,
                    vec![context_entity, entity.clone()],
                    result.effect_size.clamp(0.0, 1.0),
                    confidence.clamp(0.0, 1.0),
                    Complexity::Medium,
                    (1.0 - result.p_value).clamp(0.0, 1.0),
                    true,
                    vec![],
                );
                if let Ok(synergy) = synergy {
                    synergies.push(synergy);
                }
            }
        }
    }

    synergies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceId;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn event(entity: &str, minute_offset: i64, rain: bool) -> Event {
        let mut attributes = std::collections::HashMap::new();
        if rain {
            attributes.insert("rain".to_string(), json!(true));
        }
        Event {
            timestamp: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minute_offset),
            event_type: "state_changed".to_string(),
            entity_id: EntityId::new(entity).unwrap(),
            new_state: "on".to_string(),
            device_id: None::<DeviceId>,
            area_id: None,
            attributes,
        }
    }

    #[test]
    fn entity_mostly_active_during_rain_is_flagged() {
        let mut events = Vec::new();
        for i in 0..40 {
            events.push(event("light.porch", i, true));
        }
        for i in 0..40 {
            events.push(event("light.other_room", i, false));
        }

        let config = SynergyConfig::default();
        let synergies = build(&events, &config);
        assert!(synergies.iter().any(|s| s.kind == SynergyKind::WeatherContext));
    }

    #[test]
    fn no_context_tagged_events_yields_nothing() {
        let events = vec![event("light.porch", 0, false)];
        let config = SynergyConfig::default();
        assert!(build(&events, &config).is_empty());
    }
}
