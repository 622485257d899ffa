//! Co-occurrence detector (spec §4.3). Directed: A→B and B→A are scored
//! independently by construction, since only forward-looking windows from
//! each activation are counted.

use super::PatternCandidate;
use crate::config::DetectorConfig;
use crate::types::{Direction, EntityId, Event, PatternMetadata};
use std::collections::{HashMap, HashSet};

/// For each pair (A, B), count events of B within a sliding window W after
/// events of A, using a single chronological pass with an early-exit window
/// scan (O(N·k), k = average in-window neighborhood size).
pub fn detect(events: &[Event], config: &DetectorConfig) -> Vec<PatternCandidate> {
    let mut activations: Vec<&Event> = events.iter().filter(|e| e.is_activation()).collect();
    activations.sort_by_key(|e| e.timestamp);

    let window = chrono::Duration::from_std(config.co_occurrence_window)
        .unwrap_or_else(|_| chrono::Duration::seconds(300));

    let mut total_by_entity: HashMap<&EntityId, usize> = HashMap::new();
    for event in &activations {
        *total_by_entity.entry(&event.entity_id).or_default() += 1;
    }

    let mut pair_counts: HashMap<(EntityId, EntityId), usize> = HashMap::new();
    for (i, anchor) in activations.iter().enumerate() {
        let mut seen_partners: HashSet<&EntityId> = HashSet::new();
        for partner in &activations[i + 1..] {
            if partner.timestamp - anchor.timestamp > window {
                break;
            }
            if partner.entity_id == anchor.entity_id {
                continue;
            }
            if seen_partners.insert(&partner.entity_id) {
                *pair_counts
                    .entry((anchor.entity_id.clone(), partner.entity_id.clone()))
                    .or_default() += 1;
            }
        }
    }

    let mut candidates = Vec::new();
    for ((anchor, partner), count) in pair_counts {
        let total = *total_by_entity.get(&anchor).unwrap_or(&0);
        if total == 0 {
            continue;
        }
        let confidence = count as f64 / total as f64;
        if count >= config.min_support && confidence >= config.confidence_floor {
            candidates.push(PatternCandidate {
                anchor,
                metadata: PatternMetadata::CoOccurrence {
                    partner,
                    window_s: config.co_occurrence_window.as_secs(),
                    direction: Direction::AnchorTriggersPartner,
                },
                confidence,
                occurrences: count,
            });
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(entity: &str, minute_offset: i64) -> Event {
        Event {
            timestamp: Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()
                + chrono::Duration::seconds(minute_offset),
            event_type: "state_changed".to_string(),
            entity_id: EntityId::new(entity).unwrap(),
            new_state: "on".to_string(),
            device_id: None,
            area_id: None,
            attributes: Default::default(),
        }
    }

    #[test]
    fn motion_then_light_is_directed_forward_only() {
        // Scenario S2: motion -> light within 30s, 40 times over 14 days; reverse never.
        let mut events = Vec::new();
        for day in 0..40i64 {
            let base = day * 86_400;
            events.push(event("binary_sensor.kitchen_motion", base));
            events.push(event("light.kitchen_main", base + 10));
        }

        let config = DetectorConfig::default();
        let candidates = detect(&events, &config);

        let forward = candidates.iter().find(|c| {
            c.anchor.as_str() == "binary_sensor.kitchen_motion"
                && matches!(&c.metadata, PatternMetadata::CoOccurrence { partner, .. } if partner.as_str() == "light.kitchen_main")
        });
        assert!(forward.is_some());
        assert!(forward.unwrap().confidence >= 0.70);

        let reverse = candidates.iter().find(|c| c.anchor.as_str() == "light.kitchen_main");
        assert!(reverse.is_none());
    }

    #[test]
    fn events_outside_window_do_not_pair() {
        let events = vec![event("a.x", 0), event("b.y", 10_000)];
        let config = DetectorConfig::default();
        assert!(detect(&events, &config).is_empty());
    }
}
