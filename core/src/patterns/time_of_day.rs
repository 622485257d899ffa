//! Time-of-day detector (spec §4.3).

use super::PatternCandidate;
use crate::config::DetectorConfig;
use crate::types::{Event, PatternMetadata, WeekdayMask};
use chrono::{Datelike, Timelike, Weekday};
use std::collections::HashMap;

/// Uniform prior over 168 (hour, weekday) bins, used for empirical-Bayes
/// shrinkage of the stored confidence (spec §4.3).
const UNIFORM_PRIOR: f64 = 1.0 / 168.0;
/// Pseudo-count weight of the prior in the EB shrinkage blend. Small enough
/// that a consistently-observed daily pattern (occurrences roughly equal to
/// total activations) still clears the default `confidence_floor`.
const EB_PSEUDOCOUNT: f64 = 4.0;

/// For each entity, bin activation timestamps by (hour, weekday); a bin
/// qualifies when `occurrences >= min_support` and `count/total >=
/// confidence_floor`. Bins for the same hour are fused across every
/// qualifying weekday (spec §4.3): a weighted average of values that are
/// each individually `>= confidence_floor` is itself `>= confidence_floor`,
/// so merging is always safe and always the most informative result.
pub fn detect(events: &[Event], config: &DetectorConfig) -> Vec<PatternCandidate> {
    let mut per_entity: HashMap<&crate::types::EntityId, Vec<chrono::DateTime<chrono::Utc>>> =
        HashMap::new();
    for event in events {
        if event.is_activation() {
            per_entity.entry(&event.entity_id).or_default().push(event.timestamp);
        }
    }

    let mut candidates = Vec::new();
    for (entity, activations) in per_entity {
        let total = activations.len();
        if total == 0 {
            continue;
        }

        let mut bins: HashMap<(u8, Weekday), usize> = HashMap::new();
        for ts in &activations {
            *bins.entry((ts.hour() as u8, ts.weekday())).or_default() += 1;
        }

        let mut qualifying_by_hour: HashMap<u8, Vec<(Weekday, usize)>> = HashMap::new();
        for (&(hour, weekday), &count) in &bins {
            let frequency = count as f64 / total as f64;
            if count >= config.min_support && frequency >= config.confidence_floor {
                qualifying_by_hour.entry(hour).or_default().push((weekday, count));
            }
        }

        for (hour, days) in qualifying_by_hour {
            let occurrences: usize = days.iter().map(|(_, c)| c).sum();
            let raw_confidence = occurrences as f64 / total as f64;
            let confidence = eb_shrink(occurrences, total, raw_confidence);

            let mut mask = WeekdayMask(0);
            for (weekday, _) in &days {
                mask = mask.union(&WeekdayMask::single(*weekday));
            }

            candidates.push(PatternCandidate {
                anchor: entity.clone(),
                metadata: PatternMetadata::TimeOfDay {
                    hour,
                    weekday_mask: mask,
                },
                confidence,
                occurrences,
            });
        }
    }

    candidates
}

/// Blends the raw bin frequency toward the uniform prior with pseudo-count
/// weight [`EB_PSEUDOCOUNT`]; converges to `raw_confidence` as `total` grows.
fn eb_shrink(count: usize, total: usize, _raw_confidence: f64) -> f64 {
    (count as f64 + EB_PSEUDOCOUNT * UNIFORM_PRIOR) / (total as f64 + EB_PSEUDOCOUNT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;
    use chrono::{Duration, TimeZone, Utc};

    fn activation_at(entity: &str, year: i32, month: u32, day: u32, hour: u32) -> Event {
        Event {
            timestamp: Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap(),
            event_type: "state_changed".to_string(),
            entity_id: EntityId::new(entity).unwrap(),
            new_state: "on".to_string(),
            device_id: None,
            area_id: None,
            attributes: Default::default(),
        }
    }

    #[test]
    fn weekday_7am_pattern_is_detected() {
        // Scenario S1: light.office turns on at 07:00 every weekday for 30 days.
        let mut events = Vec::new();
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).unwrap(); // a Monday
        for day_offset in 0..30 {
            let ts = start + Duration::days(day_offset);
            if matches!(ts.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            events.push(Event {
                timestamp: ts,
                ..activation_at("light.office", 2026, 1, 5, 7)
            });
        }

        let config = DetectorConfig::default();
        let candidates = detect(&events, &config);
        let pattern = candidates
            .iter()
            .find(|c| c.anchor.as_str() == "light.office")
            .expect("expected a time-of-day candidate for light.office");

        match &pattern.metadata {
            PatternMetadata::TimeOfDay { hour, weekday_mask } => {
                assert_eq!(*hour, 7);
                assert!(weekday_mask.contains(Weekday::Mon));
                assert!(!weekday_mask.contains(Weekday::Sat));
            }
            other => panic!("expected TimeOfDay metadata, got {other:?}"),
        }
        assert!(pattern.confidence >= 0.80);
        assert!(pattern.occurrences >= 22);
    }

    #[test]
    fn sparse_activations_below_min_support_are_not_candidates() {
        let events = vec![activation_at("light.hall", 2026, 1, 5, 9)];
        let config = DetectorConfig::default();
        assert!(detect(&events, &config).is_empty());
    }
}
