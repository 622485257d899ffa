//! Anomaly detector (spec §4.3): an isolation-forest-style scorer over
//! per-entity activation features, followed by grouping anomalous instances
//! into "repeated override" signatures.

mod iforest;

use super::PatternCandidate;
use crate::config::DetectorConfig;
use crate::types::{Event, PatternMetadata};
use chrono::{Datelike, Timelike};
use iforest::IsolationForestConfig;
use std::collections::HashMap;

/// Minimum activations before a per-entity forest is trained; below this the
/// feature space is too sparse for a meaningful score.
const MIN_SAMPLES_FOR_FOREST: usize = 10;

/// Trains a small isolation forest per entity over (hour, weekday,
/// prior_state_indicator, inter_arrival_gap_seconds), flags the top
/// `contamination` fraction as outliers, then keeps only the outliers whose
/// transition is a quick reversal ("on→off" or "off→on" within
/// `anomaly_override_window`) — the "repeated user override" signature the
/// spec names. Groups survivors by `(entity, transition, time-of-day
/// bucket)` and emits one pattern per group with `occurrences >=
/// min_support`.
pub fn detect(events: &[Event], config: &DetectorConfig) -> Vec<PatternCandidate> {
    let mut per_entity: HashMap<&crate::types::EntityId, Vec<&Event>> = HashMap::new();
    for event in events {
        per_entity.entry(&event.entity_id).or_default().push(event);
    }

    let mut signature_counts: HashMap<(crate::types::EntityId, String), usize> = HashMap::new();

    for (entity, mut entity_events) in per_entity {
        entity_events.sort_by_key(|e| e.timestamp);
        if entity_events.len() < MIN_SAMPLES_FOR_FOREST {
            continue;
        }

        let features: Vec<Vec<f64>> = entity_events
            .windows(2)
            .map(|pair| {
                let (prev, curr) = (pair[0], pair[1]);
                let gap = (curr.timestamp - prev.timestamp).num_seconds().max(0) as f64;
                let prior_state_indicator = f64::from(prev.new_state != curr.new_state);
                vec![
                    f64::from(curr.timestamp.hour()),
                    f64::from(curr.timestamp.weekday().num_days_from_monday()),
                    prior_state_indicator,
                    gap,
                ]
            })
            .collect();

        let scores = iforest::score(&features, &IsolationForestConfig::default());
        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));
        let n_outliers = ((scores.len() as f64) * config.anomaly_contamination).ceil() as usize;

        for &idx in ranked.iter().take(n_outliers) {
            let prev = entity_events[idx];
            let curr = entity_events[idx + 1];
            let gap = curr.timestamp - prev.timestamp;
            let is_quick_reversal = gap <= chrono::Duration::from_std(config.anomaly_override_window).unwrap_or_default()
                && ((prev.new_state == "on" && curr.new_state == "off")
                    || (prev.new_state == "off" && curr.new_state == "on"));
            if !is_quick_reversal {
                continue;
            }

            let bucket = curr.timestamp.hour() / 4; // 6 rough time-of-day buckets
            let transition = format!("{}->{}", prev.new_state, curr.new_state);
            let signature = format!("{transition}:{bucket}");
            *signature_counts.entry((entity.clone(), signature)).or_default() += 1;
        }
    }

    signature_counts
        .into_iter()
        .filter(|(_, count)| *count >= config.min_support)
        .map(|((anchor, signature), count)| {
            let total_transitions = count.max(1);
            PatternCandidate {
                anchor,
                metadata: PatternMetadata::Anomaly { signature },
                confidence: (count as f64 / total_transitions as f64).clamp(0.0, 1.0),
                occurrences: count,
            }
        })
        .collect()
}
