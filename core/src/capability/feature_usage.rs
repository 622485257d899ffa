//! `analyze`: builds [`FeatureUsage`] rows and rate-limited underutilization
//! candidates (spec §4.5).

use crate::config::FeatureAnalysisConfig;
use crate::event_source::AttributeSample;
use crate::types::{DeviceCapability, DeviceId, FeatureUsage, TimeWindow, ValueDomain};
use std::collections::HashMap;

/// A capability flagged as underutilized, consumed by C6 as a feature
/// suggestion source (spec §4.6: "feature (utilization-gap × device
/// centrality)"). `utilization_gap = 1.0 - utilization` (always `1.0` here
/// since `observed_used = false` is the qualifying condition).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCandidate {
    pub device_id: DeviceId,
    pub capability_name: String,
    pub utilization_gap: f64,
}

/// Default value per domain, used to decide whether an observed attribute
/// sample reflects non-default use: booleans default `false`, enums default
/// to their first listed value, ranges default to their minimum, free text
/// defaults to empty.
fn is_non_default(domain: &ValueDomain, value: &serde_json::Value) -> bool {
    match domain {
        ValueDomain::Boolean => value.as_bool() == Some(true),
        ValueDomain::Enum { values } => match (values.first(), value.as_str()) {
            (Some(default), Some(observed)) => observed != default,
            _ => !value.is_null(),
        },
        ValueDomain::Range { min, .. } => value.as_f64().is_some_and(|v| (v - *min).abs() > f64::EPSILON),
        ValueDomain::Text => value.as_str().is_some_and(|s| !s.is_empty()),
    }
}

/// `samples_by_device` and `active_counts` are pre-grouped by the caller
/// from the same windowed event/attribute-series fetch (spec §4.1): the
/// event source yields entity-scoped records, and the orchestrator maps
/// them to devices via `Event::device_id` before calling this.
#[must_use]
pub fn analyze(
    capabilities: &[DeviceCapability],
    samples_by_device: &HashMap<DeviceId, Vec<AttributeSample>>,
    active_counts: &HashMap<DeviceId, usize>,
    window: TimeWindow,
    config: &FeatureAnalysisConfig,
) -> (Vec<FeatureUsage>, Vec<FeatureCandidate>) {
    let mut usage_rows = Vec::new();
    let mut candidates = Vec::new();

    for device in capabilities {
        let active_observations = *active_counts.get(&device.device_id).unwrap_or(&0);
        let samples = samples_by_device.get(&device.device_id);

        for capability in &device.capabilities {
            let use_observations = samples
                .map(|samples| {
                    samples
                        .iter()
                        .filter(|s| s.attribute == capability.name)
                        .filter(|s| is_non_default(&capability.value_domain, &s.value))
                        .count()
                })
                .unwrap_or(0);

            let usage = FeatureUsage::from_counts(
                device.device_id.clone(),
                capability.name.clone(),
                use_observations,
                active_observations,
                window,
            );

            if capability.commandable
                && !usage.observed_used
                && active_observations >= config.device_min_activity
            {
                candidates.push(FeatureCandidate {
                    device_id: device.device_id.clone(),
                    capability_name: capability.name.clone(),
                    utilization_gap: 1.0,
                });
            }

            usage_rows.push(usage);
        }
    }

    // Rate limit: at most one feature suggestion per device per run (spec §4.5).
    let mut seen_devices = std::collections::HashSet::new();
    candidates.retain(|c| seen_devices.insert(c.device_id.clone()));

    (usage_rows, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Capability;
    use chrono::Utc;
    use serde_json::json;

    fn window() -> TimeWindow {
        TimeWindow::new(Utc::now() - chrono::Duration::days(7), Utc::now())
    }

    fn device(id: &str, capabilities: Vec<Capability>) -> DeviceCapability {
        DeviceCapability {
            device_id: DeviceId::new(id).unwrap(),
            model: "X1".to_string(),
            manufacturer: "Acme".to_string(),
            capabilities,
        }
    }

    #[test]
    fn commandable_unused_capability_on_active_device_is_a_candidate() {
        let device_id = DeviceId::new("light.office").unwrap();
        let caps = vec![device(
            "light.office",
            vec![Capability {
                name: "color_temp".to_string(),
                value_domain: ValueDomain::Range { min: 2700.0, max: 6500.0 },
                commandable: true,
            }],
        )];
        let active_counts = HashMap::from([(device_id.clone(), 20)]);
        let samples = HashMap::new();
        let config = FeatureAnalysisConfig::default();

        let (usage, candidates) = analyze(&caps, &samples, &active_counts, window(), &config);
        assert_eq!(usage.len(), 1);
        assert!(!usage[0].observed_used);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].device_id, device_id);
    }

    #[test]
    fn used_capability_is_not_a_candidate() {
        let device_id = DeviceId::new("light.office").unwrap();
        let caps = vec![device(
            "light.office",
            vec![Capability {
                name: "color_temp".to_string(),
                value_domain: ValueDomain::Range { min: 2700.0, max: 6500.0 },
                commandable: true,
            }],
        )];
        let active_counts = HashMap::from([(device_id.clone(), 20)]);
        let samples = HashMap::from([(
            device_id,
            vec![AttributeSample {
                entity_id: crate::types::EntityId::new("light.office").unwrap(),
                attribute: "color_temp".to_string(),
                value: json!(4000.0),
                timestamp: Utc::now(),
            }],
        )]);
        let config = FeatureAnalysisConfig::default();

        let (_, candidates) = analyze(&caps, &samples, &active_counts, window(), &config);
        assert!(candidates.is_empty());
    }

    #[test]
    fn two_underutilized_capabilities_on_one_device_yield_one_candidate() {
        let device_id = DeviceId::new("thermostat.hall").unwrap();
        let caps = vec![device(
            "thermostat.hall",
            vec![
                Capability {
                    name: "eco_mode".to_string(),
                    value_domain: ValueDomain::Boolean,
                    commandable: true,
                },
                Capability {
                    name: "schedule".to_string(),
                    value_domain: ValueDomain::Boolean,
                    commandable: true,
                },
            ],
        )];
        let active_counts = HashMap::from([(device_id, 20)]);
        let samples = HashMap::new();
        let config = FeatureAnalysisConfig::default();

        let (_, candidates) = analyze(&caps, &samples, &active_counts, window(), &config);
        assert_eq!(candidates.len(), 1);
    }
}
