//! `DeviceCapability` and `FeatureUsage` (spec §3).

use super::event::TimeWindow;
use super::ids::DeviceId;
use serde::{Deserialize, Serialize};

/// A single commandable or observable feature of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub value_domain: ValueDomain,
    pub commandable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueDomain {
    Boolean,
    Enum { values: Vec<String> },
    Range { min: f64, max: f64 },
    Text,
}

/// A device's manufacturer/model/capability set, as reported by the
/// external capability registry (spec §3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapability {
    pub device_id: DeviceId,
    pub model: String,
    pub manufacturer: String,
    pub capabilities: Vec<Capability>,
}

impl DeviceCapability {
    /// # Errors
    /// Returns `Error::InvalidInput` if two capabilities share a name
    /// (spec §3 invariant: capability names unique per device).
    pub fn validated(self) -> crate::Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for capability in &self.capabilities {
            if !seen.insert(capability.name.clone()) {
                return Err(crate::Error::InvalidInput(format!(
                    "duplicate capability name {:?} on device {}",
                    capability.name, self.device_id
                )));
            }
        }
        Ok(self)
    }
}

/// Observed utilization of one device capability over a window (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureUsage {
    pub device_id: DeviceId,
    pub capability_name: String,
    pub observed_used: bool,
    utilization: f64,
    pub window: TimeWindow,
}

impl FeatureUsage {
    /// `utilization = observations_of_use / observations_of_device_active`
    /// (spec §3/§4.5). `active_observations == 0` yields `utilization = 0`
    /// and `observed_used = false`, since there is no active-time evidence
    /// either way.
    #[must_use]
    pub fn from_counts(
        device_id: DeviceId,
        capability_name: String,
        use_observations: usize,
        active_observations: usize,
        window: TimeWindow,
    ) -> Self {
        let utilization = if active_observations == 0 {
            0.0
        } else {
            (use_observations as f64 / active_observations as f64).clamp(0.0, 1.0)
        };
        Self {
            device_id,
            capability_name,
            observed_used: utilization > 0.0,
            utilization,
            window,
        }
    }

    #[must_use]
    pub fn utilization(&self) -> f64 {
        self.utilization
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn window() -> TimeWindow {
        TimeWindow::new(Utc::now() - chrono::Duration::days(7), Utc::now())
    }

    #[test]
    fn duplicate_capability_names_rejected() {
        let cap = DeviceCapability {
            device_id: DeviceId::new("light.office").unwrap(),
            model: "X1".to_string(),
            manufacturer: "Acme".to_string(),
            capabilities: vec![
                Capability {
                    name: "brightness".to_string(),
                    value_domain: ValueDomain::Range { min: 0.0, max: 100.0 },
                    commandable: true,
                },
                Capability {
                    name: "brightness".to_string(),
                    value_domain: ValueDomain::Range { min: 0.0, max: 100.0 },
                    commandable: true,
                },
            ],
        };
        assert!(cap.validated().is_err());
    }

    #[test]
    fn utilization_is_use_over_active() {
        let usage = FeatureUsage::from_counts(
            DeviceId::new("light.office").unwrap(),
            "color_temp".to_string(),
            3,
            30,
            window(),
        );
        assert!((usage.utilization() - 0.1).abs() < 1e-9);
        assert!(usage.observed_used);
    }

    #[test]
    fn zero_active_observations_yields_zero_utilization() {
        let usage = FeatureUsage::from_counts(
            DeviceId::new("light.office").unwrap(),
            "color_temp".to_string(),
            0,
            0,
            window(),
        );
        assert_eq!(usage.utilization(), 0.0);
        assert!(!usage.observed_used);
    }
}
