//! `AnalysisRun` (spec §3): one execution of the six-phase daily pipeline.

use super::ids::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    RefreshCapabilities,
    FetchEvents,
    Detect,
    Features,
    Compose,
    Publish,
}

impl Phase {
    #[must_use]
    pub fn all() -> [Phase; 6] {
        [
            Phase::RefreshCapabilities,
            Phase::FetchEvents,
            Phase::Detect,
            Phase::Features,
            Phase::Compose,
            Phase::Publish,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    /// A phase failed outright; prior phases' writes remain (spec §4.10).
    Failed,
    /// At least one detector was skipped but the run otherwise completed
    /// (spec §4.3 detector isolation).
    PartialSuccess,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCounts {
    pub patterns: usize,
    pub synergies: usize,
    pub suggestions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub id: RunId,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_map_millis")]
    pub phase_timings: HashMap<Phase, Duration>,
    pub counts: RunCounts,
    pub status: RunStatus,
    pub error_detail: Option<String>,
    pub failing_phase: Option<Phase>,
}

impl AnalysisRun {
    #[must_use]
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            id: RunId::new(),
            started_at: now,
            phase_timings: HashMap::new(),
            counts: RunCounts::default(),
            status: RunStatus::Running,
            error_detail: None,
            failing_phase: None,
        }
    }

    pub fn record_phase(&mut self, phase: Phase, elapsed: Duration) {
        self.phase_timings.insert(phase, elapsed);
    }

    pub fn fail(&mut self, phase: Phase, detail: String) {
        self.status = RunStatus::Failed;
        self.failing_phase = Some(phase);
        self.error_detail = Some(detail);
    }

    pub fn succeed(&mut self) {
        if self.status == RunStatus::Running {
            self.status = RunStatus::Succeeded;
        }
    }

    pub fn mark_partial(&mut self) {
        if self.status == RunStatus::Running {
            self.status = RunStatus::PartialSuccess;
        }
    }
}

mod duration_map_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::time::Duration;

    pub fn serialize<S, K>(
        map: &HashMap<K, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        K: Serialize + Eq + std::hash::Hash + Clone,
    {
        let as_millis: HashMap<K, u128> =
            map.iter().map(|(k, v)| (k.clone(), v.as_millis())).collect();
        as_millis.serialize(serializer)
    }

    pub fn deserialize<'de, D, K>(deserializer: D) -> Result<HashMap<K, Duration>, D::Error>
    where
        D: Deserializer<'de>,
        K: Deserialize<'de> + Eq + std::hash::Hash,
    {
        let as_millis: HashMap<K, u64> = HashMap::deserialize(deserializer)?;
        Ok(as_millis
            .into_iter()
            .map(|(k, v)| (k, Duration::from_millis(v)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_run_starts_running() {
        let run = AnalysisRun::start(Utc::now());
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.error_detail.is_none());
    }

    #[test]
    fn failing_a_phase_records_detail_and_phase() {
        let mut run = AnalysisRun::start(Utc::now());
        run.fail(Phase::Detect, "isolation forest panicked".to_string());
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.failing_phase, Some(Phase::Detect));
        assert!(run.error_detail.is_some());
    }
}
