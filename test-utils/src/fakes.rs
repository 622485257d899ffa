//! In-memory stand-ins for every external boundary (spec §6), so pipeline
//! tests exercise real orchestration logic without a database or network
//! call. [`FakeStorage`] backs the full `StorageBackend` trait; the others
//! are single-method adapters.

use async_trait::async_trait;
use homeiq_core::adapters::llm::{DescribeRequest, PlanRequest};
use homeiq_core::adapters::notifier::RunSummaryNotification;
use homeiq_core::adapters::{CapabilityRegistry, DescriptionGenerator, NotificationPublisher};
use homeiq_core::config::UserPreferences;
use homeiq_core::event_source::{AttributeSample, EntityFilter, EventSource};
use homeiq_core::storage::{AskAiSession, PatternFilter, StorageBackend, SynergyFilter};
use homeiq_core::types::{
    AliasMap, AnalysisRun, DeviceCapability, DeviceId, EntityId, Event, FeatureUsage, Pattern,
    PatternId, PatternSnapshot, QueryMemory, RunId, SessionId, StructuredPlan, Suggestion,
    SuggestionId, SuggestionStatus, Synergy, TimeWindow,
};
use homeiq_core::{Error, Result};
use std::sync::Mutex;

/// An in-memory `StorageBackend`: every repository named in spec §3 as a
/// `Mutex<Vec<..>>`, with no persistence across instances.
#[derive(Default)]
pub struct FakeStorage {
    pub patterns: Mutex<Vec<Pattern>>,
    pub pattern_snapshots: Mutex<Vec<PatternSnapshot>>,
    pub synergies: Mutex<Vec<Synergy>>,
    pub suggestions: Mutex<Vec<Suggestion>>,
    pub capabilities: Mutex<Vec<DeviceCapability>>,
    pub feature_usage: Mutex<Vec<FeatureUsage>>,
    pub aliases: Mutex<Vec<AliasMap>>,
    pub query_memories: Mutex<Vec<QueryMemory>>,
    pub preferences: Mutex<Vec<(String, UserPreferences)>>,
    pub running_run: Mutex<Option<AnalysisRun>>,
    pub runs: Mutex<Vec<AnalysisRun>>,
    pub ask_ai_sessions: Mutex<Vec<AskAiSession>>,
}

#[async_trait]
impl StorageBackend for FakeStorage {
    async fn find_pattern_by_identity(&self, identity_key: &str) -> Result<Option<Pattern>> {
        Ok(self
            .patterns
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.identity_key() == identity_key)
            .cloned())
    }

    async fn insert_pattern(&self, pattern: &Pattern) -> Result<()> {
        self.patterns.lock().unwrap().push(pattern.clone());
        Ok(())
    }

    async fn replace_pattern(&self, pattern: &Pattern) -> Result<()> {
        let mut patterns = self.patterns.lock().unwrap();
        if let Some(slot) = patterns.iter_mut().find(|p| p.id == pattern.id) {
            *slot = pattern.clone();
        }
        Ok(())
    }

    async fn append_pattern_snapshot(&self, snapshot: &PatternSnapshot) -> Result<()> {
        self.pattern_snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn list_pattern_snapshots(&self, pattern_id: PatternId, limit: usize) -> Result<Vec<PatternSnapshot>> {
        let mut snapshots: Vec<_> = self
            .pattern_snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.pattern_id == pattern_id)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        snapshots.truncate(limit);
        Ok(snapshots)
    }

    async fn list_patterns(&self, filter: &PatternFilter) -> Result<Vec<Pattern>> {
        Ok(self
            .patterns
            .lock()
            .unwrap()
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn get_pattern(&self, id: PatternId) -> Result<Option<Pattern>> {
        Ok(self.patterns.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn prune_patterns_older_than(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<usize> {
        let mut patterns = self.patterns.lock().unwrap();
        let before = patterns.len();
        patterns.retain(|p| p.last_seen >= cutoff);
        Ok(before - patterns.len())
    }

    async fn find_synergy_by_identity(&self, identity_key: &str) -> Result<Option<Synergy>> {
        Ok(self
            .synergies
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.identity_key() == identity_key)
            .cloned())
    }

    async fn insert_synergy(&self, synergy: &Synergy) -> Result<()> {
        self.synergies.lock().unwrap().push(synergy.clone());
        Ok(())
    }

    async fn replace_synergy(&self, synergy: &Synergy) -> Result<()> {
        let mut synergies = self.synergies.lock().unwrap();
        if let Some(slot) = synergies.iter_mut().find(|s| s.id == synergy.id) {
            *slot = synergy.clone();
        }
        Ok(())
    }

    async fn list_synergies(&self, filter: &SynergyFilter) -> Result<Vec<Synergy>> {
        Ok(self
            .synergies
            .lock()
            .unwrap()
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<()> {
        self.suggestions.lock().unwrap().push(suggestion.clone());
        Ok(())
    }

    async fn save_suggestion(&self, suggestion: &Suggestion) -> Result<()> {
        let mut suggestions = self.suggestions.lock().unwrap();
        if let Some(slot) = suggestions.iter_mut().find(|s| s.id == suggestion.id) {
            *slot = suggestion.clone();
        }
        Ok(())
    }

    async fn get_suggestion(&self, id: SuggestionId) -> Result<Option<Suggestion>> {
        Ok(self.suggestions.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn list_suggestions(&self, status: Option<SuggestionStatus>) -> Result<Vec<Suggestion>> {
        Ok(self
            .suggestions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| status.is_none_or(|wanted| s.status() == wanted))
            .cloned()
            .collect())
    }

    async fn upsert_device_capability(&self, capability: &DeviceCapability) -> Result<()> {
        let mut capabilities = self.capabilities.lock().unwrap();
        if let Some(slot) = capabilities.iter_mut().find(|c| c.device_id == capability.device_id) {
            *slot = capability.clone();
        } else {
            capabilities.push(capability.clone());
        }
        Ok(())
    }

    async fn list_device_capabilities(&self) -> Result<Vec<DeviceCapability>> {
        Ok(self.capabilities.lock().unwrap().clone())
    }

    async fn record_feature_usage(&self, usage: &FeatureUsage) -> Result<()> {
        self.feature_usage.lock().unwrap().push(usage.clone());
        Ok(())
    }

    async fn list_feature_usage(&self, device_id: &DeviceId) -> Result<Vec<FeatureUsage>> {
        Ok(self
            .feature_usage
            .lock()
            .unwrap()
            .iter()
            .filter(|u| &u.device_id == device_id)
            .cloned()
            .collect())
    }

    async fn create_alias(&self, alias: &AliasMap) -> Result<()> {
        let mut aliases = self.aliases.lock().unwrap();
        if aliases.iter().any(|a| a.user_id == alias.user_id && a.alias == alias.alias) {
            return Err(Error::PersistenceConflict(format!(
                "alias {:?} already exists for user {}",
                alias.alias, alias.user_id
            )));
        }
        aliases.push(alias.clone());
        Ok(())
    }

    async fn delete_alias(&self, user_id: &str, alias: &str) -> Result<()> {
        self.aliases.lock().unwrap().retain(|a| !(a.user_id == user_id && a.alias == alias));
        Ok(())
    }

    async fn list_aliases(&self, user_id: &str) -> Result<Vec<AliasMap>> {
        Ok(self.aliases.lock().unwrap().iter().filter(|a| a.user_id == user_id).cloned().collect())
    }

    async fn resolve_alias(&self, user_id: &str, alias: &str) -> Result<Option<EntityId>> {
        Ok(self
            .aliases
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.user_id == user_id && a.alias == alias)
            .map(|a| a.target_entity_id.clone()))
    }

    async fn insert_query_memory(&self, memory: &QueryMemory) -> Result<()> {
        self.query_memories.lock().unwrap().push(memory.clone());
        Ok(())
    }

    async fn list_query_memories(&self, user_id: Option<&str>) -> Result<Vec<QueryMemory>> {
        Ok(self
            .query_memories
            .lock()
            .unwrap()
            .iter()
            .filter(|m| user_id.is_none_or(|wanted| m.user_id == wanted))
            .cloned()
            .collect())
    }

    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences> {
        Ok(self
            .preferences
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == user_id)
            .map(|(_, prefs)| prefs.clone())
            .unwrap_or_default())
    }

    async fn set_preferences(&self, user_id: &str, preferences: &UserPreferences) -> Result<()> {
        let mut all = self.preferences.lock().unwrap();
        if let Some(slot) = all.iter_mut().find(|(id, _)| id == user_id) {
            slot.1 = preferences.clone();
        } else {
            all.push((user_id.to_string(), preferences.clone()));
        }
        Ok(())
    }

    async fn start_run(&self, run: &AnalysisRun) -> Result<()> {
        let mut running = self.running_run.lock().unwrap();
        if running.is_some() {
            return Err(Error::InvalidState("a run is already in progress".to_string()));
        }
        *running = Some(run.clone());
        Ok(())
    }

    async fn save_run(&self, run: &AnalysisRun) -> Result<()> {
        *self.running_run.lock().unwrap() = None;
        let mut runs = self.runs.lock().unwrap();
        if let Some(slot) = runs.iter_mut().find(|r| r.id == run.id) {
            *slot = run.clone();
        } else {
            runs.push(run.clone());
        }
        Ok(())
    }

    async fn current_running_run(&self) -> Result<Option<AnalysisRun>> {
        Ok(self.running_run.lock().unwrap().clone())
    }

    async fn get_run(&self, id: RunId) -> Result<Option<AnalysisRun>> {
        Ok(self.runs.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn save_ask_ai_session(&self, session: &AskAiSession) -> Result<()> {
        let mut sessions = self.ask_ai_sessions.lock().unwrap();
        if let Some(slot) = sessions.iter_mut().find(|s| s.id == session.id) {
            *slot = session.clone();
        } else {
            sessions.push(session.clone());
        }
        Ok(())
    }

    async fn get_ask_ai_session(&self, id: SessionId) -> Result<Option<AskAiSession>> {
        Ok(self.ask_ai_sessions.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }
}

/// An `EventSource` serving a fixed, caller-supplied event slice regardless
/// of the requested window or filter.
pub struct FakeEvents(pub Vec<Event>);

#[async_trait]
impl EventSource for FakeEvents {
    async fn fetch_events(&self, _window: TimeWindow, _filter: Option<&EntityFilter>, _limit: usize) -> Result<Vec<Event>> {
        Ok(self.0.clone())
    }

    async fn fetch_attribute_series(&self, _window: TimeWindow, _attribute: &str) -> Result<Vec<AttributeSample>> {
        Ok(Vec::new())
    }

    async fn fetch_context_tagged_events(&self, _window: TimeWindow, _context_tag: &str) -> Result<Vec<Event>> {
        Ok(Vec::new())
    }
}

/// A `CapabilityRegistry` returning a fixed, caller-supplied device list.
#[derive(Default)]
pub struct FakeCapabilities(pub Vec<DeviceCapability>);

#[async_trait]
impl CapabilityRegistry for FakeCapabilities {
    async fn list_device_capabilities(&self) -> Result<Vec<DeviceCapability>> {
        Ok(self.0.clone())
    }
}

/// A `DescriptionGenerator` that echoes a fixed description and a minimal
/// fixed plan, never hitting a real model.
pub struct FakeGenerator {
    pub description: String,
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self {
            description: "a generated description".to_string(),
        }
    }
}

#[async_trait]
impl DescriptionGenerator for FakeGenerator {
    async fn describe(&self, _request: &DescribeRequest) -> Result<String> {
        Ok(self.description.clone())
    }

    async fn plan(&self, request: &PlanRequest) -> Result<StructuredPlan> {
        let _ = request;
        Ok(StructuredPlan::default())
    }
}

/// A `NotificationPublisher` that records every notification it receives.
#[derive(Default)]
pub struct FakeNotifier {
    pub received: Mutex<Vec<RunSummaryNotification>>,
}

#[async_trait]
impl NotificationPublisher for FakeNotifier {
    async fn publish_run_summary(&self, notification: &RunSummaryNotification) -> Result<()> {
        self.received.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
