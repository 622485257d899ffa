//! # Pattern Aggregate Store (C2)
//!
//! `StorageBackend` is the single trait through which every other component
//! reads and writes persisted state (spec §4.2, §6). It exposes CRUD-level
//! operations; the higher-level "upsert with merge semantics" operation
//! named in spec §4.2 is implemented once, against this trait, in
//! [`crate::storage::merge`] — so every concrete backend gets identical
//! merge/trend behavior for free (spec §8 property 7: idempotence).
//!
//! Modeled on the teacher's `memory-core/src/storage/mod.rs` unified
//! `StorageBackend` trait, generalized from a single-owner episodic store to
//! the wider set of repositories spec §3 names.

pub mod askai_session;
pub mod filters;
pub mod merge;

pub use askai_session::AskAiSession;
pub use filters::{PatternFilter, SynergyFilter};

use crate::config::UserPreferences;
use crate::types::{
    AliasMap, AnalysisRun, DeviceCapability, DeviceId, EntityId, FeatureUsage, Pattern, PatternId,
    PatternSnapshot, QueryMemory, RunId, SessionId, Suggestion, SuggestionId, SuggestionStatus,
    Synergy,
};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Unified storage backend trait for the 25-table pattern aggregate store
/// (spec §3, §6). All operations are async so both networked (libSQL) and
/// purely in-memory (test) implementations share one interface.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    // --- Patterns ---------------------------------------------------------

    /// Look up a pattern by its `(kind, anchor, canonicalized metadata)`
    /// identity key (spec §3 uniqueness invariant).
    async fn find_pattern_by_identity(&self, identity_key: &str) -> Result<Option<Pattern>>;
    async fn insert_pattern(&self, pattern: &Pattern) -> Result<()>;
    async fn replace_pattern(&self, pattern: &Pattern) -> Result<()>;
    async fn append_pattern_snapshot(&self, snapshot: &PatternSnapshot) -> Result<()>;
    /// Most recent snapshots first, capped at `limit`.
    async fn list_pattern_snapshots(
        &self,
        pattern_id: PatternId,
        limit: usize,
    ) -> Result<Vec<PatternSnapshot>>;
    async fn list_patterns(&self, filter: &PatternFilter) -> Result<Vec<Pattern>>;
    async fn get_pattern(&self, id: PatternId) -> Result<Option<Pattern>>;
    /// Soft-retention pruning (spec §3: patterns retained 365 days).
    async fn prune_patterns_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    // --- Synergies ----------------------------------------------------------

    /// Look up a synergy by its `(type, ordered chain)` identity key (spec §4.4).
    async fn find_synergy_by_identity(&self, identity_key: &str) -> Result<Option<Synergy>>;
    async fn insert_synergy(&self, synergy: &Synergy) -> Result<()>;
    async fn replace_synergy(&self, synergy: &Synergy) -> Result<()>;
    async fn list_synergies(&self, filter: &SynergyFilter) -> Result<Vec<Synergy>>;

    // --- Suggestions --------------------------------------------------------

    async fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<()>;
    async fn save_suggestion(&self, suggestion: &Suggestion) -> Result<()>;
    async fn get_suggestion(&self, id: SuggestionId) -> Result<Option<Suggestion>>;
    async fn list_suggestions(&self, status: Option<SuggestionStatus>) -> Result<Vec<Suggestion>>;

    // --- Capabilities / feature usage ---------------------------------------

    async fn upsert_device_capability(&self, capability: &DeviceCapability) -> Result<()>;
    async fn list_device_capabilities(&self) -> Result<Vec<DeviceCapability>>;
    async fn record_feature_usage(&self, usage: &FeatureUsage) -> Result<()>;
    async fn list_feature_usage(&self, device_id: &DeviceId) -> Result<Vec<FeatureUsage>>;

    // --- Aliases --------------------------------------------------------------

    /// # Errors
    /// Returns `Error::PersistenceConflict` if `(user_id, alias)` already exists.
    async fn create_alias(&self, alias: &AliasMap) -> Result<()>;
    async fn delete_alias(&self, user_id: &str, alias: &str) -> Result<()>;
    async fn list_aliases(&self, user_id: &str) -> Result<Vec<AliasMap>>;
    async fn resolve_alias(&self, user_id: &str, alias: &str) -> Result<Option<EntityId>>;

    // --- Retrieval cache persistence (C9) -------------------------------------

    async fn insert_query_memory(&self, memory: &QueryMemory) -> Result<()>;
    /// `user_id = None` lists across all users (used to rebuild the in-memory index).
    async fn list_query_memories(&self, user_id: Option<&str>) -> Result<Vec<QueryMemory>>;

    // --- Preferences -----------------------------------------------------------

    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences>;
    async fn set_preferences(&self, user_id: &str, preferences: &UserPreferences) -> Result<()>;

    // --- Analysis runs -----------------------------------------------------------

    /// # Errors
    /// Returns `Error::InvalidState` if another run is already `running`
    /// (spec §4.10, §8 property 10: concurrency = 1).
    async fn start_run(&self, run: &AnalysisRun) -> Result<()>;
    async fn save_run(&self, run: &AnalysisRun) -> Result<()>;
    async fn current_running_run(&self) -> Result<Option<AnalysisRun>>;
    async fn get_run(&self, id: RunId) -> Result<Option<AnalysisRun>>;

    // --- Ask-AI session persistence (C8: survive restarts) -----------------------

    async fn save_ask_ai_session(&self, session: &AskAiSession) -> Result<()>;
    async fn get_ask_ai_session(&self, id: SessionId) -> Result<Option<AskAiSession>>;
}
