//! Flat vector index over kept [`QueryMemory`] rows.

use crate::adapters::EmbeddingProvider;
use crate::math::similarity::cosine_similarity;
use crate::storage::StorageBackend;
use crate::types::{EntityId, QueryMemory, QueryMemoryId};
use crate::Result;
use chrono::Utc;
use parking_lot::RwLock;

/// One nearest-neighbor result from [`VectorIndex::lookup`].
#[derive(Debug, Clone)]
pub struct LookupMatch {
    pub memory: QueryMemory,
    pub cosine: f64,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: Vec<QueryMemory>,
    rebuilding: bool,
}

/// Shared across concurrent Ask-AI sessions behind a reader-writer guard
/// (spec §5): many concurrent lookups, a single writer during rebuild. The
/// index is flat (a linear scan), so "fall back to linear scan during
/// rebuild" is automatic — rebuild only ever swaps the scanned vector.
pub struct VectorIndex {
    state: RwLock<IndexState>,
}

impl VectorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self { state: RwLock::new(IndexState::default()) }
    }

    /// Reloads every kept query memory from storage. Lookups in flight
    /// during a rebuild read the pre-rebuild snapshot rather than blocking.
    pub async fn rebuild(&self, storage: &dyn StorageBackend) -> Result<()> {
        {
            let mut state = self.state.write();
            state.rebuilding = true;
        }
        let memories = storage.list_query_memories(None).await?;
        let mut state = self.state.write();
        state.entries = memories.into_iter().filter(|m| m.outcome_kept).collect();
        state.rebuilding = false;
        Ok(())
    }

    #[must_use]
    pub fn is_rebuilding(&self) -> bool {
        self.state.read().rebuilding
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embeds `query_text` and persists it; only indexed in-memory when
    /// `outcome_kept` (spec: "only queries with outcome = kept are
    /// indexed" — rejected queries are still stored for audit, just never
    /// surfaced by `lookup`).
    pub async fn remember(
        &self,
        user_id: &str,
        query_text: &str,
        resolved_entities: Vec<EntityId>,
        outcome_kept: bool,
        embedder: &dyn EmbeddingProvider,
        storage: &dyn StorageBackend,
    ) -> Result<QueryMemory> {
        let embedding = embedder.embed_text(query_text).await?;
        let memory = QueryMemory {
            id: QueryMemoryId::new(),
            user_id: user_id.to_string(),
            normalized_query: query_text.to_string(),
            embedding,
            resolved_entities,
            outcome_kept,
            created_at: Utc::now(),
        };
        storage.insert_query_memory(&memory).await?;
        if outcome_kept {
            let mut state = self.state.write();
            state.entries.push(memory.clone());
        }
        Ok(memory)
    }

    /// Embeds `query_text` and returns the top `k` nearest kept memories by
    /// cosine similarity, highest first.
    pub async fn lookup(
        &self,
        query_text: &str,
        k: usize,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<LookupMatch>> {
        let query_embedding = embedder.embed_text(query_text).await?;
        let state = self.state.read();
        let mut scored: Vec<LookupMatch> = state
            .entries
            .iter()
            .map(|memory| LookupMatch {
                memory: memory.clone(),
                cosine: cosine_similarity(&query_embedding, &memory.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.cosine.partial_cmp(&a.cosine).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a cache hit is strong enough to skip clarification (spec §4.8,
/// §4.9): the best match's cosine score clears `threshold`, and its
/// resolved entity set is a subset of (or equal to) the current query's.
#[must_use]
pub fn should_skip_clarification(
    best: Option<&LookupMatch>,
    current_entities: &[EntityId],
    threshold: f64,
) -> bool {
    match best {
        Some(m) if m.cosine >= threshold => {
            m.memory.resolved_entities.iter().all(|e| current_entities.contains(e))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserPreferences;
    use crate::storage::{askai_session::AskAiSession, filters::{PatternFilter, SynergyFilter}};
    use crate::types::{
        AliasMap, AnalysisRun, DeviceCapability, DeviceId, FeatureUsage, Pattern, PatternId,
        PatternSnapshot, RunId, SessionId, Suggestion, SuggestionId, SuggestionStatus, Synergy,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    struct FakeStore {
        memories: Mutex<Vec<QueryMemory>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self { memories: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl StorageBackend for FakeStore {
        async fn find_pattern_by_identity(&self, _identity_key: &str) -> Result<Option<Pattern>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn insert_pattern(&self, _pattern: &Pattern) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn replace_pattern(&self, _pattern: &Pattern) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn append_pattern_snapshot(&self, _snapshot: &PatternSnapshot) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn list_pattern_snapshots(
            &self,
            _pattern_id: PatternId,
            _limit: usize,
        ) -> Result<Vec<PatternSnapshot>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn list_patterns(&self, _filter: &PatternFilter) -> Result<Vec<Pattern>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn get_pattern(&self, _id: PatternId) -> Result<Option<Pattern>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn prune_patterns_older_than(&self, _cutoff: DateTime<Utc>) -> Result<usize> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn find_synergy_by_identity(&self, _identity_key: &str) -> Result<Option<Synergy>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn insert_synergy(&self, _synergy: &Synergy) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn replace_synergy(&self, _synergy: &Synergy) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn list_synergies(&self, _filter: &SynergyFilter) -> Result<Vec<Synergy>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn insert_suggestion(&self, _suggestion: &Suggestion) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn save_suggestion(&self, _suggestion: &Suggestion) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn get_suggestion(&self, _id: SuggestionId) -> Result<Option<Suggestion>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn list_suggestions(
            &self,
            _status: Option<SuggestionStatus>,
        ) -> Result<Vec<Suggestion>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn upsert_device_capability(&self, _capability: &DeviceCapability) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn list_device_capabilities(&self) -> Result<Vec<DeviceCapability>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn record_feature_usage(&self, _usage: &FeatureUsage) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn list_feature_usage(&self, _device_id: &DeviceId) -> Result<Vec<FeatureUsage>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn create_alias(&self, _alias: &AliasMap) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn delete_alias(&self, _user_id: &str, _alias: &str) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn list_aliases(&self, _user_id: &str) -> Result<Vec<AliasMap>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn resolve_alias(&self, _user_id: &str, _alias: &str) -> Result<Option<EntityId>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn insert_query_memory(&self, memory: &QueryMemory) -> Result<()> {
            self.memories.lock().expect("lock poisoned").push(memory.clone());
            Ok(())
        }
        async fn list_query_memories(&self, user_id: Option<&str>) -> Result<Vec<QueryMemory>> {
            let memories = self.memories.lock().expect("lock poisoned");
            Ok(match user_id {
                Some(uid) => memories.iter().filter(|m| m.user_id == uid).cloned().collect(),
                None => memories.clone(),
            })
        }
        async fn get_preferences(&self, _user_id: &str) -> Result<UserPreferences> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn set_preferences(
            &self,
            _user_id: &str,
            _preferences: &UserPreferences,
        ) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn start_run(&self, _run: &AnalysisRun) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn save_run(&self, _run: &AnalysisRun) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn current_running_run(&self) -> Result<Option<AnalysisRun>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn get_run(&self, _id: RunId) -> Result<Option<AnalysisRun>> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn save_ask_ai_session(&self, _session: &AskAiSession) -> Result<()> {
            unimplemented!("not exercised by retrieval tests")
        }
        async fn get_ask_ai_session(&self, _id: SessionId) -> Result<Option<AskAiSession>> {
            unimplemented!("not exercised by retrieval tests")
        }
    }

    struct FakeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
            // Deterministic toy embedding: bag-of-words presence over a
            // fixed vocabulary, so semantically similar phrases overlap.
            const VOCAB: [&str; 6] =
                ["turn", "on", "off", "office", "light", "kitchen"];
            let lower = text.to_lowercase();
            Ok(VOCAB
                .iter()
                .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
                .collect())
        }

        fn embedding_dimension(&self) -> usize {
            6
        }

        fn model_name(&self) -> &str {
            "fake-bow"
        }
    }

    #[tokio::test]
    async fn kept_query_is_remembered_and_found_on_lookup() {
        let index = VectorIndex::new();
        let storage = FakeStore::new();
        let embedder = FakeEmbedder;
        let entity = EntityId::new("light.office").unwrap();

        index
            .remember("u1", "turn on office light", vec![entity.clone()], true, &embedder, &storage)
            .await
            .unwrap();

        let hits = index.lookup("turn on the office light please", 5, &embedder).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].cosine > 0.9);
        assert_eq!(hits[0].memory.resolved_entities, vec![entity]);
    }

    #[tokio::test]
    async fn discarded_query_is_stored_but_not_indexed() {
        let index = VectorIndex::new();
        let storage = FakeStore::new();
        let embedder = FakeEmbedder;

        index
            .remember("u1", "turn off kitchen light", vec![], false, &embedder, &storage)
            .await
            .unwrap();

        assert!(index.is_empty());
        let stored = storage.list_query_memories(None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].outcome_kept);
    }

    #[tokio::test]
    async fn rebuild_reloads_only_kept_memories_from_storage() {
        let index = VectorIndex::new();
        let storage = FakeStore::new();
        let embedder = FakeEmbedder;

        storage
            .insert_query_memory(&QueryMemory {
                id: QueryMemoryId::new(),
                user_id: "u1".to_string(),
                normalized_query: "turn on kitchen light".to_string(),
                embedding: embedder.embed_text("turn on kitchen light").await.unwrap(),
                resolved_entities: vec![],
                outcome_kept: true,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        storage
            .insert_query_memory(&QueryMemory {
                id: QueryMemoryId::new(),
                user_id: "u1".to_string(),
                normalized_query: "turn off office light".to_string(),
                embedding: embedder.embed_text("turn off office light").await.unwrap(),
                resolved_entities: vec![],
                outcome_kept: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(index.is_empty());
        index.rebuild(&storage).await.unwrap();
        assert_eq!(index.len(), 1);
        assert!(!index.is_rebuilding());
    }

    #[test]
    fn skip_clarification_requires_threshold_and_entity_subset() {
        let entity = EntityId::new("light.office").unwrap();
        let memory = QueryMemory {
            id: QueryMemoryId::new(),
            user_id: "u1".to_string(),
            normalized_query: "turn on office light".to_string(),
            embedding: vec![],
            resolved_entities: vec![entity.clone()],
            outcome_kept: true,
            created_at: Utc::now(),
        };
        let strong = LookupMatch { memory: memory.clone(), cosine: 0.9 };
        let weak = LookupMatch { memory, cosine: 0.5 };

        assert!(should_skip_clarification(Some(&strong), &[entity.clone()], 0.85));
        assert!(!should_skip_clarification(Some(&weak), &[entity.clone()], 0.85));
        assert!(!should_skip_clarification(None, &[entity], 0.85));
    }
}
