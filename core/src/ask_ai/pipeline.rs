//! The C8 state machine's transitions (spec §4.8), driven one call at a
//! time: each [`advance`] call runs from the session's current state until
//! it either needs a user answer (`Clarifying`), reaches a terminal state,
//! or hits a hard error.
//!
//! Cancellation (spec §5): `advance` has no dependency on its caller
//! awaiting it to completion. A caller that wants the "run to completion
//! for side effects even if the original request disconnects" behavior
//! should `tokio::spawn` the call and discard the join handle on
//! disconnect, rather than dropping the in-flight future directly.

use super::normalize::normalize_query;
use super::slots::{domain_keyword_mentions, has_action_verb};
use crate::adapters::llm::{DescribeRequest, PlanRequest};
use crate::adapters::{DescriptionGenerator, EmbeddingProvider, EntityExtractor};
use crate::config::{AskAiConfig, CreativityLevel, ResolverConfig};
use crate::resolver::{self, EntityRegistryEntry, ResolveOutcome};
use crate::retrieval::{should_skip_clarification, VectorIndex};
use crate::retry::{with_retry, RetryPolicy};
use crate::storage::askai_session::{AskAiSession, AskAiState};
use crate::storage::StorageBackend;
use crate::types::{
    AliasMap, DescriptionSource, DeviceCapability, Suggestion, SuggestionSource,
};
use crate::Result;
use chrono::{DateTime, Utc};

/// Everything one `advance` call needs, gathered by the caller once per
/// request (registry/capabilities/aliases are read-mostly snapshots; see
/// spec §5 "no process-wide mutable configuration once a run starts").
pub struct PipelineDeps<'a> {
    pub storage: &'a dyn StorageBackend,
    pub embedder: &'a dyn EmbeddingProvider,
    pub extractor: &'a dyn EntityExtractor,
    pub generator: &'a dyn DescriptionGenerator,
    pub retrieval: &'a VectorIndex,
    pub registry: &'a [EntityRegistryEntry],
    pub aliases: &'a [AliasMap],
    pub capabilities: &'a [DeviceCapability],
    pub resolver_config: &'a ResolverConfig,
    pub ask_ai_config: &'a AskAiConfig,
}

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum AskAiOutcome {
    /// A drafted suggestion, ready for the user to refine/approve/reject.
    Suggestion(Box<Suggestion>),
    /// The caller must collect an answer and call `advance` again with it.
    Clarify { questions: Vec<String> },
    Aborted { reason: String },
}

async fn extract_and_resolve(session: &mut AskAiSession, deps: &PipelineDeps<'_>) -> Result<()> {
    let query_text = session.normalized_query.clone().unwrap_or_default();

    let mut mentions =
        with_retry("ner.extract", RetryPolicy::default(), || deps.extractor.extract(&query_text))
            .await?;
    mentions.extend(domain_keyword_mentions(&query_text));

    let mut resolved = Vec::new();
    for mention in &mentions {
        let embedding = with_retry("embed.mention", RetryPolicy::default(), || {
            deps.embedder.embed_text(&mention.text)
        })
        .await?;
        let outcome = resolver::resolve(
            &mention.text,
            Some(&embedding),
            None,
            deps.registry,
            deps.aliases,
            &session.user_id,
            deps.resolver_config,
        );
        if let ResolveOutcome::Accepted { entity_id, .. } = outcome {
            if !resolved.contains(&entity_id) {
                resolved.push(entity_id);
            }
        }
    }
    session.resolved_entities = resolved;
    Ok(())
}

fn clarifying_questions(query_text: &str, ambiguous: bool, missing_action: bool) -> Vec<String> {
    let mut questions = Vec::new();
    if ambiguous {
        questions.push(format!("Which device did you mean by \"{query_text}\"?"));
    }
    if missing_action {
        questions.push("What should happen, and when?".to_string());
    }
    questions
}

async fn draft_suggestion(
    session: &AskAiSession,
    deps: &PipelineDeps<'_>,
    now: DateTime<Utc>,
) -> Result<Suggestion> {
    let intent = session
        .normalized_query
        .clone()
        .unwrap_or_else(|| session.raw_query.clone());

    let capabilities: Vec<DeviceCapability> = deps
        .capabilities
        .iter()
        .filter(|c| session.resolved_entities.iter().any(|e| e.as_str().starts_with(c.device_id.as_str())))
        .cloned()
        .collect();

    let plan_request = PlanRequest {
        intent: intent.clone(),
        resolved_entities: session.resolved_entities.clone(),
        capabilities,
    };
    let plan = deps.generator.plan(&plan_request).await.ok();

    let describe_request = DescribeRequest {
        pattern_summary: format!("user request: {intent}"),
        synergy_summary: None,
        creativity: CreativityLevel::Balanced,
    };
    let (description, description_source) = match deps.generator.describe(&describe_request).await {
        Ok(description) => (description, DescriptionSource::Llm),
        Err(_) => (format!("Automation for: {intent}"), DescriptionSource::Template),
    };

    let confidence = if session.resolved_entities.is_empty() { 0.5 } else { 0.8 };
    let mut suggestion = Suggestion::draft(
        SuggestionSource::AskAi,
        description,
        description_source,
        session.resolved_entities.clone(),
        confidence,
        now,
    );
    suggestion.plan = plan;
    Ok(suggestion)
}

/// Runs the state machine forward from `session.state`. `answer` is the
/// user's reply to a prior `Clarify` outcome, ignored otherwise.
///
/// # Errors
/// Returns an error only for failures the session itself cannot absorb
/// (e.g. a storage write failure); adapter/clarification failures instead
/// surface as `AskAiOutcome::Aborted` with the session transitioned to
/// `Aborted` and persisted.
pub async fn advance(
    session: &mut AskAiSession,
    answer: Option<&str>,
    deps: &PipelineDeps<'_>,
    now: DateTime<Utc>,
) -> Result<AskAiOutcome> {
    let outcome = advance_inner(session, answer, deps, now).await;
    // Best-effort: the session is the authoritative turn-by-turn record
    // (spec: "survive restarts"); a save failure here must not mask the
    // pipeline's own outcome.
    let _ = deps.storage.save_ask_ai_session(session).await;
    outcome
}

async fn advance_inner(
    session: &mut AskAiSession,
    answer: Option<&str>,
    deps: &PipelineDeps<'_>,
    now: DateTime<Utc>,
) -> Result<AskAiOutcome> {
    loop {
        match session.state.clone() {
            AskAiState::Received => {
                let normalized = normalize_query(&session.raw_query);
                session.normalized_query = Some(normalized);
                session.transition(AskAiState::Normalized, now);
            }

            AskAiState::Normalized => {
                if let Err(err) = extract_and_resolve(session, deps).await {
                    session.transition(AskAiState::Aborted { reason: err.to_string() }, now);
                    return Ok(AskAiOutcome::Aborted { reason: err.to_string() });
                }
                session.transition(AskAiState::EntitiesExtracted, now);
            }

            AskAiState::EntitiesExtracted => {
                let query_text = session.normalized_query.clone().unwrap_or_default();
                let hits = deps.retrieval.lookup(&query_text, 1, deps.embedder).await?;
                let threshold = deps.ask_ai_config.cache_skip_cosine;
                let skip = should_skip_clarification(hits.first(), &session.resolved_entities, threshold);
                session.transition(AskAiState::CacheChecked, now);
                if skip {
                    // Spec: a strong cache hit bypasses clarification entirely.
                    session.transition(AskAiState::SuggestionDrafted, now);
                }
            }

            AskAiState::CacheChecked => {
                let query_text = session.normalized_query.clone().unwrap_or_default();
                let ambiguous = session.resolved_entities.is_empty();
                let missing_action = !has_action_verb(&query_text);
                if ambiguous || missing_action {
                    match session.begin_clarification_round(deps.ask_ai_config.max_clarifications, now) {
                        Ok(()) => {
                            let questions = clarifying_questions(&query_text, ambiguous, missing_action);
                            return Ok(AskAiOutcome::Clarify { questions });
                        }
                        Err(err) => {
                            session.transition(AskAiState::Aborted { reason: err.to_string() }, now);
                            return Ok(AskAiOutcome::Aborted { reason: err.to_string() });
                        }
                    }
                }
                session.transition(AskAiState::SuggestionDrafted, now);
            }

            AskAiState::Clarifying => match answer {
                Some(text) => {
                    // Spec: "each answer re-enters at ENTITIES_EXTRACTED" —
                    // folded into the raw query and re-normalized here so
                    // the `Normalized` branch's extraction sees fresh text.
                    session.raw_query = format!("{} {text}", session.raw_query);
                    session.normalized_query = Some(normalize_query(&session.raw_query));
                    session.transition(AskAiState::Normalized, now);
                }
                None => return Ok(AskAiOutcome::Clarify { questions: Vec::new() }),
            },

            AskAiState::SuggestionDrafted => {
                let suggestion = draft_suggestion(session, deps, now).await?;
                session.transition(AskAiState::Responded, now);
                return Ok(AskAiOutcome::Suggestion(Box::new(suggestion)));
            }

            AskAiState::Responded => {
                return Err(crate::Error::InvalidState("session has already responded".to_string()));
            }

            AskAiState::Aborted { reason } => return Ok(AskAiOutcome::Aborted { reason }),
        }
    }
}

/// Records the eventual disposition of a completed session in the
/// retrieval cache (spec §4.9 `remember`), so a future identical query can
/// skip clarification. Call once the caller knows whether the drafted
/// suggestion was kept.
pub async fn record_outcome(
    session: &AskAiSession,
    outcome_kept: bool,
    deps: &PipelineDeps<'_>,
) -> Result<()> {
    let query_text = session
        .normalized_query
        .clone()
        .unwrap_or_else(|| session.raw_query.clone());
    deps.retrieval
        .remember(
            &session.user_id,
            &query_text,
            session.resolved_entities.clone(),
            outcome_kept,
            deps.embedder,
            deps.storage,
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ner::EntityMention;
    use crate::storage::askai_session::AskAiSession;
    use crate::types::{EntityId, QueryMemory, QueryMemoryId, SessionId};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
            const VOCAB: [&str; 5] = ["turn", "on", "office", "light", "kitchen"];
            let lower = text.to_lowercase();
            Ok(VOCAB.iter().map(|w| if lower.contains(w) { 1.0 } else { 0.0 }).collect())
        }
        fn embedding_dimension(&self) -> usize {
            5
        }
        fn model_name(&self) -> &str {
            "fake-bow"
        }
    }

    struct FakeExtractor {
        mentions: Vec<EntityMention>,
    }

    #[async_trait]
    impl EntityExtractor for FakeExtractor {
        async fn extract(&self, _query: &str) -> Result<Vec<EntityMention>> {
            Ok(self.mentions.clone())
        }
    }

    struct FakeGenerator;

    #[async_trait]
    impl DescriptionGenerator for FakeGenerator {
        async fn describe(&self, _request: &DescribeRequest) -> Result<String> {
            Ok("Turn on the office light.".to_string())
        }
        async fn plan(&self, _request: &PlanRequest) -> Result<crate::types::StructuredPlan> {
            Ok(crate::types::StructuredPlan::default())
        }
    }

    struct FakeStore {
        memories: Mutex<Vec<QueryMemory>>,
        sessions: Mutex<Vec<AskAiSession>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self { memories: Mutex::new(Vec::new()), sessions: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl StorageBackend for FakeStore {
        async fn find_pattern_by_identity(
            &self,
            _identity_key: &str,
        ) -> Result<Option<crate::types::Pattern>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn insert_pattern(&self, _pattern: &crate::types::Pattern) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn replace_pattern(&self, _pattern: &crate::types::Pattern) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn append_pattern_snapshot(
            &self,
            _snapshot: &crate::types::PatternSnapshot,
        ) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn list_pattern_snapshots(
            &self,
            _pattern_id: crate::types::PatternId,
            _limit: usize,
        ) -> Result<Vec<crate::types::PatternSnapshot>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn list_patterns(
            &self,
            _filter: &crate::storage::filters::PatternFilter,
        ) -> Result<Vec<crate::types::Pattern>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn get_pattern(&self, _id: crate::types::PatternId) -> Result<Option<crate::types::Pattern>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn prune_patterns_older_than(&self, _cutoff: DateTime<Utc>) -> Result<usize> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn find_synergy_by_identity(
            &self,
            _identity_key: &str,
        ) -> Result<Option<crate::types::Synergy>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn insert_synergy(&self, _synergy: &crate::types::Synergy) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn replace_synergy(&self, _synergy: &crate::types::Synergy) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn list_synergies(
            &self,
            _filter: &crate::storage::filters::SynergyFilter,
        ) -> Result<Vec<crate::types::Synergy>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn insert_suggestion(&self, _suggestion: &Suggestion) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn save_suggestion(&self, _suggestion: &Suggestion) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn get_suggestion(
            &self,
            _id: crate::types::SuggestionId,
        ) -> Result<Option<Suggestion>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn list_suggestions(
            &self,
            _status: Option<crate::types::SuggestionStatus>,
        ) -> Result<Vec<Suggestion>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn upsert_device_capability(&self, _capability: &DeviceCapability) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn list_device_capabilities(&self) -> Result<Vec<DeviceCapability>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn record_feature_usage(&self, _usage: &crate::types::FeatureUsage) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn list_feature_usage(
            &self,
            _device_id: &crate::types::DeviceId,
        ) -> Result<Vec<crate::types::FeatureUsage>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn create_alias(&self, _alias: &AliasMap) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn delete_alias(&self, _user_id: &str, _alias: &str) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn list_aliases(&self, _user_id: &str) -> Result<Vec<AliasMap>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn resolve_alias(
            &self,
            _user_id: &str,
            _alias: &str,
        ) -> Result<Option<crate::types::EntityId>> {
            unimplemented!("not exercised by ask_ai tests")
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
        async fn get_preferences(&self, _user_id: &str) -> Result<crate::config::UserPreferences> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn set_preferences(
            &self,
            _user_id: &str,
            _preferences: &crate::config::UserPreferences,
        ) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn start_run(&self, _run: &crate::types::AnalysisRun) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn save_run(&self, _run: &crate::types::AnalysisRun) -> Result<()> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn current_running_run(&self) -> Result<Option<crate::types::AnalysisRun>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn get_run(&self, _id: crate::types::RunId) -> Result<Option<crate::types::AnalysisRun>> {
            unimplemented!("not exercised by ask_ai tests")
        }
        async fn save_ask_ai_session(&self, session: &AskAiSession) -> Result<()> {
            let mut sessions = self.sessions.lock().expect("lock poisoned");
            sessions.retain(|s| s.id != session.id);
            sessions.push(session.clone());
            Ok(())
        }
        async fn get_ask_ai_session(&self, id: SessionId) -> Result<Option<AskAiSession>> {
            Ok(self.sessions.lock().expect("lock poisoned").iter().find(|s| s.id == id).cloned())
        }
    }

    fn deps<'a>(
        storage: &'a FakeStore,
        embedder: &'a FakeEmbedder,
        extractor: &'a FakeExtractor,
        generator: &'a FakeGenerator,
        retrieval: &'a VectorIndex,
        registry: &'a [EntityRegistryEntry],
        resolver_config: &'a ResolverConfig,
        ask_ai_config: &'a AskAiConfig,
    ) -> PipelineDeps<'a> {
        PipelineDeps {
            storage,
            embedder,
            extractor,
            generator,
            retrieval,
            registry,
            aliases: &[],
            capabilities: &[],
            resolver_config,
            ask_ai_config,
        }
    }

    #[tokio::test]
    async fn unambiguous_query_drafts_a_suggestion_without_clarifying() {
        let storage = FakeStore::new();
        let embedder = FakeEmbedder;
        let extractor = FakeExtractor {
            mentions: vec![EntityMention { text: "office light".to_string(), start: 8, end: 20 }],
        };
        let generator = FakeGenerator;
        let retrieval = VectorIndex::new();
        // A candidate embedding matching what `FakeEmbedder` assigns to the
        // mention text, so the semantic signal clears the accept floor
        // alongside the exact/fuzzy signals (spec §4.7 fusion).
        let office_embedding = embedder.embed_text("Office Light").await.unwrap();
        let registry = vec![EntityRegistryEntry {
            entity_id: EntityId::new("light.office").unwrap(),
            display_name: "Office Light".to_string(),
            area: None,
            embedding: Some(office_embedding),
        }];
        let resolver_config = ResolverConfig::default();
        let ask_ai_config = AskAiConfig::default();
        let d = deps(
            &storage, &embedder, &extractor, &generator, &retrieval, &registry, &resolver_config,
            &ask_ai_config,
        );

        let mut session = AskAiSession::new(SessionId::new(), "u1", "turn on the office light", Utc::now());
        let outcome = advance(&mut session, None, &d, Utc::now()).await.unwrap();
        match outcome {
            AskAiOutcome::Suggestion(s) => {
                assert_eq!(s.source, SuggestionSource::AskAi);
                assert_eq!(s.devices_involved, vec![EntityId::new("light.office").unwrap()]);
            }
            other => panic!("expected Suggestion, got {other:?}"),
        }
        assert_eq!(session.state, AskAiState::Responded);
    }

    #[tokio::test]
    async fn ambiguous_query_clarifies_then_abandons_after_limit() {
        let storage = FakeStore::new();
        let embedder = FakeEmbedder;
        let extractor = FakeExtractor { mentions: vec![] };
        let generator = FakeGenerator;
        let retrieval = VectorIndex::new();
        let registry: Vec<EntityRegistryEntry> = vec![];
        let resolver_config = ResolverConfig::default();
        let mut ask_ai_config = AskAiConfig::default();
        ask_ai_config.max_clarifications = 1;
        let d = deps(
            &storage, &embedder, &extractor, &generator, &retrieval, &registry, &resolver_config,
            &ask_ai_config,
        );

        let mut session = AskAiSession::new(SessionId::new(), "u1", "do the thing", Utc::now());
        let first = advance(&mut session, None, &d, Utc::now()).await.unwrap();
        assert!(matches!(first, AskAiOutcome::Clarify { .. }));

        let second = advance(&mut session, Some("the office light"), &d, Utc::now()).await.unwrap();
        match second {
            AskAiOutcome::Aborted { .. } => {}
            other => panic!("expected Aborted after exceeding clarification limit, got {other:?}"),
        }
        assert!(matches!(session.state, AskAiState::Aborted { .. }));
    }

    #[tokio::test]
    async fn strong_cache_hit_skips_clarification() {
        let storage = FakeStore::new();
        let embedder = FakeEmbedder;
        let extractor = FakeExtractor {
            mentions: vec![EntityMention { text: "office light".to_string(), start: 8, end: 20 }],
        };
        let generator = FakeGenerator;
        let retrieval = VectorIndex::new();
        let office = EntityId::new("light.office").unwrap();
        let office_embedding = embedder.embed_text("Office Light").await.unwrap();
        let registry = vec![EntityRegistryEntry {
            entity_id: office.clone(),
            display_name: "Office Light".to_string(),
            area: None,
            embedding: Some(office_embedding),
        }];
        let resolver_config = ResolverConfig::default();
        let ask_ai_config = AskAiConfig::default();

        // Pre-warm the cache with an identical prior query that was kept,
        // resolving to the same entity.
        retrieval
            .remember("u1", "turn on the office light", vec![office], true, &embedder, &storage)
            .await
            .unwrap();

        let d = deps(
            &storage, &embedder, &extractor, &generator, &retrieval, &registry, &resolver_config,
            &ask_ai_config,
        );
        let mut session = AskAiSession::new(SessionId::new(), "u1", "turn on the office light", Utc::now());
        let outcome = advance(&mut session, None, &d, Utc::now()).await.unwrap();
        assert!(matches!(outcome, AskAiOutcome::Suggestion(_)));
    }
}
