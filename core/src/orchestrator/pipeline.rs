//! The six-phase run (spec §4.10): refresh capabilities, fetch events,
//! detect + synergize, analyze features, compose, publish.
//!
//! Detectors (C3) and the synergy engine (C4) are described in spec §4.10 as
//! running "in parallel", but spec §5's ordering guarantee is stricter:
//! within a run, pattern inserts happen-before the synergy engine reads them.
//! We honor the ordering guarantee over the parallelism framing: the two
//! still share a single `Phase::Detect` timing bucket and each runs its own
//! sub-layers concurrently (detectors' three families, synergy's four
//! layers), but the synergy engine only starts once this run's newly merged
//! patterns are committed.

use crate::adapters::{CapabilityRegistry, DescriptionGenerator, NotificationPublisher};
use crate::adapters::notifier::RunSummaryNotification;
use crate::capability::feature_usage::{self, FeatureCandidate};
use crate::composer::{describe, pipeline as composer_pipeline};
use crate::config::AnalysisConfig;
use crate::event_source::{AttributeSample, EventSource};
use crate::patterns;
use crate::storage::merge::{upsert_pattern, upsert_synergy};
use crate::storage::{PatternFilter, StorageBackend, SynergyFilter};
use crate::synergy;
use crate::retry::{with_retry, RetryPolicy};
use crate::types::{
    AnalysisRun, DeviceId, Event, Pattern, Phase, PriorityWeights, RunId, Synergy, TimeWindow,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// A single system-wide preferences row drives the daily batch composer
/// (spec §9 Open Question: single- vs multi-tenant); per-user preferences
/// (§6 `preferences.set`) govern Ask-AI sessions instead. See `DESIGN.md`.
const DEFAULT_USER_ID: &str = "default";

/// Cap on one `fetch_events` call for the analysis window. Not named by the
/// spec; chosen generously since the event source itself enforces ordering
/// and the orchestrator only needs a bounded read, not an exhaustive one.
const EVENT_FETCH_LIMIT: usize = 200_000;

/// How much an existing synergy's confidence counts against a fresh
/// observation on merge (spec §4.4); see [`crate::storage::merge::upsert_synergy`].
const SYNERGY_MERGE_WEIGHT: f64 = 0.7;

/// Everything the orchestrator reaches across a boundary for, bundled so
/// `trigger` takes one argument instead of six (spec §6 external interfaces).
pub struct OrchestratorDeps<'a> {
    pub storage: &'a dyn StorageBackend,
    pub events: &'a dyn EventSource,
    pub capabilities: &'a dyn CapabilityRegistry,
    pub generator: &'a dyn DescriptionGenerator,
    pub notifier: &'a dyn NotificationPublisher,
    pub config: &'a AnalysisConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed(RunId),
    /// Another run was already `running` (spec §4.10, §8 property 10: concurrency = 1).
    Refused,
}

/// Run `fut` under the phase's soft ceiling, aborting if it exceeds
/// `abort_multiplier` times that ceiling (spec §5 Timeouts). Always records
/// `phase`'s elapsed time before returning, success or failure.
async fn timed_phase<T, F>(
    run: &mut AnalysisRun,
    phase: Phase,
    ceiling: Duration,
    abort_multiplier: u32,
    fut: F,
) -> std::result::Result<T, (Phase, Error)>
where
    F: std::future::Future<Output = Result<T>>,
{
    let start = Instant::now();
    let outcome = tokio::time::timeout(ceiling * abort_multiplier, fut).await;
    let elapsed = start.elapsed();
    run.record_phase(phase, elapsed);

    match outcome {
        Ok(Ok(value)) => {
            if elapsed > ceiling {
                warn!(
                    ?phase,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "phase exceeded its soft ceiling"
                );
            }
            Ok(value)
        }
        Ok(Err(err)) => Err((phase, err)),
        Err(_) => Err((
            phase,
            Error::ResourceExhausted(format!(
                "{phase:?} exceeded {abort_multiplier}x its soft ceiling of {ceiling:?}"
            )),
        )),
    }
}

/// Measures `phase` without enforcing a timeout; used for the two phases
/// spec §5 gives no soft ceiling for (`RefreshCapabilities`, `Publish`).
async fn measured_phase<T, F>(
    run: &mut AnalysisRun,
    phase: Phase,
    fut: F,
) -> std::result::Result<T, (Phase, Error)>
where
    F: std::future::Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    run.record_phase(phase, start.elapsed());
    result.map_err(|err| (phase, err))
}

/// Phase 1: pull device capabilities from the external registry and upsert
/// them into storage (spec §4.10 item 1, §4.5).
async fn refresh_capabilities(deps: &OrchestratorDeps<'_>) -> Result<()> {
    let capabilities = with_retry("capability_registry.list_device_capabilities", RetryPolicy::default(), || {
        deps.capabilities.list_device_capabilities()
    })
    .await?;

    for capability in &capabilities {
        deps.storage.upsert_device_capability(capability).await?;
    }
    Ok(())
}

/// Phase 2: read the window's event slice (spec §4.10 item 2, §4.1).
async fn fetch_events(deps: &OrchestratorDeps<'_>, window: TimeWindow) -> Result<Vec<Event>> {
    with_retry("event_source.fetch_events", RetryPolicy::default(), || {
        deps.events.fetch_events(window, None, EVENT_FETCH_LIMIT)
    })
    .await
}

/// Phase 3: detectors, merge, then the synergy engine over the merged
/// patterns (spec §4.10 item 3, §4.3, §4.4). Returns the full post-merge
/// pattern/synergy lists (needed by compose), new-row counts, and whether
/// any detector was isolated (partial success).
async fn detect_and_synergize(
    deps: &OrchestratorDeps<'_>,
    events: &[Event],
) -> Result<(Vec<Pattern>, Vec<Synergy>, usize, usize, bool)> {
    let detector_config = deps.config.detector;
    let events_for_detectors = events.to_vec();
    let detection = tokio::task::spawn_blocking(move || {
        patterns::run_all(&events_for_detectors, &detector_config)
    })
    .await
    .map_err(|err| Error::ResourceExhausted(format!("detector task panicked: {err}")))?;

    let partial = !detection.failed_detectors.is_empty();
    if partial {
        warn!(failed = ?detection.failed_detectors, "some detectors were isolated this run");
    }

    let now = Utc::now();
    let mut new_patterns = 0usize;
    for candidate in detection.candidates {
        let (_, inserted) = upsert_pattern(
            deps.storage,
            candidate.anchor,
            candidate.metadata,
            candidate.confidence,
            candidate.occurrences,
            detector_config.min_support,
            now,
        )
        .await?;
        if inserted {
            new_patterns += 1;
        }
    }

    let patterns = deps.storage.list_patterns(&PatternFilter::all()).await?;

    let synergy_config = deps.config.synergy;
    let events_for_synergy = events.to_vec();
    let patterns_for_synergy = patterns.clone();
    let synergy_candidates = tokio::task::spawn_blocking(move || {
        synergy::run_all(&patterns_for_synergy, &events_for_synergy, &synergy_config)
    })
    .await
    .map_err(|err| Error::ResourceExhausted(format!("synergy task panicked: {err}")))?;

    let mut new_synergies = 0usize;
    for candidate in synergy_candidates {
        let (_, inserted) = upsert_synergy(deps.storage, candidate, SYNERGY_MERGE_WEIGHT).await?;
        if inserted {
            new_synergies += 1;
        }
    }

    let mut synergies = deps.storage.list_synergies(&SynergyFilter::all()).await?;
    synergy::rank(&mut synergies, &PriorityWeights::default());

    Ok((patterns, synergies, new_patterns, new_synergies, partial))
}

/// Groups a windowed event slice by device for C5 (spec §4.1, §4.5): the
/// event source yields entity-scoped records, and the orchestrator maps them
/// to devices via `Event::device_id` before calling `feature_usage::analyze`.
fn group_events_for_features(
    events: &[Event],
) -> (HashMap<DeviceId, usize>, HashMap<DeviceId, Vec<AttributeSample>>) {
    let mut active_counts: HashMap<DeviceId, usize> = HashMap::new();
    let mut samples_by_device: HashMap<DeviceId, Vec<AttributeSample>> = HashMap::new();

    for event in events {
        let Some(device_id) = &event.device_id else {
            continue;
        };
        if event.is_activation() {
            *active_counts.entry(device_id.clone()).or_insert(0) += 1;
        }
        for (attribute, value) in &event.attributes {
            samples_by_device
                .entry(device_id.clone())
                .or_default()
                .push(AttributeSample {
                    entity_id: event.entity_id.clone(),
                    attribute: attribute.clone(),
                    value: value.clone(),
                    timestamp: event.timestamp,
                });
        }
    }

    (active_counts, samples_by_device)
}

/// Phase 4: feature utilization against the same event slice (spec §4.10 item 4, §4.5).
async fn analyze_features(
    deps: &OrchestratorDeps<'_>,
    events: &[Event],
    window: TimeWindow,
) -> Result<Vec<FeatureCandidate>> {
    let capabilities = deps.storage.list_device_capabilities().await?;
    let (active_counts, samples_by_device) = group_events_for_features(events);

    let (usage_rows, candidates) = feature_usage::analyze(
        &capabilities,
        &samples_by_device,
        &active_counts,
        window,
        &deps.config.feature,
    );

    for usage in &usage_rows {
        deps.storage.record_feature_usage(usage).await?;
    }

    Ok(candidates)
}

/// Phase 5: rank and persist suggestions (spec §4.10 item 5, §4.6).
async fn compose_and_persist(
    deps: &OrchestratorDeps<'_>,
    patterns: Vec<Pattern>,
    synergies: Vec<Synergy>,
    features: Vec<FeatureCandidate>,
    now: DateTime<Utc>,
) -> Result<usize> {
    let preferences = deps.storage.get_preferences(DEFAULT_USER_ID).await?;

    let ranked = composer_pipeline::select(
        patterns,
        synergies,
        features,
        now,
        preferences.creativity_level,
        preferences.blueprint_preference,
        preferences.max_suggestions,
        &PriorityWeights::default(),
        &deps.config.composer,
    );

    let mut new_suggestions = 0usize;
    for candidate in ranked {
        let suggestion =
            describe::compose_description(candidate, deps.generator, preferences.creativity_level, now)
                .await;
        deps.storage.insert_suggestion(&suggestion).await?;
        new_suggestions += 1;
    }

    Ok(new_suggestions)
}

/// Phase 6: best-effort notification of the completed run (spec §4.10 item 6).
/// Never fails the run: a publish failure (even after the bounded retry of
/// §5) is only logged, per `NotificationPublisher`'s contract.
pub async fn publish(run: &AnalysisRun, notifier: &dyn NotificationPublisher) {
    let notification = RunSummaryNotification {
        run_id: run.id,
        new_patterns: run.counts.patterns,
        new_synergies: run.counts.synergies,
        new_suggestions: run.counts.suggestions,
    };

    let result = with_retry("notifier.publish_run_summary", RetryPolicy::default(), || {
        notifier.publish_run_summary(&notification)
    })
    .await;

    if let Err(err) = result {
        warn!(run_id = %run.id, error = %err, "failed to publish run summary notification");
    }
}

/// Phases 1-5, threaded through `run` for timing/counts. Returns whether any
/// detector was isolated (partial success) on success, or the failing phase
/// and its error.
async fn run_phases(
    run: &mut AnalysisRun,
    window: TimeWindow,
    deps: &OrchestratorDeps<'_>,
    now: DateTime<Utc>,
) -> std::result::Result<bool, (Phase, Error)> {
    let timeouts = deps.config.timeouts;

    measured_phase(run, Phase::RefreshCapabilities, refresh_capabilities(deps)).await?;

    let events = timed_phase(
        run,
        Phase::FetchEvents,
        timeouts.fetch,
        timeouts.abort_multiplier,
        fetch_events(deps, window),
    )
    .await?;

    let (patterns, synergies, new_patterns, new_synergies, partial) = timed_phase(
        run,
        Phase::Detect,
        timeouts.detectors + timeouts.synergies,
        timeouts.abort_multiplier,
        detect_and_synergize(deps, &events),
    )
    .await?;
    run.counts.patterns = new_patterns;
    run.counts.synergies = new_synergies;

    let features = timed_phase(
        run,
        Phase::Features,
        timeouts.features,
        timeouts.abort_multiplier,
        analyze_features(deps, &events, window),
    )
    .await?;

    let new_suggestions = timed_phase(
        run,
        Phase::Compose,
        timeouts.compose,
        timeouts.abort_multiplier,
        compose_and_persist(deps, patterns, synergies, features, now),
    )
    .await?;
    run.counts.suggestions = new_suggestions;

    Ok(partial)
}

/// Runs the six phases in order under a fresh `AnalysisRun`, refusing to
/// start while another run is `running` (spec §4.10).
///
/// # Errors
/// Returns an error only if the concurrency guard itself (`start_run`) or a
/// storage read/write outside the tracked phases fails; phase failures are
/// captured on the returned `AnalysisRun` instead of propagated.
#[instrument(skip(deps), fields(window_start = %window.start, window_end = %window.end))]
pub async fn trigger(
    window: TimeWindow,
    deps: OrchestratorDeps<'_>,
    now: DateTime<Utc>,
) -> Result<TriggerOutcome> {
    if deps.storage.current_running_run().await?.is_some() {
        warn!("refusing trigger: another analysis run is already in progress");
        return Ok(TriggerOutcome::Refused);
    }

    let mut run = AnalysisRun::start(now);
    deps.storage.start_run(&run).await?;
    let run_id = run.id;

    match run_phases(&mut run, window, &deps, now).await {
        Ok(partial) => {
            if partial {
                run.mark_partial();
            } else {
                run.succeed();
            }
        }
        Err((phase, err)) => run.fail(phase, err.to_string()),
    }

    let publish_start = Instant::now();
    publish(&run, deps.notifier).await;
    run.record_phase(Phase::Publish, publish_start.elapsed());

    info!(run_id = %run.id, status = ?run.status, "analysis run finished");
    deps.storage.save_run(&run).await?;

    Ok(TriggerOutcome::Completed(run_id))
}
