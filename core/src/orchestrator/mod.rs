//! Pipeline Orchestrator (C10, spec §4.10): the six-phase daily job that
//! refreshes device capabilities, mines patterns and synergies, analyzes
//! feature utilization, composes suggestions, and publishes a run summary.
//! Modeled as a recurring trigger behind a single-writer run guard: `trigger`
//! is callable both by a cron-style external caller and by `analysis.trigger`
//! (spec §6), and refuses to start a second run while one is in progress.

pub mod pipeline;

pub use pipeline::{publish, trigger, OrchestratorDeps, TriggerOutcome};
