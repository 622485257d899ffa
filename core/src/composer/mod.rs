//! Suggestion Composer (C6, spec §4.6): a five-stage ranking pipeline over
//! patterns, synergies, and feature candidates, followed by LLM-backed
//! description generation with a deterministic template fallback.

pub mod describe;
pub mod pipeline;
pub mod scoring;

pub use describe::compose_description;
pub use pipeline::{select, RankedCandidate};
pub use scoring::CandidateSource;
