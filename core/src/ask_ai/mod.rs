//! Ask-AI Query Pipeline (C8, spec §4.8): turns a free-form user question
//! into a drafted [`crate::types::Suggestion`], resolving entities through
//! C7, consulting the retrieval cache (C9) to skip redundant clarification,
//! and bounding clarification rounds per session.

pub mod normalize;
pub mod pipeline;
pub mod slots;

pub use pipeline::{advance, record_outcome, AskAiOutcome, PipelineDeps};
