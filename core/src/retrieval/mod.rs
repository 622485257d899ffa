//! Retrieval Cache (C9, spec §4.9): a vector-indexed memory of past
//! resolved queries, so the Ask-AI pipeline can skip re-clarifying a
//! question it has already seen the user keep an answer for. Grounded on
//! the teacher's `memory-core/src/retrieval/cache` `QueryCache`: an
//! `Arc<RwLock<..>>` store reached through a small set of methods.

pub mod index;

pub use index::{should_skip_clarification, LookupMatch, VectorIndex};
