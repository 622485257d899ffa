//! Design-neutral numeric primitives (spec §9): cosine similarity and small
//! statistics, shared across detectors, the synergy engine, the resolver,
//! and the retrieval cache rather than reimplemented at each call site.

pub mod similarity;
pub mod stats;

pub use similarity::{cosine_similarity, cosine_similarity_signed};
pub use stats::{chi_square_2x2, linear_regression_slope, trend_from_slope, ChiSquareResult};
