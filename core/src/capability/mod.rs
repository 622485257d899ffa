//! Capability & Feature Analyzer (C5, spec §4.5): per (device, capability)
//! utilization rates, and a rate-limited list of underutilization candidates
//! consumed by C6.

pub mod feature_usage;

pub use feature_usage::{analyze, FeatureCandidate};
