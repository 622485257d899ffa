//! # HomeIQ Test Utils
//!
//! Shared test fixtures for `homeiq-core` and `homeiq-storage-sqlite`.
//!
//! Provides:
//! - Event/pattern/suggestion builders for quick test data
//! - An in-memory [`FakeStorage`] backing the full `StorageBackend` trait
//! - Fake external adapters (event source, capability registry, description
//!   generator, notifier) standing in for the real boundary crossings

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeCapabilities, FakeEvents, FakeGenerator, FakeNotifier, FakeStorage};
pub use fixtures::{co_occurring_event_pair, device_capability, motion_light_events};
