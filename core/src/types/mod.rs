//! Core data model (spec §3): the 25-table shape owned exclusively by
//! [`crate::storage`].

pub mod alias;
pub mod analysis_run;
pub mod capability;
pub mod event;
pub mod ids;
pub mod pattern;
pub mod query_memory;
pub mod suggestion;
pub mod synergy;

pub use alias::AliasMap;
pub use analysis_run::{AnalysisRun, Phase, RunCounts, RunStatus};
pub use capability::{Capability, DeviceCapability, FeatureUsage, ValueDomain};
pub use event::{Event, TimeWindow};
pub use ids::{DeviceId, EntityId, PatternId, QueryMemoryId, RunId, SessionId, SuggestionId, SynergyId};
pub use pattern::{Direction, Pattern, PatternKind, PatternMetadata, PatternSnapshot, Trend, WeekdayMask};
pub use query_memory::QueryMemory;
pub use suggestion::{
    ConversationTurn, DescriptionSource, PlanStep, StructuredPlan, Suggestion, SuggestionSource,
    SuggestionStatus,
};
pub use synergy::{Complexity, PriorityWeights, Synergy, SynergyKind};
